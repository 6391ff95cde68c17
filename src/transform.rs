use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    data::{FieldValue, parse_bool, parse_date},
    mapping::Mapping,
    schema::{FieldType, PredefinedSchema},
    source::RawRow,
};

static NULL: FieldValue = FieldValue::Null;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TransformedRecord(BTreeMap<String, FieldValue>);

impl TransformedRecord {
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values_in_schema_order<'a>(
        &'a self,
        schema: &'a PredefinedSchema,
    ) -> impl Iterator<Item = &'a FieldValue> + 'a {
        schema
            .fields
            .iter()
            .map(|field| self.0.get(&field.name).unwrap_or(&NULL))
    }
}

/// Converts one raw row into a typed record.
///
/// Never fails: unmapped fields, absent cells, and values the date or boolean
/// parsers reject all become [`FieldValue::Null`]. Other types keep the raw
/// cell text unchanged.
pub fn transform_row(
    schema: &PredefinedSchema,
    raw_row: &RawRow,
    mapping: &Mapping,
) -> TransformedRecord {
    let values = schema
        .fields
        .iter()
        .map(|field| {
            let raw = mapping
                .column_for(&field.name)
                .and_then(|column| raw_row.get(column));
            let value = match (raw, field.field_type) {
                (None, _) => FieldValue::Null,
                (Some(raw), FieldType::Date) => parse_date(raw).into(),
                (Some(raw), FieldType::Boolean) => parse_bool(raw).into(),
                (Some(raw), _) => FieldValue::String(raw.clone()),
            };
            (field.name.clone(), value)
        })
        .collect();
    TransformedRecord(values)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::schema::SchemaField;

    fn schema() -> PredefinedSchema {
        PredefinedSchema {
            name: "Test".into(),
            version: "1".into(),
            fields: vec![
                SchemaField::new("name", FieldType::String),
                SchemaField::new("joined", FieldType::Date),
                SchemaField::new("active", FieldType::Boolean),
                SchemaField::new("seen", FieldType::DateTime),
                SchemaField::new("age", FieldType::Integer),
            ],
            cross_field_rules: Vec::new(),
        }
    }

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn every_schema_field_gets_an_entry() {
        let record = transform_row(&schema(), &row(&[]), &Mapping::new());
        assert_eq!(record.len(), 5);
        assert!(record.values_in_schema_order(&schema()).all(FieldValue::is_null));
    }

    #[test]
    fn typed_fields_are_parsed_and_others_pass_through() {
        let raw = row(&[
            ("Name", " Ada "),
            ("Joined", "15/03/2021"),
            ("Active", "Yes"),
            ("Seen", "2021-03-15T10:00:00"),
            ("Age", "36"),
        ]);
        let mapping: Mapping = [
            ("name", "Name"),
            ("joined", "Joined"),
            ("active", "Active"),
            ("seen", "Seen"),
            ("age", "Age"),
        ]
        .into_iter()
        .collect();
        let record = transform_row(&schema(), &raw, &mapping);
        assert_eq!(record.get("name"), Some(&FieldValue::String(" Ada ".into())));
        assert_eq!(
            record.get("joined"),
            Some(&FieldValue::Date(NaiveDate::from_ymd_opt(2021, 3, 15).unwrap()))
        );
        assert_eq!(record.get("active"), Some(&FieldValue::Boolean(true)));
        assert_eq!(
            record.get("seen"),
            Some(&FieldValue::String("2021-03-15T10:00:00".into()))
        );
        assert_eq!(record.get("age"), Some(&FieldValue::String("36".into())));
    }

    #[test]
    fn malformed_and_absent_values_degrade_to_null() {
        let raw = row(&[("Joined", "someday"), ("Active", "perhaps")]);
        let mapping: Mapping = [("joined", "Joined"), ("active", "Active"), ("name", "Gone")]
            .into_iter()
            .collect();
        let record = transform_row(&schema(), &raw, &mapping);
        assert_eq!(record.get("joined"), Some(&FieldValue::Null));
        assert_eq!(record.get("active"), Some(&FieldValue::Null));
        assert_eq!(record.get("name"), Some(&FieldValue::Null));
    }

    #[test]
    fn adding_a_mapping_fills_a_previously_null_field() {
        let raw = row(&[("Joined", "2022-01-02")]);
        let before = transform_row(&schema(), &raw, &Mapping::new());
        assert!(before.get("joined").unwrap().is_null());

        let after = transform_row(&schema(), &raw, &[("joined", "Joined")].into_iter().collect());
        assert!(!after.get("joined").unwrap().is_null());
    }
}
