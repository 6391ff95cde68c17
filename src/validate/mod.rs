//! Structural and content validation of a mapping.
//!
//! Structural problems stop the pipeline before any cell is read. Content
//! problems never stop each other: every mapped field and every rule is
//! evaluated and all errors come back in one [`ValidationResult`].

mod content;
mod rules;
mod structure;

use chrono::{Local, NaiveDate};
use log::debug;

use crate::{
    mapping::{Mapping, ValidationResult},
    schema::PredefinedSchema,
    source::RawTable,
};

pub use content::{BOOLEAN_PROBE_LIMIT, MAX_REPORTED_VALUES};
pub use structure::validate_structure;

/// Field checks followed by cross-field rules, with `not_future` measured
/// against the local calendar date.
pub fn validate_content(
    schema: &PredefinedSchema,
    mapping: &Mapping,
    sample: &RawTable,
) -> ValidationResult {
    validate_content_as_of(schema, mapping, sample, Local::now().date_naive())
}

pub fn validate_content_as_of(
    schema: &PredefinedSchema,
    mapping: &Mapping,
    sample: &RawTable,
    today: NaiveDate,
) -> ValidationResult {
    let mut errors = Vec::new();

    for field in &schema.fields {
        let Some(column) = mapping.column_for(&field.name) else {
            continue;
        };
        let Some(values) = sample.column(column) else {
            debug!(
                "Column '{column}' for field '{}' is not in the sample; skipping",
                field.name
            );
            continue;
        };
        content::check_field(field, column, &values, &mut errors);
    }

    rules::apply_rules(schema, mapping, sample, today, &mut errors);

    debug!(
        "Content validation over {} row(s) found {} error(s)",
        sample.len(),
        errors.len()
    );
    ValidationResult::from_errors(errors)
}

/// Structural validation, then content validation only when the structure holds.
pub fn validate_mapping(
    schema: &PredefinedSchema,
    mapping: &Mapping,
    available_columns: &[String],
    sample: &RawTable,
) -> ValidationResult {
    let structural = validate_structure(schema, mapping, available_columns);
    if !structural.is_valid() {
        return structural;
    }
    structural.merge(validate_content(schema, mapping, sample))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldType, SchemaField};
    use crate::source::RawRow;

    fn id_email_schema() -> PredefinedSchema {
        PredefinedSchema {
            name: "Test".into(),
            version: "1".into(),
            fields: vec![
                SchemaField::new("id", FieldType::Integer).required(),
                SchemaField::new("email", FieldType::String)
                    .required()
                    .with_pattern(r"^[^@\s]+@[^@\s]+\.[^@\s]+$"),
            ],
            cross_field_rules: Vec::new(),
        }
    }

    fn record(pairs: &[(&str, &str)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn end_to_end_type_and_pattern_errors() {
        let sample = RawTable::from_records(&[
            record(&[("id", "1"), ("email", "a@b.com")]),
            record(&[("id", "x"), ("email", "bad")]),
        ]);
        let mapping: Mapping = [("id", "id"), ("email", "email")].into_iter().collect();
        let result = validate_content(&id_email_schema(), &mapping, &sample);
        assert!(!result.is_valid());
        assert_eq!(
            result.errors(),
            [
                "Column 'id' mapped to 'id' cannot be parsed as integer.",
                "Column 'email' mapped to 'email' has values that do not match required pattern (e.g. ['bad']).",
            ]
        );
    }

    #[test]
    fn structural_errors_short_circuit_content() {
        let sample = RawTable::from_records(&[record(&[("id", "x")])]);
        let mapping: Mapping = [("id", "id")].into_iter().collect();
        let available = vec!["id".to_string()];
        let result = validate_mapping(&id_email_schema(), &mapping, &available, &sample);
        assert_eq!(result.errors(), ["Required field 'email' is not mapped."]);
    }

    #[test]
    fn clean_sample_passes_the_pipeline() {
        let sample = RawTable::from_records(&[record(&[("ID", "7"), ("Mail", "x@y.io")])]);
        let mapping: Mapping = [("id", "ID"), ("email", "Mail")].into_iter().collect();
        let result = validate_mapping(
            &id_email_schema(),
            &mapping,
            sample.headers(),
            &sample,
        );
        assert!(result.is_valid(), "{:?}", result.errors());
    }

    #[test]
    fn date_order_property_example() {
        let mut schema = id_email_schema();
        schema.fields = vec![
            SchemaField::new("start", FieldType::Date),
            SchemaField::new("end", FieldType::Date),
        ];
        schema.cross_field_rules = vec![crate::schema::CrossFieldRule::date_order(
            "start_before_end",
            "start",
            "end",
        )];
        let sample = RawTable::from_records(&[
            record(&[("start", "2023-01-01"), ("end", "2023-01-05")]),
            record(&[("start", "2023-02-01"), ("end", "2023-01-01")]),
        ]);
        let mapping: Mapping = [("start", "start"), ("end", "end")].into_iter().collect();
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let result = validate_content_as_of(&schema, &mapping, &sample, today);
        assert_eq!(result.errors().len(), 1);
        assert!(result.errors()[0].contains("should be on or before"));
        assert!(result.errors()[0].contains("(2023-02-01)"));
        assert!(!result.errors()[0].contains("2023-01-05"));
    }
}
