use chrono::NaiveDate;
use csv_mapper::{
    data::FieldValue,
    mapping::Mapping,
    schema::{CrossFieldRule, FieldType, PredefinedSchema, SchemaField},
    source::{RawRow, RawTable, read_sample},
    transform::transform_row,
    validate::{validate_content, validate_content_as_of, validate_mapping, validate_structure},
};
use encoding_rs::UTF_8;
use proptest::prelude::*;

mod common;
use common::fixture_path;

fn record(pairs: &[(&str, &str)]) -> RawRow {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn dated_schema(rule: CrossFieldRule) -> PredefinedSchema {
    PredefinedSchema {
        name: "Dates".into(),
        version: "1".into(),
        fields: vec![SchemaField::new("when", FieldType::Date)],
        cross_field_rules: vec![rule],
    }
}

fn customer_mapping() -> Mapping {
    [
        ("customer_id", "Customer ID"),
        ("first_name", "First Name"),
        ("last_name", "Last Name"),
        ("email", "E-mail"),
        ("date_of_birth", "DOB"),
        ("status", "Status"),
        ("cancel_reason", "Cancel Reason"),
        ("signup_date", "Signup Date"),
        ("last_activity_date", "Last Activity"),
    ]
    .into_iter()
    .collect()
}

#[test]
fn id_and_email_scenario_reports_one_error_each() {
    let schema = PredefinedSchema {
        name: "Scenario".into(),
        version: "1".into(),
        fields: vec![
            SchemaField::new("id", FieldType::Integer).required(),
            SchemaField::new("email", FieldType::String)
                .required()
                .with_pattern(r"^[^@\s]+@[^@\s]+\.[^@\s]+$"),
        ],
        cross_field_rules: Vec::new(),
    };
    let sample = RawTable::from_records(&[
        record(&[("id", "1"), ("email", "a@b.com")]),
        record(&[("id", "x"), ("email", "bad")]),
    ]);
    let mapping: Mapping = [("id", "id"), ("email", "email")].into_iter().collect();
    let result = validate_content(&schema, &mapping, &sample);
    assert!(!result.is_valid());
    let errors = result.errors();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors.iter().filter(|e| e.contains("cannot be parsed as integer")).count(), 1);
    assert_eq!(errors.iter().filter(|e| e.contains("do not match required pattern")).count(), 1);
}

#[test]
fn fixture_sample_flags_only_the_out_of_range_birth_date() {
    let sample = read_sample(&fixture_path("customers.csv"), true, b',', UTF_8, 1000)
        .expect("read fixture");
    let schema = PredefinedSchema::customer_import();
    let result = validate_mapping(&schema, &customer_mapping(), sample.headers(), &sample);
    assert_eq!(
        result.errors(),
        ["Column 'DOB' mapped to 'date_of_birth' has values before minimum allowed date 1900-01-01."]
    );
}

#[test]
fn cancelled_customers_need_a_reason() {
    let mut sample = read_sample(&fixture_path("customers.csv"), true, b',', UTF_8, 1000)
        .expect("read fixture");
    sample.truncate(2);
    let schema = PredefinedSchema::customer_import();
    let mut mapping = customer_mapping();
    // Point the reason at an always-empty column.
    mapping.insert("cancel_reason", "Website");
    mapping.remove("date_of_birth");
    let rows: Vec<RawRow> = sample
        .records()
        .map(|mut row| {
            row.insert("Website".into(), String::new());
            row
        })
        .collect();
    let blanked = RawTable::from_records(&rows);
    let result = validate_content(&schema, &mapping, &blanked);
    assert_eq!(
        result.errors(),
        ["Rule 'cancelled_requires_reason' violated: when 'status' is one of ['cancelled'], 'cancel_reason' must be non-empty."]
    );
}

#[test]
fn adding_the_missing_required_field_resolves_structure() {
    let schema = PredefinedSchema::customer_import();
    let available: Vec<String> = ["Customer ID", "First Name", "Last Name", "E-mail"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let mut mapping: Mapping = [
        ("customer_id", "Customer ID"),
        ("first_name", "First Name"),
        ("last_name", "Last Name"),
    ]
    .into_iter()
    .collect();
    let result = validate_structure(&schema, &mapping, &available);
    assert_eq!(result.errors(), ["Required field 'email' is not mapped."]);

    mapping.insert("email", "E-mail");
    assert!(validate_structure(&schema, &mapping, &available).is_valid());
}

#[test]
fn transform_fills_field_once_mapped() {
    let schema = PredefinedSchema::customer_import();
    let row = record(&[("Active", "off"), ("Joined", "2021-11-30")]);
    let before = transform_row(&schema, &row, &Mapping::new());
    assert_eq!(before.get("is_active"), Some(&FieldValue::Null));
    assert_eq!(before.len(), schema.fields.len());

    let mapping: Mapping = [("is_active", "Active"), ("signup_date", "Joined")]
        .into_iter()
        .collect();
    let after = transform_row(&schema, &row, &mapping);
    assert_eq!(after.get("is_active"), Some(&FieldValue::Boolean(false)));
    assert_eq!(
        after.get("signup_date"),
        Some(&FieldValue::Date(NaiveDate::from_ymd_opt(2021, 11, 30).unwrap()))
    );
}

fn any_day() -> impl Strategy<Value = NaiveDate> {
    (1i32..=2999, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).expect("valid generated date"))
}

proptest! {
    #[test]
    fn far_future_dates_always_fail_not_future(today in any_day()) {
        let schema = dated_schema(CrossFieldRule::not_future("no_future", "when"));
        let mapping: Mapping = [("when", "when")].into_iter().collect();
        let sample = RawTable::from_records(&[record(&[("when", "3000-01-01")])]);
        let result = validate_content_as_of(&schema, &mapping, &sample, today);
        prop_assert!(!result.is_valid());
        prop_assert!(result.errors()[0].contains("in the future (rule: no_future)"));
    }

    #[test]
    fn past_dates_pass_not_future_from_2020_on(
        today in (2020i32..=2999).prop_map(|y| NaiveDate::from_ymd_opt(y, 1, 1).unwrap())
    ) {
        let schema = dated_schema(CrossFieldRule::not_future("no_future", "when"));
        let mapping: Mapping = [("when", "when")].into_iter().collect();
        let sample = RawTable::from_records(&[record(&[("when", "2020-01-01")])]);
        prop_assert!(validate_content_as_of(&schema, &mapping, &sample, today).is_valid());
    }

    #[test]
    fn date_order_flags_exactly_the_inverted_pairs(start in any_day(), end in any_day()) {
        let schema = PredefinedSchema {
            name: "Order".into(),
            version: "1".into(),
            fields: vec![
                SchemaField::new("start", FieldType::Date),
                SchemaField::new("end", FieldType::Date),
            ],
            cross_field_rules: vec![CrossFieldRule::date_order("ordered", "start", "end")],
        };
        let mapping: Mapping = [("start", "s"), ("end", "e")].into_iter().collect();
        let s = start.format("%Y-%m-%d").to_string();
        let e = end.format("%Y-%m-%d").to_string();
        let sample = RawTable::from_records(&[record(&[("s", s.as_str()), ("e", e.as_str())])]);
        let today = NaiveDate::from_ymd_opt(3000, 1, 1).unwrap();
        let result = validate_content_as_of(&schema, &mapping, &sample, today);
        prop_assert_eq!(result.is_valid(), start <= end);
    }

    #[test]
    fn missing_required_mapping_is_always_named(drop_index in 0usize..4) {
        let schema = PredefinedSchema::customer_import();
        let required = schema.required_field_names();
        let dropped = required[drop_index];
        let available: Vec<String> = required.iter().map(|f| format!("col_{f}")).collect();
        let mapping: Mapping = required
            .iter()
            .filter(|f| **f != dropped)
            .map(|f| (f.to_string(), format!("col_{f}")))
            .collect();
        let result = validate_structure(&schema, &mapping, &available);
        prop_assert!(!result.is_valid());
        let expected = format!("Required field '{dropped}' is not mapped.");
        let expected = [expected];
        prop_assert_eq!(result.errors(), expected.as_slice());
    }
}
