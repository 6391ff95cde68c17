use itertools::Itertools;

use crate::{
    data::{is_blank, parse_bool, parse_date, parse_datetime, parse_number},
    schema::{FieldType, SchemaField},
};

/// Boolean columns only have their leading values inspected.
pub const BOOLEAN_PROBE_LIMIT: usize = 10;
/// Offending values quoted in an aggregated error.
pub const MAX_REPORTED_VALUES: usize = 5;

/// Appends every violation found in `values`, the sampled cells of `column`.
pub(crate) fn check_field(
    field: &SchemaField,
    column: &str,
    values: &[&str],
    errors: &mut Vec<String>,
) {
    let prefix = format!("Column '{column}' mapped to '{}'", field.name);

    if field.required && values.iter().all(|value| is_blank(value)) {
        errors.push(format!(
            "Required field '{}' mapped to column '{column}' contains only empty values in the sample.",
            field.name
        ));
    }

    let present: Vec<&str> = values.iter().copied().filter(|v| !is_blank(v)).collect();
    if present.is_empty() {
        return;
    }

    match field.field_type {
        FieldType::Integer | FieldType::Float => check_numeric(field, &prefix, &present, errors),
        FieldType::Date | FieldType::DateTime => check_temporal(field, &prefix, &present, errors),
        FieldType::Boolean => {
            if let Some(bad) = present
                .iter()
                .take(BOOLEAN_PROBE_LIMIT)
                .find(|value| parse_bool(value).is_none())
            {
                errors.push(format!("{prefix} contains non-boolean value '{bad}'."));
            }
        }
        FieldType::String => {}
    }

    if let Some(allowed) = &field.allowed_values {
        let invalid: Vec<&str> = present
            .iter()
            .copied()
            .filter(|value| !allowed.iter().any(|a| a == value))
            .unique()
            .collect();
        if !invalid.is_empty() {
            errors.push(format!(
                "{prefix} contains values not in allowed set: {}...",
                quoted_list(&invalid)
            ));
        }
    }

    if field.field_type == FieldType::String {
        check_string(field, &prefix, &present, errors);
    }
}

fn check_numeric(field: &SchemaField, prefix: &str, present: &[&str], errors: &mut Vec<String>) {
    let integral = field.field_type == FieldType::Integer;
    let Some(numbers) = present
        .iter()
        .map(|value| parse_number(value, integral))
        .collect::<Option<Vec<f64>>>()
    else {
        errors.push(format!("{prefix} cannot be parsed as {}.", field.field_type));
        return;
    };
    if let Some(min) = field.min_value
        && numbers.iter().any(|n| *n < min)
    {
        errors.push(format!("{prefix} has values below {min}."));
    }
    if let Some(max) = field.max_value
        && numbers.iter().any(|n| *n > max)
    {
        errors.push(format!("{prefix} has values above {max}."));
    }
}

fn check_temporal(field: &SchemaField, prefix: &str, present: &[&str], errors: &mut Vec<String>) {
    let kind = field.field_type;
    let mut parsed = Vec::with_capacity(present.len());
    for value in present {
        let date = match kind {
            FieldType::DateTime => parse_datetime(value).map(|dt| dt.date()),
            _ => parse_date(value),
        };
        match date {
            Some(date) => parsed.push(date),
            None => errors.push(format!("{prefix} has invalid {kind} value '{value}'.")),
        }
    }
    if parsed.is_empty() {
        return;
    }
    if let Some(raw) = &field.min_date
        && let Some(min) = parse_date(raw)
        && parsed.iter().any(|d| *d < min)
    {
        errors.push(format!(
            "{prefix} has values before minimum allowed date {raw}."
        ));
    }
    if let Some(raw) = &field.max_date
        && let Some(max) = parse_date(raw)
        && parsed.iter().any(|d| *d > max)
    {
        errors.push(format!("{prefix} has values after maximum allowed date {raw}."));
    }
}

fn check_string(field: &SchemaField, prefix: &str, present: &[&str], errors: &mut Vec<String>) {
    match field.pattern_regex() {
        Some(Ok(regex)) => {
            let bad: Vec<&str> = present
                .iter()
                .copied()
                .filter(|value| !regex.is_match(value))
                .take(MAX_REPORTED_VALUES)
                .collect();
            if !bad.is_empty() {
                errors.push(format!(
                    "{prefix} has values that do not match required pattern (e.g. {}).",
                    quoted_list(&bad)
                ));
            }
        }
        Some(Err(err)) => {
            errors.push(format!("{prefix} declares an invalid pattern: {err}."));
        }
        None => {}
    }

    if let Some(min) = field.min_length
        && present.iter().any(|value| value.chars().count() < min)
    {
        errors.push(format!("{prefix} has values shorter than {min} characters."));
    }
    if let Some(max) = field.max_length
        && present.iter().any(|value| value.chars().count() > max)
    {
        errors.push(format!("{prefix} has values longer than {max} characters."));
    }
}

/// Renders at most [`MAX_REPORTED_VALUES`] values as `['a', 'b']`.
fn quoted_list(values: &[&str]) -> String {
    let inner = values
        .iter()
        .take(MAX_REPORTED_VALUES)
        .map(|value| format!("'{value}'"))
        .join(", ");
    format!("[{inner}]")
}
