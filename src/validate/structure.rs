use crate::{
    mapping::{Mapping, ValidationResult},
    schema::PredefinedSchema,
};

/// Checks that a mapping is complete and resolvable without reading any rows.
///
/// Two passes run back to back and their errors are concatenated: every
/// required field needs a non-empty mapping, then every mapped column must be
/// one of `available_columns`.
pub fn validate_structure(
    schema: &PredefinedSchema,
    mapping: &Mapping,
    available_columns: &[String],
) -> ValidationResult {
    let mut errors = Vec::new();

    for field in schema.required_field_names() {
        let mapped = mapping
            .column_for(field)
            .is_some_and(|column| !column.is_empty());
        if !mapped {
            errors.push(format!("Required field '{field}' is not mapped."));
        }
    }

    for (field, column) in mapping.entries_in_schema_order(schema) {
        if !available_columns.iter().any(|available| available == column) {
            errors.push(format!(
                "Schema field '{field}' is mapped to missing CSV column '{column}'."
            ));
        }
    }

    ValidationResult::from_errors(errors)
}
