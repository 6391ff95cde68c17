use std::collections::BTreeMap;

use anyhow::{Result, anyhow, ensure};
use serde::{Deserialize, Serialize};

use crate::schema::PredefinedSchema;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mapping(BTreeMap<String, String>);

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        field: impl Into<String>,
        column: impl Into<String>,
    ) -> Option<String> {
        self.0.insert(field.into(), column.into())
    }

    pub fn remove(&mut self, field: &str) -> Option<String> {
        self.0.remove(field)
    }

    pub fn column_for(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Entries in schema declaration order, followed by keys the schema does not declare.
    pub fn entries_in_schema_order<'a>(
        &'a self,
        schema: &'a PredefinedSchema,
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        let declared = schema.fields.iter().filter_map(|field| {
            self.column_for(&field.name)
                .map(|column| (field.name.as_str(), column))
        });
        let extra = self
            .iter()
            .filter(|(field, _)| schema.field_by_name(field).is_none());
        declared.chain(extra)
    }

    /// Parses `field=column` pairs; later pairs for the same field win.
    pub fn from_pairs<S: AsRef<str>>(pairs: &[S]) -> Result<Self> {
        let mut mapping = Mapping::new();
        for raw in pairs {
            let raw = raw.as_ref();
            let (field, column) = raw
                .split_once('=')
                .ok_or_else(|| anyhow!("Mapping '{raw}' must use the form field=column"))?;
            let field = field.trim();
            ensure!(!field.is_empty(), "Mapping '{raw}' names an empty field");
            mapping.insert(field, column.trim());
        }
        Ok(mapping)
    }
}

impl<K, V> FromIterator<(K, V)> for Mapping
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Mapping(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingSuggestion {
    pub schema_field: String,
    pub csv_column: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    is_valid: bool,
    errors: Vec<String>,
}

impl ValidationResult {
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }

    pub fn valid() -> Self {
        Self::from_errors(Vec::new())
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn merge(self, other: ValidationResult) -> Self {
        let mut errors = self.errors;
        errors.extend(other.errors);
        Self::from_errors(errors)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedMapping {
    pub id: String,
    pub name: String,
    pub schema_name: String,
    pub schema_version: String,
    pub mapping: Mapping,
}
