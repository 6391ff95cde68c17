//! Target schema model: typed fields, cross-field rules, and the built-in
//! `CustomerImport` schema.
//!
//! A [`PredefinedSchema`] is constructed once (built in, or loaded from YAML),
//! checked with [`PredefinedSchema::check`], and then shared read-only by the
//! suggester, the validators, and the row transformer.

use std::{
    collections::{BTreeMap, HashSet},
    fmt,
    fs::File,
    io::BufReader,
    path::Path,
    str::FromStr,
};

use anyhow::{Context, Result, anyhow};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use thiserror::Error;

use crate::data::parse_date;

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";
const WEBSITE_PATTERN: &str = r"^(https?://)?((([a-zA-Z0-9-]+\.)+[a-zA-Z]{2,})|localhost|(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}))(:\d+)?(/[-a-zA-Z0-9%_.~+]*)*(\?[;&a-zA-Z0-9%_.~+=-]*)?(#[-a-zA-Z0-9_]*)?$";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Duplicate field name '{0}' in schema")]
    DuplicateField(String),
    #[error("Field '{field}' declares an invalid pattern: {message}")]
    InvalidPattern { field: String, message: String },
    #[error("Field '{field}' has {bound} '{value}' which is not an accepted date")]
    InvalidDateBound {
        field: String,
        bound: &'static str,
        value: String,
    },
    #[error("Field '{field}' has {lower} greater than {upper}")]
    InvertedBounds {
        field: String,
        lower: &'static str,
        upper: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    Date,
    DateTime,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::DateTime => "datetime",
        }
    }

    pub fn variants() -> &'static [&'static str] {
        &["string", "integer", "float", "boolean", "date", "datetime"]
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, FieldType::Date | FieldType::DateTime)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "string" | "str" | "text" => Ok(FieldType::String),
            "integer" | "int" => Ok(FieldType::Integer),
            "float" | "double" | "number" => Ok(FieldType::Float),
            "boolean" | "bool" => Ok(FieldType::Boolean),
            "date" => Ok(FieldType::Date),
            "datetime" | "date-time" | "timestamp" => Ok(FieldType::DateTime),
            _ => Err(anyhow!(
                "Unknown field type '{value}'. Supported types: {}",
                FieldType::variants().join(", ")
            )),
        }
    }
}

impl Serialize for FieldType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let token = String::deserialize(deserializer)?;
        FieldType::from_str(&token).map_err(|err| de::Error::custom(err.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_date: Option<String>,
}

impl SchemaField {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            description: None,
            allowed_values: None,
            pattern: None,
            min_length: None,
            max_length: None,
            min_value: None,
            max_value: None,
            min_date: None,
            max_date: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    pub fn with_value_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_value = min;
        self.max_value = max;
        self
    }

    pub fn with_date_range(mut self, min: Option<&str>, max: Option<&str>) -> Self {
        self.min_date = min.map(str::to_string);
        self.max_date = max.map(str::to_string);
        self
    }

    pub fn with_allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Compiles `pattern` anchored at the start of the value, so a pattern
    /// without a leading `^` still has to match from the first character.
    pub fn pattern_regex(&self) -> Option<Result<Regex, regex::Error>> {
        self.pattern
            .as_deref()
            .map(|pattern| Regex::new(&format!("^(?:{pattern})")))
    }

    fn check(&self) -> Result<(), SchemaError> {
        if let Some(Err(err)) = self.pattern_regex() {
            return Err(SchemaError::InvalidPattern {
                field: self.name.clone(),
                message: err.to_string(),
            });
        }
        for (bound, value) in [("min_date", &self.min_date), ("max_date", &self.max_date)] {
            if let Some(value) = value
                && parse_date(value).is_none()
            {
                return Err(SchemaError::InvalidDateBound {
                    field: self.name.clone(),
                    bound,
                    value: value.clone(),
                });
            }
        }
        if let (Some(min), Some(max)) = (self.min_length, self.max_length)
            && min > max
        {
            return Err(self.inverted("min_length", "max_length"));
        }
        if let (Some(min), Some(max)) = (self.min_value, self.max_value)
            && min > max
        {
            return Err(self.inverted("min_value", "max_value"));
        }
        if let (Some(min), Some(max)) = (
            self.min_date.as_deref().and_then(parse_date),
            self.max_date.as_deref().and_then(parse_date),
        ) && min > max
        {
            return Err(self.inverted("min_date", "max_date"));
        }
        Ok(())
    }

    fn inverted(&self, lower: &'static str, upper: &'static str) -> SchemaError {
        SchemaError::InvertedBounds {
            field: self.name.clone(),
            lower,
            upper,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    /// `field_a` must not be later than `field_b`.
    DateOrder,
    /// `field_a` must not be later than today.
    NotFuture,
    /// When `field_a` takes one of `params.values`, `field_b` must be non-empty.
    ConditionalRequired,
}

impl RuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::DateOrder => "date_order",
            RuleType::NotFuture => "not_future",
            RuleType::ConditionalRequired => "conditional_required",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrossFieldRule {
    pub name: String,
    pub rule_type: RuleType,
    pub field_a: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_b: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, serde_json::Value>,
}

impl CrossFieldRule {
    pub fn not_future(name: &str, field: &str) -> Self {
        Self {
            name: name.to_string(),
            rule_type: RuleType::NotFuture,
            field_a: field.to_string(),
            field_b: None,
            params: BTreeMap::new(),
        }
    }

    pub fn date_order(name: &str, earlier: &str, later: &str) -> Self {
        Self {
            name: name.to_string(),
            rule_type: RuleType::DateOrder,
            field_a: earlier.to_string(),
            field_b: Some(later.to_string()),
            params: BTreeMap::new(),
        }
    }

    pub fn conditional_required(
        name: &str,
        trigger: &str,
        dependent: &str,
        values: &[&str],
    ) -> Self {
        let mut params = BTreeMap::new();
        params.insert(
            "values".to_string(),
            serde_json::Value::from(values.iter().map(|v| v.to_string()).collect::<Vec<_>>()),
        );
        Self {
            name: name.to_string(),
            rule_type: RuleType::ConditionalRequired,
            field_a: trigger.to_string(),
            field_b: Some(dependent.to_string()),
            params,
        }
    }

    pub fn trigger_values(&self) -> Vec<String> {
        match self.params.get("values") {
            Some(serde_json::Value::Array(items)) => items.iter().map(json_to_text).collect(),
            Some(serde_json::Value::Null) | None => Vec::new(),
            Some(single) => vec![json_to_text(single)],
        }
    }
}

fn json_to_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredefinedSchema {
    pub name: String,
    pub version: String,
    pub fields: Vec<SchemaField>,
    #[serde(default)]
    pub cross_field_rules: Vec<CrossFieldRule>,
}

impl PredefinedSchema {
    pub fn field_by_name(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn required_field_names(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|field| field.required)
            .map(|field| field.name.as_str())
            .collect()
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|field| field.name.as_str()).collect()
    }

    pub fn check(&self) -> Result<(), SchemaError> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
            field.check()?;
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening schema file {path:?}"))?;
        let reader = BufReader::new(file);
        let schema: PredefinedSchema =
            serde_yaml::from_reader(reader).context("Parsing schema YAML")?;
        schema
            .check()
            .with_context(|| format!("Checking schema {path:?}"))?;
        Ok(schema)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Serializing schema to YAML string")
    }

    pub fn customer_import() -> Self {
        let fields = vec![
            SchemaField::new("customer_id", FieldType::String)
                .required()
                .with_description("Unique customer ID")
                .with_length(Some(1), Some(64)),
            SchemaField::new("first_name", FieldType::String)
                .required()
                .with_length(Some(1), Some(100)),
            SchemaField::new("last_name", FieldType::String)
                .required()
                .with_length(Some(1), Some(100)),
            SchemaField::new("email", FieldType::String)
                .required()
                .with_pattern(EMAIL_PATTERN)
                .with_length(None, Some(255)),
            SchemaField::new("date_of_birth", FieldType::Date)
                .with_date_range(Some("1900-01-01"), None),
            SchemaField::new("website", FieldType::String).with_pattern(WEBSITE_PATTERN),
            SchemaField::new("is_active", FieldType::Boolean),
            SchemaField::new("status", FieldType::String)
                .with_allowed_values(["active", "inactive", "paused", "cancelled"]),
            SchemaField::new("cancel_reason", FieldType::String).with_length(None, Some(255)),
            SchemaField::new("signup_date", FieldType::Date)
                .with_date_range(Some("1900-01-01"), None),
            SchemaField::new("last_activity_date", FieldType::Date)
                .with_date_range(Some("1900-01-01"), None),
        ];
        let cross_field_rules = vec![
            CrossFieldRule::not_future("dob_not_future", "date_of_birth"),
            CrossFieldRule::not_future("signup_not_future", "signup_date"),
            CrossFieldRule::conditional_required(
                "cancelled_requires_reason",
                "status",
                "cancel_reason",
                &["cancelled"],
            ),
            CrossFieldRule::date_order(
                "signup_before_last_activity",
                "signup_date",
                "last_activity_date",
            ),
        ];
        PredefinedSchema {
            name: "CustomerImport".to_string(),
            version: "1.0".to_string(),
            fields,
            cross_field_rules,
        }
    }
}
