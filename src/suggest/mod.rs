//! Heuristic column-to-field suggestions.
//!
//! Every column is scored against every schema field from two signals: how
//! closely the names agree and how well the column's samples fit the value
//! shape the field name implies (see [`content`]). Only scores strictly above
//! [`MIN_CONFIDENCE`] become suggestions.

mod assignment;
pub mod content;

use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use crate::{
    mapping::MappingSuggestion,
    profile::{CsvColumnProfile, is_synthetic_column_name},
    schema::PredefinedSchema,
};

pub use content::content_match_score;

/// Scores at or below this value are never suggested.
pub const MIN_CONFIDENCE: f64 = 0.4;
pub const CONTENT_WEIGHT: f64 = 0.9;

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid separator regex"));

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SuggestStrategy {
    /// Best column per field, scored independently. Two fields may share a column.
    #[default]
    Greedy,
    /// One-to-one assignment maximising the total score.
    Exclusive,
}

pub fn normalize_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    NON_ALPHANUMERIC
        .replace_all(&lowered, " ")
        .trim()
        .to_string()
}

/// Name agreement between a column and a target field.
///
/// `1.0` for equal normalized names, `0.8` when the field name occurs inside
/// the column name, `0.6` for the reverse, `0.0` otherwise.
pub fn name_similarity(column: &str, field: &str) -> f64 {
    let column = normalize_name(column);
    let field = normalize_name(field);
    if column.is_empty() || field.is_empty() {
        return if column == field { 1.0 } else { 0.0 };
    }
    if column == field {
        1.0
    } else if column.contains(&field) {
        0.8
    } else if field.contains(&column) {
        0.6
    } else {
        0.0
    }
}

pub fn score_column(column: &CsvColumnProfile, field_name: &str) -> f64 {
    let content = content_match_score(&column.sample_values, field_name);
    if is_synthetic_column_name(&column.name) {
        return content;
    }
    let name = name_similarity(&column.name, field_name);
    name.max(content * CONTENT_WEIGHT)
}

pub fn suggest_mappings(
    columns: &[CsvColumnProfile],
    schema: &PredefinedSchema,
) -> Vec<MappingSuggestion> {
    suggest_mappings_with(columns, schema, SuggestStrategy::Greedy)
}

/// At most one suggestion per schema field, in schema declaration order.
pub fn suggest_mappings_with(
    columns: &[CsvColumnProfile],
    schema: &PredefinedSchema,
    strategy: SuggestStrategy,
) -> Vec<MappingSuggestion> {
    let scores: Vec<Vec<f64>> = schema
        .fields
        .iter()
        .map(|field| {
            columns
                .iter()
                .map(|column| {
                    let score = score_column(column, &field.name);
                    debug!(
                        "Score {score:.3} for column '{}' against field '{}'",
                        column.name, field.name
                    );
                    score
                })
                .collect()
        })
        .collect();

    let picks: Vec<Option<usize>> = match strategy {
        SuggestStrategy::Greedy => scores.iter().map(|row| best_column(row)).collect(),
        SuggestStrategy::Exclusive => {
            // Only admitted pairs compete for columns.
            let admitted: Vec<Vec<f64>> = scores
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|&score| if score > MIN_CONFIDENCE { score } else { 0.0 })
                        .collect()
                })
                .collect();
            assignment::maximise(&admitted, columns.len())
        }
    };

    schema
        .fields
        .iter()
        .zip(picks)
        .enumerate()
        .filter_map(|(field_index, (field, pick))| {
            let column_index = pick?;
            let confidence = scores[field_index][column_index];
            if confidence <= MIN_CONFIDENCE {
                debug!(
                    "No suggestion for field '{}' (best {confidence:.3})",
                    field.name
                );
                return None;
            }
            Some(MappingSuggestion {
                schema_field: field.name.clone(),
                csv_column: columns[column_index].name.clone(),
                confidence,
            })
        })
        .collect()
}

// Ties keep the earliest column.
fn best_column(scores: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, &score) in scores.iter().enumerate() {
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((index, score));
        }
    }
    best.map(|(index, _)| index)
}
