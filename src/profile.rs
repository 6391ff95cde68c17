use std::path::Path;

use anyhow::Result;
use encoding_rs::Encoding;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{data::is_blank, source};

/// Prefix of names synthesized for headerless sources (`Column 1`, `Column 2`, ...).
pub const SYNTHETIC_COLUMN_PREFIX: &str = "Column ";
pub const MAX_SAMPLE_VALUES: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvColumnProfile {
    pub name: String,
    pub index: usize,
    pub sample_values: Vec<String>,
}

pub fn synthetic_column_name(index: usize) -> String {
    format!("{SYNTHETIC_COLUMN_PREFIX}{}", index + 1)
}

pub fn synthetic_column_names(count: usize) -> Vec<String> {
    (0..count).map(synthetic_column_name).collect()
}

pub fn is_synthetic_column_name(name: &str) -> bool {
    name.to_lowercase()
        .starts_with(&SYNTHETIC_COLUMN_PREFIX.to_lowercase())
}

/// Builds one profile per column from the leading rows of a source.
pub fn profile_rows(rows: &[Vec<String>], has_header: bool) -> Vec<CsvColumnProfile> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };

    let (names, data) = if has_header {
        let data = &rows[1..rows.len().min(MAX_SAMPLE_VALUES + 1)];
        (first.clone(), data)
    } else {
        let data = &rows[..rows.len().min(MAX_SAMPLE_VALUES)];
        let width = data.iter().map(Vec::len).max().unwrap_or_default();
        (synthetic_column_names(width), data)
    };

    names
        .into_iter()
        .enumerate()
        .map(|(index, name)| {
            let sample_values = data
                .iter()
                .filter_map(|row| row.get(index))
                .map(|value| value.trim())
                .filter(|value| !is_blank(value))
                .map(str::to_string)
                .collect();
            CsvColumnProfile {
                name,
                index,
                sample_values,
            }
        })
        .collect()
}

pub fn inspect_columns(
    path: &Path,
    has_header: bool,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<Vec<CsvColumnProfile>> {
    let limit = MAX_SAMPLE_VALUES + usize::from(has_header);
    let rows = source::read_raw_rows(path, delimiter, encoding, limit)?;
    let profiles = profile_rows(&rows, has_header);
    debug!(
        "Profiled {} column(s) from {} leading row(s) of {:?}",
        profiles.len(),
        rows.len(),
        path
    );
    Ok(profiles)
}
