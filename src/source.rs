//! Raw source access: materialising rows from a delimited file and guessing
//! whether its first line is a header.

use std::{
    collections::{BTreeMap, HashMap},
    fs::File,
    io::Read,
    path::Path,
};

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use itertools::Itertools;
use log::debug;

use crate::{
    data::{parse_bool, parse_calendar_date, parse_number},
    io_utils,
    profile::synthetic_column_names,
};

/// One raw row keyed by column name. Cells a short row never had are absent.
pub type RawRow = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn from_records(records: &[RawRow]) -> Self {
        let headers: Vec<String> = records
            .iter()
            .flat_map(|record| record.keys().cloned())
            .unique()
            .collect();
        let rows = records
            .iter()
            .map(|record| {
                headers
                    .iter()
                    .map(|name| record.get(name).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    /// Every row's value for `name`, with cells missing from short rows read as empty.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let index = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(index).map(String::as_str).unwrap_or(""))
                .collect(),
        )
    }

    pub fn truncate(&mut self, max_rows: usize) {
        self.rows.truncate(max_rows);
    }

    pub fn record(&self, row_index: usize) -> Option<RawRow> {
        let row = self.rows.get(row_index)?;
        let mut record = RawRow::new();
        for (header, value) in self.headers.iter().zip(row) {
            record
                .entry(header.clone())
                .or_insert_with(|| value.clone());
        }
        Some(record)
    }

    pub fn records(&self) -> impl Iterator<Item = RawRow> + '_ {
        (0..self.rows.len()).filter_map(|idx| self.record(idx))
    }
}

fn table_from_rows(mut rows: Vec<Vec<String>>, has_header: bool) -> RawTable {
    if rows.is_empty() {
        return RawTable::default();
    }
    if has_header {
        let headers = rows.remove(0);
        RawTable::new(headers, rows)
    } else {
        let width = rows.iter().map(Vec::len).max().unwrap_or_default();
        RawTable::new(synthetic_column_names(width), rows)
    }
}

pub fn read_rows(
    path: &Path,
    has_header: bool,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<RawTable> {
    let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
    let rows = io_utils::read_records(&mut reader, encoding, None)
        .with_context(|| format!("Reading rows from {path:?}"))?;
    Ok(table_from_rows(rows, has_header))
}

pub fn read_sample(
    path: &Path,
    has_header: bool,
    delimiter: u8,
    encoding: &'static Encoding,
    max_rows: usize,
) -> Result<RawTable> {
    let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
    let limit = max_rows + usize::from(has_header);
    let rows = io_utils::read_records(&mut reader, encoding, Some(limit))
        .with_context(|| format!("Reading sample rows from {path:?}"))?;
    Ok(table_from_rows(rows, has_header))
}

pub fn read_raw_rows(
    path: &Path,
    delimiter: u8,
    encoding: &'static Encoding,
    limit: usize,
) -> Result<Vec<Vec<String>>> {
    let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
    io_utils::read_records(&mut reader, encoding, Some(limit))
        .with_context(|| format!("Reading leading rows from {path:?}"))
}

/// Guesses whether the first line of `path` is a header.
///
/// Only the first `sample_bytes` bytes are examined. Unreadable, empty, or
/// ambiguous samples answer `true`.
pub fn detect_header(
    path: &Path,
    delimiter: u8,
    encoding: &'static Encoding,
    sample_bytes: usize,
) -> bool {
    match read_leading_bytes(path, sample_bytes) {
        Ok((bytes, truncated)) => detect_header_in_sample(&bytes, truncated, delimiter, encoding),
        Err(err) => {
            debug!("Header detection fell back to header=true: {err:#}");
            true
        }
    }
}

fn read_leading_bytes(path: &Path, sample_bytes: usize) -> Result<(Vec<u8>, bool)> {
    let file = File::open(path).with_context(|| format!("Opening input file {path:?}"))?;
    let mut buffer = Vec::with_capacity(sample_bytes);
    // One extra byte tells us whether the sample cut the file short.
    file.take(sample_bytes as u64 + 1)
        .read_to_end(&mut buffer)
        .with_context(|| format!("Reading header sample from {path:?}"))?;
    let truncated = buffer.len() > sample_bytes;
    buffer.truncate(sample_bytes);
    Ok((buffer, truncated))
}

pub(crate) fn detect_header_in_sample(
    bytes: &[u8],
    truncated: bool,
    delimiter: u8,
    encoding: &'static Encoding,
) -> bool {
    let mut sample = bytes;
    if truncated && let Some(last_newline) = bytes.iter().rposition(|b| *b == b'\n') {
        sample = &bytes[..=last_newline];
    }
    let mut reader = io_utils::open_csv_reader(sample, delimiter);
    let rows = match io_utils::read_records(&mut reader, encoding, None) {
        Ok(rows) => rows,
        Err(err) => {
            debug!("Header sample is malformed, assuming a header: {err:#}");
            return true;
        }
    };
    match rows.split_first() {
        Some((first, rest)) => infer_has_header(first, rest),
        None => true,
    }
}

fn value_is_data_like(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return false;
    }
    parse_bool(trimmed).is_some()
        || parse_number(trimmed, false).is_some()
        || parse_number(&trimmed.replace([',', '$'], ""), false).is_some()
        || parse_calendar_date(trimmed).is_some()
}

fn value_is_header_like(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty()
        && !value_is_data_like(trimmed)
        && trimmed.chars().any(|c| c.is_alphabetic())
}

fn infer_has_header(first_row: &[String], other_rows: &[Vec<String>]) -> bool {
    let header_like_first = first_row.iter().filter(|v| value_is_header_like(v)).count();
    let data_like_first = first_row.iter().filter(|v| value_is_data_like(v)).count();

    let mut header_signal = 0usize;
    let mut data_signal = 0usize;

    for (column, first_value) in first_row.iter().enumerate() {
        let others: Vec<&str> = other_rows
            .iter()
            .filter_map(|row| row.get(column))
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .collect();
        if others.is_empty() {
            continue;
        }
        let others_are_data = others.iter().all(|value| value_is_data_like(value));
        if others_are_data {
            if value_is_header_like(first_value) {
                header_signal += 1;
            } else if value_is_data_like(first_value) {
                data_signal += 1;
            }
            continue;
        }
        if others.len() < 2 {
            continue;
        }
        let lengths: HashMap<usize, usize> = others.iter().map(|v| v.chars().count()).counts();
        if lengths.len() == 1 && !lengths.contains_key(&first_value.trim().chars().count()) {
            header_signal += 1;
        }
    }

    debug!(
        "Header vote: {header_signal} header signal(s), {data_signal} data signal(s), first row {header_like_first} text / {data_like_first} data"
    );

    if header_signal != data_signal {
        return header_signal > data_signal;
    }
    data_like_first <= header_like_first
}
