use std::{io::Write, path::Path};

use anyhow::{Context, Result};
use chrono::Local;
use log::info;

use crate::{io_utils, schema::PredefinedSchema, transform::TransformedRecord};

pub const LOAD_DATETIME_COLUMN: &str = "load_datetime";

/// Destination for transformed records.
pub trait RecordSink {
    /// Persists the whole batch and returns how many records were written.
    fn persist(&mut self, records: &[TransformedRecord]) -> Result<usize>;
}

/// Writes records as CSV: a batch timestamp column, then the schema fields in declaration order.
pub struct CsvRecordSink {
    writer: csv::Writer<Box<dyn Write>>,
    fields: Vec<String>,
}

impl CsvRecordSink {
    pub fn create(path: &Path, schema: &PredefinedSchema, delimiter: u8) -> Result<Self> {
        let writer = io_utils::open_csv_writer(path, delimiter)?;
        Self::from_writer(writer, schema)
    }

    pub fn from_writer(
        mut writer: csv::Writer<Box<dyn Write>>,
        schema: &PredefinedSchema,
    ) -> Result<Self> {
        let fields: Vec<String> = schema.fields.iter().map(|f| f.name.clone()).collect();
        let headers =
            std::iter::once(LOAD_DATETIME_COLUMN).chain(fields.iter().map(String::as_str));
        writer
            .write_record(headers)
            .context("Writing output headers")?;
        Ok(Self { writer, fields })
    }
}

impl RecordSink for CsvRecordSink {
    fn persist(&mut self, records: &[TransformedRecord]) -> Result<usize> {
        let load_datetime = Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string();
        for (idx, record) in records.iter().enumerate() {
            let mut row = Vec::with_capacity(self.fields.len() + 1);
            row.push(load_datetime.clone());
            row.extend(self.fields.iter().map(|field| {
                record
                    .get(field)
                    .map(|value| value.as_display())
                    .unwrap_or_default()
            }));
            self.writer
                .write_record(&row)
                .with_context(|| format!("Writing record {}", idx + 1))?;
        }
        self.writer.flush().context("Flushing output")?;
        info!("Persisted {} record(s)", records.len());
        Ok(records.len())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::{mapping::Mapping, source::RawRow, transform::transform_row};
    use tempfile::tempdir;

    #[test]
    fn writes_timestamp_then_schema_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let schema = PredefinedSchema::customer_import();
        let mapping: Mapping = [
            ("customer_id", "id"),
            ("is_active", "active"),
            ("signup_date", "joined"),
        ]
        .into_iter()
        .collect();
        let raw: RawRow = [("id", "C1"), ("active", "no"), ("joined", "02/01/2023")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let record = transform_row(&schema, &raw, &mapping);

        let mut sink = CsvRecordSink::create(&path, &schema, b',').unwrap();
        assert_eq!(sink.persist(&[record.clone(), record]).unwrap(), 2);
        drop(sink);

        let contents = fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("load_datetime,customer_id,first_name,"));
        let first = lines.next().unwrap();
        let cells: Vec<&str> = first.split(',').collect();
        assert_eq!(cells.len(), schema.fields.len() + 1);
        assert_eq!(cells[1], "C1");
        assert_eq!(cells[2], "");
        let active = schema.fields.iter().position(|f| f.name == "is_active").unwrap();
        assert_eq!(cells[active + 1], "false");
        let signup = schema.fields.iter().position(|f| f.name == "signup_date").unwrap();
        assert_eq!(cells[signup + 1], "2023-01-02");
        assert_eq!(lines.count(), 1);
    }
}
