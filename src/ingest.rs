use anyhow::{Result, bail};
use itertools::Itertools;
use log::{info, warn};

use crate::{
    cli::IngestArgs,
    io_utils::DEFAULT_CSV_DELIMITER,
    session::Session,
    sink::{CsvRecordSink, RecordSink},
    source,
    transform::{TransformedRecord, transform_row},
    validate,
};

/// Validates the mapping, transforms every row, and persists the records.
pub fn execute(session: &Session, args: &IngestArgs) -> Result<()> {
    let schema = &session.schema;
    let source = session.resolve_source(&args.source)?;
    let mapping = session.resolve_mapping(&args.mapping)?;

    let available = source.column_names()?;
    let structural = validate::validate_structure(schema, &mapping, &available);
    if !structural.is_valid() {
        bail!(
            "Cannot ingest with an invalid mapping: {}",
            structural.errors().iter().join("; ")
        );
    }

    let sample = source::read_sample(
        &source.path,
        source.has_header,
        source.delimiter,
        source.encoding,
        session.settings.validation_sample_rows,
    )?;
    let content = validate::validate_content(schema, &mapping, &sample);
    if !content.is_valid() {
        if !args.allow_invalid {
            bail!(
                "Content validation failed: {}",
                content.errors().iter().join("; ")
            );
        }
        for error in content.errors() {
            warn!("Ingesting despite: {error}");
        }
    }

    let table = source::read_rows(
        &source.path,
        source.has_header,
        source.delimiter,
        source.encoding,
    )?;
    let records: Vec<TransformedRecord> = table
        .records()
        .map(|row| transform_row(schema, &row, &mapping))
        .collect();

    let mut sink = CsvRecordSink::create(&args.output, schema, DEFAULT_CSV_DELIMITER)?;
    let saved = sink.persist(&records)?;
    info!("Ingested {saved} record(s) into {:?}", args.output);
    println!("{saved}");
    Ok(())
}
