pub mod cli;
pub mod config;
pub mod data;
pub mod ingest;
pub mod io_utils;
pub mod mapping;
pub mod mapping_cmd;
pub mod profile;
pub mod schema;
pub mod session;
pub mod sink;
pub mod source;
pub mod store;
pub mod suggest;
pub mod table;
pub mod transform;
pub mod upload;
pub mod validate;

use std::{env, fs::File, io::BufReader, sync::OnceLock};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{LevelFilter, info};

use crate::{
    cli::{Cli, Commands, OutputFormat, SchemaFormat},
    io_utils::printable_delimiter,
    session::Session,
    suggest::SuggestStrategy,
    table::Table,
    upload::UploadMetadata,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_mapper", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let session = Session::load(cli.config.as_deref(), cli.schema.as_deref())?;
    match cli.command {
        Commands::Schema(args) => handle_schema(&session, &args),
        Commands::Upload(args) => handle_upload(&session, &args),
        Commands::Columns(args) => handle_columns(&session, &args),
        Commands::Suggest(args) => handle_suggest(&session, &args),
        Commands::Preview(args) => handle_preview(&session, &args),
        Commands::Validate(args) => handle_validate(&session, &args),
        Commands::Mapping(args) => mapping_cmd::execute(&session, &args),
        Commands::Ingest(args) => ingest::execute(&session, &args),
    }
}

fn handle_schema(session: &Session, args: &cli::SchemaArgs) -> Result<()> {
    let rendered = match args.format {
        SchemaFormat::Yaml => session.schema.to_yaml_string()?,
        SchemaFormat::Json => serde_json::to_string_pretty(&session.schema)
            .context("Serializing schema to JSON")?,
    };
    println!("{}", rendered.trim_end());
    Ok(())
}

fn handle_upload(session: &Session, args: &cli::UploadArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let file = File::open(&args.input)
        .with_context(|| format!("Opening upload source {:?}", args.input))?;
    let settings = &session.settings;
    let file_id = upload::store_upload(
        BufReader::new(file),
        &settings.upload_dir,
        settings.max_upload_size_mb,
    )?;
    let stored = upload::upload_path(&settings.upload_dir, &file_id)?;
    let has_header =
        source::detect_header(&stored, delimiter, encoding, settings.header_sample_bytes);
    let metadata = UploadMetadata {
        file_id,
        original_filename: args
            .input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned()),
        has_header,
        delimiter: printable_delimiter(delimiter),
        encoding: encoding.name().to_string(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&metadata).context("Serializing upload metadata")?
    );
    Ok(())
}

fn handle_columns(session: &Session, args: &cli::ColumnsArgs) -> Result<()> {
    let source = session.resolve_source(&args.source)?;
    let profiles = profile::inspect_columns(
        &source.path,
        source.has_header,
        source.delimiter,
        source.encoding,
    )?;
    info!("Found {} column(s) in {:?}", profiles.len(), source.path);
    match args.format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&profiles).context("Serializing column profiles")?
        ),
        OutputFormat::Table => {
            let mut table = Table::new(["#", "column", "samples"]);
            for profile in &profiles {
                table.push_row([
                    (profile.index + 1).to_string(),
                    profile.name.clone(),
                    profile.sample_values.join(" | "),
                ]);
            }
            table.print();
        }
    }
    Ok(())
}

fn handle_suggest(session: &Session, args: &cli::SuggestArgs) -> Result<()> {
    let source = session.resolve_source(&args.source)?;
    let profiles = profile::inspect_columns(
        &source.path,
        source.has_header,
        source.delimiter,
        source.encoding,
    )?;
    let strategy = if args.exclusive {
        SuggestStrategy::Exclusive
    } else {
        SuggestStrategy::Greedy
    };
    let suggestions = suggest::suggest_mappings_with(&profiles, &session.schema, strategy);
    info!(
        "Suggested {} of {} field(s) using {:?} matching",
        suggestions.len(),
        session.schema.fields.len(),
        strategy
    );
    match args.format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&suggestions).context("Serializing suggestions")?
        ),
        OutputFormat::Table => {
            let mut table = Table::new(["field", "column", "confidence"]);
            for suggestion in &suggestions {
                table.push_row([
                    suggestion.schema_field.clone(),
                    suggestion.csv_column.clone(),
                    format!("{:.2}", suggestion.confidence),
                ]);
            }
            table.print();
        }
    }
    Ok(())
}

fn handle_preview(session: &Session, args: &cli::PreviewArgs) -> Result<()> {
    let source = session.resolve_source(&args.source)?;
    let sample = source::read_sample(
        &source.path,
        source.has_header,
        source.delimiter,
        source.encoding,
        args.rows,
    )?;
    let mut table = Table::new(sample.headers().iter().cloned());
    for row in sample.rows() {
        table.push_row(row.iter().cloned());
    }
    table.print();
    Ok(())
}

fn handle_validate(session: &Session, args: &cli::ValidateArgs) -> Result<()> {
    let source = session.resolve_source(&args.source)?;
    let mapping = session.resolve_mapping(&args.mapping)?;
    let available = source.column_names()?;
    let sample = source::read_sample(
        &source.path,
        source.has_header,
        source.delimiter,
        source.encoding,
        session.settings.validation_sample_rows,
    )?;
    let result = validate::validate_mapping(&session.schema, &mapping, &available, &sample);
    match args.format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&result).context("Serializing validation result")?
        ),
        OutputFormat::Table => {
            if result.is_valid() {
                println!("Mapping is valid.");
            } else {
                for error in result.errors() {
                    println!("- {error}");
                }
            }
        }
    }
    if !result.is_valid() {
        bail!("Mapping is invalid ({} error(s))", result.errors().len());
    }
    info!("Mapping validated against {} sampled row(s)", sample.len());
    Ok(())
}
