use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Map, validate, and ingest CSV files against a fixed schema",
    long_about = None
)]
pub struct Cli {
    /// YAML settings file (upload dir, mapping store, limits)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// YAML schema file to use instead of the built-in CustomerImport schema
    #[arg(long, global = true)]
    pub schema: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the active target schema
    Schema(SchemaArgs),
    /// Store a CSV file under the upload directory and detect its header
    Upload(UploadArgs),
    /// List the columns of a source with sample values
    Columns(ColumnsArgs),
    /// Suggest a column for each schema field
    Suggest(SuggestArgs),
    /// Show the first rows of a source
    Preview(PreviewArgs),
    /// Validate a mapping against the schema and a sample of the source
    Validate(ValidateArgs),
    /// Save, list, or show stored mappings
    Mapping(MappingArgs),
    /// Transform every row through a mapping and write the typed records
    Ingest(IngestArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum SchemaFormat {
    #[default]
    Yaml,
    Json,
}

#[derive(Debug, Args)]
pub struct SchemaArgs {
    #[arg(long, value_enum, default_value_t = SchemaFormat::Yaml)]
    pub format: SchemaFormat,
}

#[derive(Debug, Args)]
pub struct UploadArgs {
    /// CSV file to store
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

/// Where rows come from and how to read them.
#[derive(Debug, Clone, Args)]
#[command(group(ArgGroup::new("input_source").required(true).args(["input", "file_id"])))]
pub struct SourceArgs {
    /// CSV file to read directly
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,
    /// Id returned by `upload`
    #[arg(long = "file-id")]
    pub file_id: Option<String>,
    /// Treat the first row as a header (detected when neither flag is given)
    #[arg(long = "has-header", overrides_with = "no_header")]
    pub has_header: bool,
    /// Treat every row as data and name columns `Column 1`, `Column 2`, ...
    #[arg(long = "no-header", overrides_with = "has_header")]
    pub no_header: bool,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

impl SourceArgs {
    /// The header policy the user asked for, if any.
    pub fn header_override(&self) -> Option<bool> {
        match (self.has_header, self.no_header) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

/// A mapping given inline or by stored id.
#[derive(Debug, Clone, Args)]
#[command(group(ArgGroup::new("mapping_ref").required(true).args(["map", "mapping_id"])))]
pub struct MappingSourceArgs {
    /// Field-to-column pair `field=column` (repeatable)
    #[arg(long = "map", action = clap::ArgAction::Append)]
    pub map: Vec<String>,
    /// Id of a mapping saved with `mapping save`
    #[arg(long = "mapping-id")]
    pub mapping_id: Option<String>,
}

#[derive(Debug, Args)]
pub struct ColumnsArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct SuggestArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Never suggest one column for two fields
    #[arg(long)]
    pub exclusive: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Number of data rows to show
    #[arg(long, default_value_t = 5)]
    pub rows: usize,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub mapping: MappingSourceArgs,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct MappingArgs {
    #[command(subcommand)]
    pub command: MappingCommand,
}

#[derive(Debug, Subcommand)]
pub enum MappingCommand {
    /// Save a mapping under a unique name
    Save(MappingSaveArgs),
    /// List saved mappings
    List,
    /// Show one saved mapping as JSON
    Show(MappingShowArgs),
}

#[derive(Debug, Args)]
pub struct MappingSaveArgs {
    /// Unique mapping name
    #[arg(long)]
    pub name: String,
    /// Field-to-column pair `field=column` (repeatable)
    #[arg(long = "map", action = clap::ArgAction::Append, required = true)]
    pub map: Vec<String>,
}

#[derive(Debug, Args)]
pub struct MappingShowArgs {
    pub id: String,
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub mapping: MappingSourceArgs,
    /// Destination CSV for the transformed records
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
    /// Ingest even when content validation reports errors
    #[arg(long = "allow-invalid")]
    pub allow_invalid: bool,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
