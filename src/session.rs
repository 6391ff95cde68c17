use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use encoding_rs::Encoding;
use log::{debug, info};

use crate::{
    cli::{MappingSourceArgs, SourceArgs},
    config::Settings,
    io_utils,
    mapping::Mapping,
    schema::PredefinedSchema,
    source,
    store::{JsonMappingStore, MappingStore},
    upload,
};

pub struct Session {
    pub settings: Settings,
    pub schema: PredefinedSchema,
}

/// A source ready to be read: path, header policy, and decoding parameters.
#[derive(Debug, Clone)]
pub struct ResolvedSource {
    pub path: PathBuf,
    pub has_header: bool,
    pub delimiter: u8,
    pub encoding: &'static Encoding,
}

impl Session {
    pub fn load(config: Option<&Path>, schema: Option<&Path>) -> Result<Self> {
        let settings = Settings::load(config)?;
        let schema = match schema {
            Some(path) => PredefinedSchema::load(path)
                .with_context(|| format!("Loading schema from {path:?}"))?,
            None => {
                let schema = PredefinedSchema::customer_import();
                schema.check().context("Checking built-in schema")?;
                schema
            }
        };
        debug!(
            "Active schema {} v{} with {} field(s)",
            schema.name,
            schema.version,
            schema.fields.len()
        );
        Ok(Self { settings, schema })
    }

    pub fn mapping_store(&self) -> JsonMappingStore {
        JsonMappingStore::new(&self.settings.store_path, &self.schema)
    }

    pub fn resolve_source(&self, args: &SourceArgs) -> Result<ResolvedSource> {
        let path = match (&args.input, &args.file_id) {
            (Some(path), _) => path.clone(),
            (None, Some(id)) => upload::upload_path(&self.settings.upload_dir, id)?,
            (None, None) => bail!("Either --input or --file-id is required"),
        };
        let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
        let delimiter = io_utils::resolve_input_delimiter(&path, args.delimiter);
        let has_header = match args.header_override() {
            Some(flag) => flag,
            None => {
                let detected = source::detect_header(
                    &path,
                    delimiter,
                    encoding,
                    self.settings.header_sample_bytes,
                );
                info!(
                    "Detected {} in {:?}",
                    if detected { "a header row" } else { "no header row" },
                    path
                );
                detected
            }
        };
        Ok(ResolvedSource {
            path,
            has_header,
            delimiter,
            encoding,
        })
    }

    pub fn resolve_mapping(&self, args: &MappingSourceArgs) -> Result<Mapping> {
        if let Some(id) = &args.mapping_id {
            let saved = self.mapping_store().get(id)?;
            if saved.schema_name != self.schema.name
                || saved.schema_version != self.schema.version
            {
                log::warn!(
                    "Mapping '{}' was saved for {} v{}; active schema is {} v{}",
                    saved.name,
                    saved.schema_name,
                    saved.schema_version,
                    self.schema.name,
                    self.schema.version
                );
            }
            return Ok(saved.mapping);
        }
        let mapping = Mapping::from_pairs(&args.map)?;
        self.warn_unknown_fields(&mapping);
        Ok(mapping)
    }

    /// Logs mapping keys the active schema does not declare.
    pub fn warn_unknown_fields(&self, mapping: &Mapping) {
        for (field, _) in mapping.iter() {
            if self.schema.field_by_name(field).is_none() {
                log::warn!(
                    "Field '{field}' is not part of schema {}; it will be ignored",
                    self.schema.name
                );
            }
        }
    }
}

impl ResolvedSource {
    /// Column names as the profiler sees them.
    pub fn column_names(&self) -> Result<Vec<String>> {
        let profiles = crate::profile::inspect_columns(
            &self.path,
            self.has_header,
            self.delimiter,
            self.encoding,
        )?;
        Ok(profiles.into_iter().map(|profile| profile.name).collect())
    }
}
