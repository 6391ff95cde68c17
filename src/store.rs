use std::{
    fs::{self, File},
    io::{BufReader, BufWriter},
    path::{Path, PathBuf},
};

use log::{debug, info};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    mapping::{Mapping, SavedMapping},
    schema::PredefinedSchema,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("A mapping with the name '{0}' already exists.")]
    DuplicateName(String),
    #[error("Mapping with id {0} not found")]
    NotFound(String),
    #[error("Accessing mapping store {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Mapping store {path:?} is not valid JSON")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Durable home for named mappings.
pub trait MappingStore {
    /// Stores `mapping` under a fresh id. Names are unique across the store.
    fn save(&mut self, name: &str, mapping: Mapping) -> Result<SavedMapping, StoreError>;
    fn get(&self, id: &str) -> Result<SavedMapping, StoreError>;
    fn list(&self) -> Result<Vec<SavedMapping>, StoreError>;
}

/// Keeps every saved mapping in one JSON array on disk, tagged with the
/// schema it was written against.
#[derive(Debug, Clone)]
pub struct JsonMappingStore {
    path: PathBuf,
    schema_name: String,
    schema_version: String,
}

impl JsonMappingStore {
    pub fn new(path: impl Into<PathBuf>, schema: &PredefinedSchema) -> Self {
        Self {
            path: path.into(),
            schema_name: schema.name.clone(),
            schema_version: schema.version.clone(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn load(&self) -> Result<Vec<SavedMapping>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&self.path).map_err(|err| self.io_error(err))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })
    }

    fn write(&self, entries: &[SavedMapping]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
        }
        let file = File::create(&self.path).map_err(|err| self.io_error(err))?;
        serde_json::to_writer_pretty(BufWriter::new(file), entries).map_err(|source| {
            StoreError::Json {
                path: self.path.clone(),
                source,
            }
        })
    }
}

impl MappingStore for JsonMappingStore {
    fn save(&mut self, name: &str, mapping: Mapping) -> Result<SavedMapping, StoreError> {
        let mut entries = self.load()?;
        if entries.iter().any(|entry| entry.name == name) {
            return Err(StoreError::DuplicateName(name.to_string()));
        }
        let saved = SavedMapping {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            schema_name: self.schema_name.clone(),
            schema_version: self.schema_version.clone(),
            mapping,
        };
        entries.push(saved.clone());
        self.write(&entries)?;
        info!("Saved mapping '{}' as {}", saved.name, saved.id);
        Ok(saved)
    }

    fn get(&self, id: &str) -> Result<SavedMapping, StoreError> {
        self.load()?
            .into_iter()
            .find(|entry| entry.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn list(&self) -> Result<Vec<SavedMapping>, StoreError> {
        let entries = self.load()?;
        debug!("Loaded {} mapping(s) from {:?}", entries.len(), self.path);
        Ok(entries)
    }
}
