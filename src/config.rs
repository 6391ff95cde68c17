use std::{
    env,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

pub const ENV_UPLOAD_DIR: &str = "CSV_MAPPER_UPLOAD_DIR";
pub const ENV_STORE_PATH: &str = "CSV_MAPPER_STORE_PATH";
pub const ENV_MAX_UPLOAD_SIZE_MB: &str = "CSV_MAPPER_MAX_UPLOAD_SIZE_MB";
pub const ENV_VALIDATION_SAMPLE_ROWS: &str = "CSV_MAPPER_VALIDATION_SAMPLE_ROWS";

/// Runtime settings. Every key is optional in the YAML file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub max_upload_size_mb: u64,
    pub upload_dir: PathBuf,
    pub store_path: PathBuf,
    pub validation_sample_rows: usize,
    pub header_sample_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_upload_size_mb: 100,
            upload_dir: PathBuf::from("uploads"),
            store_path: PathBuf::from("data/mappings.json"),
            validation_sample_rows: 1000,
            header_sample_bytes: 2048,
        }
    }
}

impl Settings {
    /// Defaults, overlaid by `path` when given, overlaid by the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => {
                let file =
                    File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
                serde_yaml::from_reader(BufReader::new(file))
                    .with_context(|| format!("Parsing config file {path:?}"))?
            }
            None => Settings::default(),
        };
        settings.apply_overrides(|key| env::var(key).ok())?;
        debug!("Effective settings: {settings:?}");
        Ok(settings)
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_UPLOAD_DIR) {
            self.upload_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup(ENV_STORE_PATH) {
            self.store_path = PathBuf::from(path);
        }
        if let Some(raw) = lookup(ENV_MAX_UPLOAD_SIZE_MB) {
            self.max_upload_size_mb = raw.trim().parse().with_context(|| {
                format!("{ENV_MAX_UPLOAD_SIZE_MB} must be a whole number, got '{raw}'")
            })?;
        }
        if let Some(raw) = lookup(ENV_VALIDATION_SAMPLE_ROWS) {
            self.validation_sample_rows = raw.trim().parse().with_context(|| {
                format!("{ENV_VALIDATION_SAMPLE_ROWS} must be a whole number, got '{raw}'")
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, fs};

    use super::*;
    use tempfile::tempdir;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.yml");
        fs::write(&path, "max_upload_size_mb: 5\nupload_dir: /tmp/up\n").unwrap();
        let file = File::open(&path).unwrap();
        let settings: Settings = serde_yaml::from_reader(file).unwrap();
        assert_eq!(settings.max_upload_size_mb, 5);
        assert_eq!(settings.upload_dir, PathBuf::from("/tmp/up"));
        assert_eq!(settings.validation_sample_rows, 1000);
    }

    #[test]
    fn unrecognised_keys_are_ignored() {
        let settings: Settings =
            serde_yaml::from_str("app_name: Legacy Mapper\nheader_sample_bytes: 512\n").unwrap();
        assert_eq!(settings.header_sample_bytes, 512);
        assert_eq!(settings.upload_dir, PathBuf::from("uploads"));
    }

    #[test]
    fn environment_overrides_win() {
        let vars: HashMap<&str, &str> = [
            (ENV_STORE_PATH, "elsewhere.json"),
            (ENV_VALIDATION_SAMPLE_ROWS, " 25 "),
        ]
        .into_iter()
        .collect();
        let mut settings = Settings::default();
        settings
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(settings.store_path, PathBuf::from("elsewhere.json"));
        assert_eq!(settings.validation_sample_rows, 25);
        assert_eq!(settings.upload_dir, PathBuf::from("uploads"));
    }

    #[test]
    fn malformed_numeric_override_is_an_error() {
        let mut settings = Settings::default();
        let err = settings
            .apply_overrides(|key| (key == ENV_MAX_UPLOAD_SIZE_MB).then(|| "lots".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_MAX_UPLOAD_SIZE_MB));
    }
}
