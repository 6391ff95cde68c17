#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::{TempDir, tempdir};

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Scratch directory that also hosts the upload directory and mapping store
/// of every command it launches.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.path().join("uploads")
    }

    pub fn store_path(&self) -> PathBuf {
        self.path().join("data").join("mappings.json")
    }

    /// The binary, isolated from the user's environment and pointed at this workspace.
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("csv-mapper").expect("binary exists");
        cmd.env_remove("RUST_LOG")
            .env_remove("CSV_MAPPER_MAX_UPLOAD_SIZE_MB")
            .env_remove("CSV_MAPPER_VALIDATION_SAMPLE_ROWS")
            .env("CSV_MAPPER_UPLOAD_DIR", self.upload_dir())
            .env("CSV_MAPPER_STORE_PATH", self.store_path())
            .current_dir(self.path());
        cmd
    }
}

/// A complete mapping for `tests/data/customers.csv` as `--map` arguments.
pub fn customer_map_args() -> Vec<String> {
    [
        ("customer_id", "Customer ID"),
        ("first_name", "First Name"),
        ("last_name", "Last Name"),
        ("email", "E-mail"),
        ("date_of_birth", "DOB"),
        ("website", "Website"),
        ("is_active", "Active"),
        ("status", "Status"),
        ("cancel_reason", "Cancel Reason"),
        ("signup_date", "Signup Date"),
        ("last_activity_date", "Last Activity"),
    ]
    .iter()
    .flat_map(|(field, column)| ["--map".to_string(), format!("{field}={column}")])
    .collect()
}
