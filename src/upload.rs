use std::{
    fs::{self, File},
    io::{self, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

const CHUNK_SIZE: usize = 1024 * 1024;
const BYTES_PER_MB: u64 = 1024 * 1024;
const UPLOAD_EXTENSION: &str = "csv";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("File too large. Max size is {limit_mb} MB.")]
    TooLarge { limit_mb: u64 },
    #[error("No file found for id {file_id}")]
    NotFound { file_id: String },
    #[error("Storing upload in {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadMetadata {
    pub file_id: String,
    pub original_filename: Option<String>,
    pub has_header: bool,
    pub delimiter: String,
    pub encoding: String,
}

/// Streams `reader` into `{upload_dir}/{uuid}.csv` and returns the new id.
///
/// Once more than `max_mb` megabytes have been read the partial file is
/// removed and [`UploadError::TooLarge`] is returned. Read and write failures
/// remove it as well.
pub fn store_upload<R: Read>(
    reader: R,
    upload_dir: &Path,
    max_mb: u64,
) -> Result<String, UploadError> {
    fs::create_dir_all(upload_dir).map_err(|source| UploadError::Io {
        path: upload_dir.to_path_buf(),
        source,
    })?;

    let file_id = Uuid::new_v4().to_string();
    let dest = file_path(upload_dir, &file_id);
    let file = File::create(&dest).map_err(|source| UploadError::Io {
        path: dest.clone(),
        source,
    })?;

    let limit = max_mb.saturating_mul(BYTES_PER_MB);
    match copy_limited(reader, BufWriter::new(file), limit) {
        Ok(written) => {
            info!("Stored upload {file_id} ({written} byte(s)) in {upload_dir:?}");
            Ok(file_id)
        }
        Err(failure) => {
            if let Err(err) = fs::remove_file(&dest) {
                debug!("Could not remove partial upload {dest:?}: {err}");
            }
            Err(match failure {
                CopyFailure::TooLarge => UploadError::TooLarge { limit_mb: max_mb },
                CopyFailure::Io(source) => UploadError::Io { path: dest, source },
            })
        }
    }
}

#[derive(Debug)]
enum CopyFailure {
    TooLarge,
    Io(io::Error),
}

// The writer is dropped before returning, so the file is closed on every path.
fn copy_limited<R: Read, W: Write>(
    mut reader: R,
    mut writer: W,
    limit: u64,
) -> Result<u64, CopyFailure> {
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut written: u64 = 0;
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(CopyFailure::Io(err)),
        };
        written += read as u64;
        if written > limit {
            return Err(CopyFailure::TooLarge);
        }
        writer
            .write_all(&buffer[..read])
            .map_err(CopyFailure::Io)?;
    }
    writer.flush().map_err(CopyFailure::Io)?;
    Ok(written)
}

fn file_path(upload_dir: &Path, file_id: &str) -> PathBuf {
    upload_dir.join(format!("{file_id}.{UPLOAD_EXTENSION}"))
}

/// Location of a stored upload. Ids that are not UUIDs never resolve.
pub fn upload_path(upload_dir: &Path, file_id: &str) -> Result<PathBuf, UploadError> {
    let not_found = || UploadError::NotFound {
        file_id: file_id.to_string(),
    };
    let id = Uuid::parse_str(file_id.trim()).map_err(|_| not_found())?;
    let path = file_path(upload_dir, &id.to_string());
    if path.is_file() { Ok(path) } else { Err(not_found()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::tempdir;

    #[test]
    fn stored_upload_resolves_by_id() {
        let dir = tempdir().unwrap();
        let uploads = dir.path().join("uploads");
        let id = store_upload(Cursor::new(b"a,b\n1,2\n".to_vec()), &uploads, 1).unwrap();
        let path = upload_path(&uploads, &id).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "a,b\n1,2\n");
    }

    #[test]
    fn oversized_upload_is_rejected_and_removed() {
        let dir = tempdir().unwrap();
        let data = vec![b'x'; (BYTES_PER_MB + 1) as usize];
        let err = store_upload(Cursor::new(data), dir.path(), 1).unwrap_err();
        assert!(matches!(err, UploadError::TooLarge { limit_mb: 1 }));
        assert_eq!(err.to_string(), "File too large. Max size is 1 MB.");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn upload_exactly_at_limit_is_accepted() {
        let dir = tempdir().unwrap();
        let data = vec![b'x'; BYTES_PER_MB as usize];
        assert!(store_upload(Cursor::new(data), dir.path(), 1).is_ok());
    }

    struct FailingReader {
        served: bool,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.served {
                return Err(io::Error::other("connection reset"));
            }
            self.served = true;
            buf[..4].copy_from_slice(b"a,b\n");
            Ok(4)
        }
    }

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("no space left"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn interrupted_upload_leaves_no_partial_file() {
        let dir = tempdir().unwrap();
        let err = store_upload(FailingReader { served: false }, dir.path(), 1).unwrap_err();
        assert!(matches!(err, UploadError::Io { .. }));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn write_failures_are_reported() {
        let failure = copy_limited(Cursor::new(b"a,b\n".to_vec()), FullDisk, BYTES_PER_MB)
            .unwrap_err();
        assert!(matches!(failure, CopyFailure::Io(ref err) if err.to_string() == "no space left"));
    }

    #[test]
    fn unknown_or_malformed_ids_are_not_found() {
        let dir = tempdir().unwrap();
        let missing = Uuid::new_v4().to_string();
        assert!(matches!(
            upload_path(dir.path(), &missing),
            Err(UploadError::NotFound { .. })
        ));
        assert!(matches!(
            upload_path(dir.path(), "../secrets"),
            Err(UploadError::NotFound { .. })
        ));
    }
}
