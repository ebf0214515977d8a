//! File-backed key/value storage for native hosts.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{Result, ShareError};
use crate::store::backend::StorageBackend;

/// Stores each key as `<dir>/<key>.json`.
///
/// Writes go to a temp file that is synced and renamed over the target, so
/// readers in other processes see either the old or the new document, never
/// a partial one.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `key`.
    ///
    /// Characters outside `[A-Za-z0-9_-]` are replaced so a key can never
    /// escape the storage directory.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

impl StorageBackend for FileBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ShareError::Io {
                operation: "read",
                path,
                source: e,
            }),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let temp_path = path.with_extension("json.tmp");

        fs::create_dir_all(&self.dir).map_err(|e| ShareError::Io {
            operation: "create directory",
            path: self.dir.clone(),
            source: e,
        })?;

        if let Err(error) = write_synced(&temp_path, value) {
            let _ = fs::remove_file(&temp_path);
            return Err(error);
        }

        fs::rename(&temp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            ShareError::Io {
                operation: "replace",
                path: path.clone(),
                source: e,
            }
        })?;

        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ShareError::Io {
                operation: "remove",
                path,
                source: e,
            }),
        }
    }
}

fn write_synced(path: &Path, value: &str) -> Result<()> {
    let mut file = File::create(path).map_err(|e| ShareError::Io {
        operation: "create",
        path: path.to_path_buf(),
        source: e,
    })?;
    file.write_all(value.as_bytes())
        .map_err(|e| ShareError::Io {
            operation: "write",
            path: path.to_path_buf(),
            source: e,
        })?;
    file.sync_all().map_err(|e| ShareError::Io {
        operation: "sync",
        path: path.to_path_buf(),
        source: e,
    })
}

/// SHA-256 of a file's contents, hex encoded. `None` if the file is missing.
pub fn compute_content_hash(path: &Path) -> Result<Option<String>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(ShareError::Io {
                operation: "read",
                path: path.to_path_buf(),
                source: e,
            });
        }
    };
    let hash = Sha256::digest(&bytes);
    Ok(Some(hex::encode(hash)))
}
