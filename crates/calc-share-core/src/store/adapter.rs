//! Typed adapter over a storage backend.
//!
//! Every operation is best-effort: failures are logged and reported as
//! `false` / `None` so callers fall back to in-memory defaults.

use std::sync::{Arc, OnceLock};

use crate::error::{Result, ShareError};
use crate::store::backend::StorageBackend;
use crate::types::{CURRENT_SCHEMA_VERSION, DEFAULT_STORAGE_KEY, StoredDocument};

/// Throwaway key written and deleted by the availability probe.
pub const PROBE_KEY: &str = "__calc_share_probe__";

/// Reads and writes the single shared-data document.
pub struct SharedDataStore {
    backend: Arc<dyn StorageBackend>,
    key: String,
    available: OnceLock<bool>,
}

impl SharedDataStore {
    /// Adapter over `backend` using the default storage key.
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self::with_key(backend, DEFAULT_STORAGE_KEY)
    }

    pub fn with_key(backend: Arc<dyn StorageBackend>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
            available: OnceLock::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether the backend accepts writes.
    ///
    /// Probed once with a write+delete of [`PROBE_KEY`]; the answer is
    /// cached for the adapter's lifetime.
    pub fn is_available(&self) -> bool {
        *self.available.get_or_init(|| match self.probe() {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(%error, "shared data storage unavailable");
                false
            }
        })
    }

    fn probe(&self) -> Result<()> {
        self.backend.set_item(PROBE_KEY, PROBE_KEY)?;
        self.backend.remove_item(PROBE_KEY)
    }

    /// Load the document. Missing, corrupt and outdated documents all read
    /// as `None`.
    pub fn read(&self) -> Option<StoredDocument> {
        if !self.is_available() {
            return None;
        }
        let raw = match self.backend.get_item(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(error) => {
                tracing::warn!(%error, key = %self.key, "failed to read shared data");
                return None;
            }
        };
        match parse_document(&raw) {
            Ok(doc) => Some(doc),
            Err(error) => {
                tracing::debug!(%error, key = %self.key, "discarding stored shared data");
                None
            }
        }
    }

    /// Persist `doc`. Returns false if serialization or the backend write
    /// fails; the previously stored document is then left as it was.
    pub fn write(&self, doc: &StoredDocument) -> bool {
        if !self.is_available() {
            return false;
        }
        let json = match serde_json::to_string(doc) {
            Ok(json) => json,
            Err(source) => {
                let error = ShareError::Serialization { source };
                tracing::warn!(%error, "failed to encode shared data");
                return false;
            }
        };
        match self.backend.set_item(&self.key, &json) {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(%error, key = %self.key, "failed to write shared data");
                false
            }
        }
    }

    /// Remove the document entirely.
    pub fn clear(&self) -> bool {
        if !self.is_available() {
            return false;
        }
        match self.backend.remove_item(&self.key) {
            Ok(()) => {
                tracing::info!(key = %self.key, "cleared shared data");
                true
            }
            Err(error) => {
                tracing::warn!(%error, key = %self.key, "failed to clear shared data");
                false
            }
        }
    }
}

/// Parse a serialized document and check its schema version.
///
/// The version is checked before the rest of the document is decoded, so an
/// outdated document is rejected as [`ShareError::VersionMismatch`] however
/// well-formed its data is.
pub fn parse_document(raw: &str) -> Result<StoredDocument> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|source| ShareError::CorruptDocument { source })?;

    let found = value
        .get("version")
        .and_then(serde_json::Value::as_u64)
        .and_then(|v| u32::try_from(v).ok());
    match found {
        Some(CURRENT_SCHEMA_VERSION) => {}
        Some(found) => {
            return Err(ShareError::VersionMismatch {
                found,
                expected: CURRENT_SCHEMA_VERSION,
            });
        }
        None => {
            return Err(ShareError::VersionMismatch {
                found: 0,
                expected: CURRENT_SCHEMA_VERSION,
            });
        }
    }

    serde_json::from_value(value).map_err(|source| ShareError::CorruptDocument { source })
}
