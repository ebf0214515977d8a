//! Shared-data error types.
//!
//! Storage-facing operations never surface these to calculators; they are
//! logged and collapsed into `false` / `None`. Construction-time APIs
//! (registry building, settings files) return them directly.

use std::path::PathBuf;
use thiserror::Error;

/// Shared-data operation error.
#[derive(Debug, Error)]
pub enum ShareError {
    /// Persistent storage cannot be used at all.
    #[error("Persistent storage is unavailable: {reason}")]
    StoreUnavailable { reason: String },

    /// A write would exceed the storage quota.
    #[error("Storage quota exceeded ({needed} bytes needed, {quota} allowed)")]
    QuotaExceeded { needed: usize, quota: usize },

    /// File I/O error.
    #[error("Failed to {operation} file: {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document could not be serialized.
    #[error("Failed to serialize shared data")]
    Serialization {
        #[source]
        source: serde_json::Error,
    },

    /// The stored document is not valid JSON for the current layout.
    #[error("Stored shared data is corrupt")]
    CorruptDocument {
        #[source]
        source: serde_json::Error,
    },

    /// The stored document was written with a different schema version.
    #[error("Shared data version {found} does not match current version {expected}")]
    VersionMismatch { found: u32, expected: u32 },

    /// Two calculators registered with the same id.
    #[error("Calculator id '{0}' is registered more than once")]
    DuplicateCalculatorId(String),

    /// No calculator is registered under this id.
    #[error("Unknown calculator '{0}'")]
    UnknownCalculator(String),

    /// Settings file could not be read or written.
    #[error("Settings error at {path}: {reason}")]
    Settings { path: PathBuf, reason: String },
}

impl ShareError {
    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::StoreUnavailable { .. } => {
                "Sharing between calculators is turned off because storage is unavailable."
                    .to_string()
            }
            Self::QuotaExceeded { .. } => {
                "There is not enough storage space left to share these values.".to_string()
            }
            Self::Io {
                operation, path, ..
            } => {
                format!("Could not {} the file at {}", operation, path.display())
            }
            Self::Serialization { .. } => {
                "An error occurred while saving the shared values.".to_string()
            }
            Self::CorruptDocument { .. } | Self::VersionMismatch { .. } => {
                "Previously shared values could not be read and were ignored.".to_string()
            }
            Self::DuplicateCalculatorId(id) => {
                format!("The calculator '{id}' is registered twice.")
            }
            Self::UnknownCalculator(id) => format!("There is no calculator named '{id}'."),
            Self::Settings { path, .. } => {
                format!("The settings file at {} could not be used.", path.display())
            }
        }
    }

    /// Get a suggestion for how to resolve this error.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::StoreUnavailable { .. } => {
                Some("Leave private browsing mode or enable site storage.".into())
            }
            Self::QuotaExceeded { .. } => Some("Clear the shared values and try again.".into()),
            Self::Io { operation, .. } => {
                if *operation == "read" {
                    Some("Check that you have permission to read the data directory.".into())
                } else {
                    Some("Check that you have permission to write to the data directory.".into())
                }
            }
            Self::CorruptDocument { .. } | Self::VersionMismatch { .. } => {
                Some("Export from a calculator again to replace the stored values.".into())
            }
            Self::UnknownCalculator(_) => {
                Some("Run `calc-share calculators` to list registered ids.".into())
            }
            Self::Settings { .. } => {
                Some("Fix the file or run `calc-share config --write` to replace it.".into())
            }
            Self::Serialization { .. } | Self::DuplicateCalculatorId(_) => None,
        }
    }
}

/// Result type alias for shared-data operations.
pub type Result<T> = std::result::Result<T, ShareError>;
