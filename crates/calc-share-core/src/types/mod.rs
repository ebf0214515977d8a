//! Persisted shared-data types.
//!
//! These mirror the JSON document kept under the shared-data storage key.

mod document;
mod entry;

pub use document::StoredDocument;
pub use entry::{SharedDataEntry, StoredEntry};

/// Current schema version.
///
/// Documents carrying any other version are discarded on read; there is no
/// migration path between versions.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Storage key the document lives under unless settings override it.
pub const DEFAULT_STORAGE_KEY: &str = "calculator-shared-data";
