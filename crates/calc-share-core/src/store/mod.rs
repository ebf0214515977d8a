//! Persistent store adapter.
//!
//! This module handles:
//! - Key/value storage backends (in-memory and file-backed)
//! - The typed shared-data document adapter with version gating
//! - External change detection (other tabs or processes)

mod adapter;
mod backend;
mod file;
mod watch;

pub use adapter::{PROBE_KEY, SharedDataStore, parse_document};
pub use backend::{MemoryBackend, StorageBackend};
pub use file::{FileBackend, compute_content_hash};
pub use watch::{
    ChangeCallback, ChangeSubscription, ExternalChangeSource, FilePoller, NoExternalChanges,
};
pub(crate) use watch::Listeners;
