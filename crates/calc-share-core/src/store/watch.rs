//! External change detection.
//!
//! A host tells the broker that the persisted document was changed by
//! someone else (another tab, another process) through
//! [`ExternalChangeSource`]. How the change is detected is up to the host:
//! native storage events, polling, or nothing at all for single-tab hosts.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::store::file::{FileBackend, compute_content_hash};

/// Callback invoked when a watched key changes.
pub type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

/// Capability to observe out-of-process mutation of a storage key.
pub trait ExternalChangeSource: Send + Sync {
    /// Register `callback` for changes to `key` made elsewhere.
    ///
    /// The registration lasts until the returned subscription is dropped.
    fn on_external_change(&self, key: &str, callback: ChangeCallback) -> ChangeSubscription;
}

/// Guard for a change registration; dropping it unsubscribes.
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct ChangeSubscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl ChangeSubscription {
    pub(crate) fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription with nothing to cancel.
    pub fn detached() -> Self {
        Self { cancel: None }
    }
}

impl Drop for ChangeSubscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for ChangeSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeSubscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Source for hosts where nothing else can touch the document.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExternalChanges;

impl ExternalChangeSource for NoExternalChanges {
    fn on_external_change(&self, _key: &str, _callback: ChangeCallback) -> ChangeSubscription {
        ChangeSubscription::detached()
    }
}

/// Listener table keyed by caller-defined metadata.
///
/// Callbacks are collected under the lock and invoked after it is released,
/// so a callback may subscribe, unsubscribe or trigger another notification.
pub(crate) struct Listeners<M> {
    inner: Arc<Mutex<ListenerTable<M>>>,
}

struct ListenerTable<M> {
    next_id: u64,
    entries: Vec<(u64, M, ChangeCallback)>,
}

impl<M> Default for Listeners<M> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ListenerTable {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }
}

impl<M: Send + 'static> Listeners<M> {
    pub(crate) fn subscribe(&self, meta: M, callback: ChangeCallback) -> ChangeSubscription {
        let id = {
            let mut table = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            let id = table.next_id;
            table.next_id += 1;
            table.entries.push((id, meta, callback));
            id
        };
        let table = Arc::downgrade(&self.inner);
        ChangeSubscription::new(move || {
            if let Some(table) = table.upgrade() {
                table
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .entries
                    .retain(|(entry_id, _, _)| *entry_id != id);
            }
        })
    }

    /// Invoke every callback whose metadata passes `filter`. Returns how many
    /// ran.
    pub(crate) fn notify(&self, filter: impl Fn(&M) -> bool) -> usize {
        let callbacks: Vec<ChangeCallback> = {
            let table = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            table
                .entries
                .iter()
                .filter(|(_, meta, _)| filter(meta))
                .map(|(_, _, callback)| Arc::clone(callback))
                .collect()
        };
        for callback in &callbacks {
            callback();
        }
        callbacks.len()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }
}

/// Polls a file-backed document for changes made by other processes.
///
/// Each [`poll`](FilePoller::poll) hashes the file contents and notifies
/// subscribers when the hash differs from the previous poll. Writes made by
/// this process are reported too; the broker ignores notifications that do
/// not change what it already holds.
pub struct FilePoller {
    key: String,
    path: PathBuf,
    last_hash: Mutex<Option<String>>,
    listeners: Listeners<String>,
}

impl FilePoller {
    /// Watch the file that `backend` uses for `key`.
    pub fn new(backend: &FileBackend, key: &str) -> Self {
        let path = backend.path_for(key);
        let last_hash = current_hash(&path);
        Self {
            key: key.to_string(),
            path,
            last_hash: Mutex::new(last_hash),
            listeners: Listeners::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check the file once. Returns true if a change was detected.
    pub fn poll(&self) -> bool {
        let hash = current_hash(&self.path);
        {
            let mut last = self.last_hash.lock().unwrap_or_else(PoisonError::into_inner);
            if *last == hash {
                return false;
            }
            *last = hash;
        }
        tracing::debug!(path = %self.path.display(), "shared data file changed");
        let key = self.key.as_str();
        self.listeners.notify(|watched| watched == key);
        true
    }
}

impl ExternalChangeSource for FilePoller {
    fn on_external_change(&self, key: &str, callback: ChangeCallback) -> ChangeSubscription {
        self.listeners.subscribe(key.to_string(), callback)
    }
}

fn current_hash(path: &Path) -> Option<String> {
    match compute_content_hash(path) {
        Ok(hash) => hash,
        Err(error) => {
            tracing::warn!(%error, "could not hash shared data file");
            None
        }
    }
}
