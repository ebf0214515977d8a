//! Key/value storage backends.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Result, ShareError};
use crate::store::watch::{ChangeCallback, ChangeSubscription, ExternalChangeSource, Listeners};

/// A string key/value persistent store.
///
/// Implementations must not panic; every failure is reported as an error.
pub trait StorageBackend: Send + Sync {
    /// Read the value stored under `key`, `None` if missing.
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<()>;
}

/// In-memory storage shared between cloned handles.
///
/// Each handle created with [`MemoryBackend::handle`] behaves like a separate
/// browser tab over the same origin storage: a write through one handle
/// notifies change listeners registered through the *other* handles, never
/// the writer's own.
#[derive(Clone)]
pub struct MemoryBackend {
    shared: Arc<MemoryShared>,
    handle_id: u64,
}

struct MemoryShared {
    state: Mutex<MemoryState>,
    listeners: Listeners<(u64, String)>,
    next_handle: AtomicU64,
}

#[derive(Default)]
struct MemoryState {
    items: BTreeMap<String, String>,
    quota: Option<usize>,
    disabled: bool,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Create an empty, enabled store without a quota.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(MemoryShared {
                state: Mutex::new(MemoryState::default()),
                listeners: Listeners::default(),
                next_handle: AtomicU64::new(1),
            }),
            handle_id: 0,
        }
    }

    /// Create a store whose total size (keys plus values) may not exceed
    /// `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        let backend = Self::new();
        backend.set_quota(Some(bytes));
        backend
    }

    /// Create a store that rejects every operation, like storage in a
    /// locked-down private window.
    pub fn disabled() -> Self {
        let backend = Self::new();
        backend.set_disabled(true);
        backend
    }

    /// Open another handle onto the same storage.
    pub fn handle(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            handle_id: self.shared.next_handle.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn set_quota(&self, quota: Option<usize>) {
        self.lock().quota = quota;
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.lock().disabled = disabled;
    }

    /// Raw stored value, bypassing the disabled flag.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.lock().items.get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().items.keys().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn check_enabled(state: &MemoryState) -> Result<()> {
        if state.disabled {
            return Err(ShareError::StoreUnavailable {
                reason: "storage is disabled".to_string(),
            });
        }
        Ok(())
    }

    fn notify_others(&self, key: &str) {
        let writer = self.handle_id;
        self.shared
            .listeners
            .notify(|(handle_id, watched)| *handle_id != writer && watched == key);
    }
}

impl StorageBackend for MemoryBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let state = self.lock();
        Self::check_enabled(&state)?;
        Ok(state.items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        {
            let mut state = self.lock();
            Self::check_enabled(&state)?;
            if let Some(quota) = state.quota {
                let others: usize = state
                    .items
                    .iter()
                    .filter(|(k, _)| k.as_str() != key)
                    .map(|(k, v)| k.len() + v.len())
                    .sum();
                let needed = others + key.len() + value.len();
                if needed > quota {
                    return Err(ShareError::QuotaExceeded { needed, quota });
                }
            }
            state.items.insert(key.to_string(), value.to_string());
        }
        self.notify_others(key);
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let removed = {
            let mut state = self.lock();
            Self::check_enabled(&state)?;
            state.items.remove(key).is_some()
        };
        if removed {
            self.notify_others(key);
        }
        Ok(())
    }
}

impl ExternalChangeSource for MemoryBackend {
    fn on_external_change(&self, key: &str, callback: ChangeCallback) -> ChangeSubscription {
        self.shared
            .listeners
            .subscribe((self.handle_id, key.to_string()), callback)
    }
}
