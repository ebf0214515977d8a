//! Shared-state broker.
//!
//! The broker owns the in-memory view of the persisted document and is the
//! only write path calculators use. Cloning a broker yields another handle
//! onto the same state, so every mounted calculator sees the same view.
//!
//! # Consistency
//!
//! Writes are last-write-wins per field. Each save re-reads the persisted
//! document before merging, so writers touching disjoint fields never lose
//! each other's data; two writers racing on the same field end with whichever
//! write reached storage last. No conflict is reported beyond the winner's
//! `savedAt`.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::clock::{Clock, SystemClock};
use crate::fields::{FieldValue, SharedField};
use crate::store::{
    ChangeCallback, ChangeSubscription, ExternalChangeSource, Listeners, SharedDataStore,
};
use crate::types::{SharedDataEntry, StoredDocument};

/// Handle onto the shared document.
#[derive(Clone)]
pub struct SharedStateBroker {
    inner: Arc<BrokerInner>,
}

struct BrokerInner {
    store: SharedDataStore,
    clock: Arc<dyn Clock>,
    state: Mutex<BrokerState>,
    listeners: Listeners<()>,
    external: Mutex<Option<ChangeSubscription>>,
}

struct BrokerState {
    document: StoredDocument,
    last_updated: i64,
    revision: u64,
}

impl SharedStateBroker {
    /// Broker over `store` using the system clock.
    pub fn new(store: SharedDataStore) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: SharedDataStore, clock: Arc<dyn Clock>) -> Self {
        let document = store.read().unwrap_or_default();
        let last_updated = document.last_updated;
        Self {
            inner: Arc::new(BrokerInner {
                store,
                clock,
                state: Mutex::new(BrokerState {
                    document,
                    last_updated,
                    revision: 0,
                }),
                listeners: Listeners::default(),
                external: Mutex::new(None),
            }),
        }
    }

    /// React to changes made outside this broker.
    ///
    /// Replaces any previous watch. The registration holds only a weak
    /// reference, so it never keeps the broker alive.
    pub fn watch(&self, source: &dyn ExternalChangeSource) {
        let weak: Weak<BrokerInner> = Arc::downgrade(&self.inner);
        let callback: ChangeCallback = Arc::new(move || {
            if let Some(inner) = weak.upgrade() {
                tracing::debug!("external shared data change");
                SharedStateBroker { inner }.refresh();
            }
        });
        let subscription = source.on_external_change(self.inner.store.key(), callback);
        *self
            .inner
            .external
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(subscription);
    }

    pub fn is_available(&self) -> bool {
        self.inner.store.is_available()
    }

    /// Current time according to the broker's clock.
    pub fn now_millis(&self) -> i64 {
        self.inner.clock.now_millis()
    }

    /// Entries for the requested fields. Absent fields are omitted.
    pub fn get_fields(&self, keys: &[SharedField]) -> BTreeMap<SharedField, SharedDataEntry> {
        let state = self.lock();
        keys.iter()
            .filter_map(|&field| state.document.entry(field).map(|entry| (field, entry)))
            .collect()
    }

    /// Snapshot of the cached document.
    pub fn document(&self) -> StoredDocument {
        self.lock().document.clone()
    }

    /// Merge `fields` into the persisted document with provenance.
    ///
    /// Each provided field's entry is replaced wholesale; all other fields
    /// are left as stored. Values that do not fit their field are skipped.
    /// Returns the adapter's write result, or false if nothing qualified.
    pub fn save_fields(
        &self,
        fields: impl IntoIterator<Item = (SharedField, FieldValue)>,
        source: &str,
        source_name: &str,
    ) -> bool {
        if !self.is_available() {
            return false;
        }

        let fields: Vec<(SharedField, FieldValue)> = fields
            .into_iter()
            .filter(|(field, value)| {
                let fits = value.fits(*field);
                if !fits {
                    tracing::debug!(%field, %value, "skipping ill-typed shared value");
                }
                fits
            })
            .collect();
        if fields.is_empty() {
            return false;
        }

        let now = self.now_millis();
        let mut document = self.inner.store.read().unwrap_or_default();
        for (field, value) in &fields {
            document.insert(
                *field,
                &SharedDataEntry::new(*value, source, source_name, now),
            );
        }
        let floor = self.last_updated();
        document.touch(now.max(floor));

        if !self.inner.store.write(&document) {
            return false;
        }

        tracing::debug!(source, count = fields.len(), "saved shared fields");
        self.replace_document(document);
        true
    }

    /// Re-read the persisted document. Returns true if it differed from the
    /// cached view; listeners are notified only in that case.
    pub fn refresh(&self) -> bool {
        let document = self.inner.store.read().unwrap_or_default();
        if self.lock().document == document {
            return false;
        }
        self.replace_document(document);
        true
    }

    /// Delete the persisted document and reset the cached view.
    pub fn clear(&self) -> bool {
        if !self.inner.store.clear() {
            return false;
        }
        let now = self.now_millis();
        {
            let mut state = self.lock();
            state.document = StoredDocument::new();
            state.last_updated = state.last_updated.max(now);
            state.revision += 1;
        }
        self.inner.listeners.notify(|_| true);
        true
    }

    /// Timestamp of the latest observed change, in epoch milliseconds.
    pub fn last_updated(&self) -> i64 {
        self.lock().last_updated
    }

    /// Counter bumped on every observed change, including several changes
    /// within the same millisecond.
    pub fn revision(&self) -> u64 {
        self.lock().revision
    }

    /// Run `callback` after every observed change.
    pub fn subscribe(&self, callback: ChangeCallback) -> ChangeSubscription {
        self.inner.listeners.subscribe((), callback)
    }

    fn replace_document(&self, document: StoredDocument) {
        let now = self.now_millis();
        {
            let mut state = self.lock();
            state.last_updated = state.last_updated.max(document.last_updated).max(now);
            state.document = document;
            state.revision += 1;
        }
        self.inner.listeners.notify(|_| true);
    }

    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SharedStateBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("SharedStateBroker")
            .field("key", &self.inner.store.key())
            .field("fields", &state.document.data.len())
            .field("last_updated", &state.last_updated)
            .field("revision", &state.revision)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::fields::Currency;
    use crate::store::MemoryBackend;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn broker_over(backend: &MemoryBackend, clock: &ManualClock) -> SharedStateBroker {
        let store = SharedDataStore::new(Arc::new(backend.clone()));
        SharedStateBroker::with_clock(store, Arc::new(clock.clone()))
    }

    #[test]
    fn test_save_then_get() {
        let backend = MemoryBackend::new();
        let clock = ManualClock::new(1_000);
        let broker = broker_over(&backend, &clock);

        assert!(broker.save_fields(
            [(SharedField::GuestCount, FieldValue::Number(50.0))],
            "bbq-planner",
            "BBQ Planner",
        ));

        let fields = broker.get_fields(&[SharedField::GuestCount, SharedField::Currency]);
        assert_eq!(fields.len(), 1);
        let entry = &fields[&SharedField::GuestCount];
        assert_eq!(entry.value, FieldValue::Number(50.0));
        assert_eq!(entry.source, "bbq-planner");
        assert_eq!(entry.source_name, "BBQ Planner");
        assert_eq!(entry.saved_at, 1_000);
        assert_eq!(broker.last_updated(), 1_000);
    }

    #[test]
    fn test_last_updated_never_decreases() {
        let backend = MemoryBackend::new();
        let clock = ManualClock::new(5_000);
        let broker = broker_over(&backend, &clock);
        assert!(broker.save_fields([(SharedField::Age, FieldValue::Number(30.0))], "bmi", "BMI"));

        clock.set(1_000);
        assert!(broker.save_fields([(SharedField::Age, FieldValue::Number(31.0))], "bmi", "BMI"));
        assert_eq!(broker.last_updated(), 5_000);
        assert_eq!(broker.document().last_updated, 5_000);
    }

    #[test]
    fn test_ill_typed_and_empty_saves_are_noops() {
        let backend = MemoryBackend::new();
        let broker = broker_over(&backend, &ManualClock::new(1));
        assert!(!broker.save_fields([], "a", "A"));
        assert!(!broker.save_fields(
            [(SharedField::GuestCount, FieldValue::Currency(Currency::Gbp))],
            "a",
            "A",
        ));
        assert_eq!(broker.revision(), 0);
        assert!(backend.keys().is_empty());
    }

    #[test]
    fn test_failed_write_leaves_cache_untouched() {
        let backend = MemoryBackend::new();
        let broker = broker_over(&backend, &ManualClock::new(1));
        assert!(broker.save_fields([(SharedField::Age, FieldValue::Number(30.0))], "a", "A"));

        backend.set_quota(Some(16));
        assert!(!broker.save_fields([(SharedField::Bmi, FieldValue::Number(22.0))], "a", "A"));
        assert!(broker.get_fields(&[SharedField::Bmi]).is_empty());
        assert_eq!(broker.revision(), 1);
    }

    #[test]
    fn test_listeners_run_on_change_only() {
        let backend = MemoryBackend::new();
        let broker = broker_over(&backend, &ManualClock::new(1));
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let _sub = broker.subscribe(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        assert!(broker.save_fields([(SharedField::Age, FieldValue::Number(30.0))], "a", "A"));
        assert!(!broker.refresh());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_external_change_is_observed() {
        let tab_a = MemoryBackend::new();
        let tab_b = tab_a.handle();
        let clock = ManualClock::new(10);
        let broker_a = broker_over(&tab_a, &clock);
        let broker_b = broker_over(&tab_b, &clock);
        broker_b.watch(&tab_b);

        assert!(broker_a.save_fields(
            [(SharedField::GuestCount, FieldValue::Number(12.0))],
            "a",
            "A",
        ));

        assert_eq!(broker_b.revision(), 1);
        assert_eq!(broker_b.last_updated(), 10);
        assert_eq!(
            broker_b.get_fields(&[SharedField::GuestCount])[&SharedField::GuestCount].value,
            FieldValue::Number(12.0)
        );
    }

    #[test]
    fn test_external_clear_advances_last_updated() {
        let tab_a = MemoryBackend::new();
        let tab_b = tab_a.handle();
        let clock = ManualClock::new(10);
        let broker_a = broker_over(&tab_a, &clock);
        let broker_b = broker_over(&tab_b, &clock);
        broker_b.watch(&tab_b);

        assert!(broker_a.save_fields([(SharedField::Age, FieldValue::Number(30.0))], "a", "A"));
        assert_eq!(broker_b.last_updated(), 10);

        clock.set(5_000);
        assert!(broker_a.clear());
        assert_eq!(broker_b.revision(), 2);
        assert!(broker_b.document().is_empty());
        assert_eq!(broker_b.last_updated(), 5_000);
    }

    #[test]
    fn test_clear_resets_view() {
        let backend = MemoryBackend::new();
        let broker = broker_over(&backend, &ManualClock::new(1));
        assert!(broker.save_fields([(SharedField::Age, FieldValue::Number(30.0))], "a", "A"));
        assert!(broker.clear());
        assert!(broker.get_fields(&[SharedField::Age]).is_empty());
        assert!(backend.keys().is_empty());
    }

    #[test]
    fn test_unavailable_store_is_inert() {
        let backend = MemoryBackend::disabled();
        let broker = broker_over(&backend, &ManualClock::new(1));
        assert!(!broker.is_available());
        assert!(!broker.save_fields([(SharedField::Age, FieldValue::Number(30.0))], "a", "A"));
        assert!(broker.get_fields(&SharedField::ALL).is_empty());
        assert!(!broker.refresh());
        assert!(!broker.clear());
    }
}
