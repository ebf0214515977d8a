//! Per-calculator binding to the shared state.
//!
//! Provides:
//! - `FieldMapping` - which local keys correspond to which shared fields
//! - `CalculatorBinding` - import banner state, import and export operations
//! - `CalculatorSession` - owns a calculator's inputs and exports on change

mod hook;
mod mapping;
mod session;

use std::collections::BTreeMap;

pub use hook::{AvailableImport, CalculatorBinding};
pub use mapping::FieldMapping;
pub use session::{Calculator, CalculatorSession};

use crate::fields::FieldValue;

/// Calculator-local input state, addressed by local key.
pub trait LocalFields {
    /// Current value of `key`, `None` when unset or not representable as a
    /// shared value.
    fn field(&self, key: &str) -> Option<FieldValue>;

    /// Whether [`set_field`](Self::set_field) would take `value` for `key`.
    fn accepts(&self, key: &str, value: FieldValue) -> bool;

    /// Set `key`. Returns false if the state has no such key or rejects the
    /// value.
    fn set_field(&mut self, key: &str, value: FieldValue) -> bool;

    /// Apply several values as one update.
    ///
    /// All or nothing: if any entry is rejected, the state is left as it was
    /// and 0 is returned. Otherwise returns the patch length.
    fn apply_patch(&mut self, patch: &[(String, FieldValue)]) -> usize {
        if !patch.iter().all(|(key, value)| self.accepts(key, *value)) {
            return 0;
        }
        patch
            .iter()
            .filter(|(key, value)| self.set_field(key, *value))
            .count()
    }
}

/// Untyped local state keyed by local field name.
pub type FieldMap = BTreeMap<String, FieldValue>;

impl LocalFields for FieldMap {
    fn field(&self, key: &str) -> Option<FieldValue> {
        self.get(key).copied()
    }

    fn accepts(&self, _key: &str, _value: FieldValue) -> bool {
        true
    }

    fn set_field(&mut self, key: &str, value: FieldValue) -> bool {
        self.insert(key.to_string(), value);
        true
    }
}
