//! The single persisted shared-data document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{CURRENT_SCHEMA_VERSION, SharedDataEntry, StoredEntry};
use crate::fields::SharedField;

/// Root document stored under the shared-data key.
///
/// Keys in `data` are wire field names. Unknown keys survive a read/write
/// cycle untouched but are never returned through the typed accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDocument {
    pub version: u32,
    pub data: BTreeMap<String, StoredEntry>,
    pub last_updated: i64,
}

impl Default for StoredDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl StoredDocument {
    /// Create an empty document at the current schema version.
    pub fn new() -> Self {
        Self {
            version: CURRENT_SCHEMA_VERSION,
            data: BTreeMap::new(),
            last_updated: 0,
        }
    }

    /// Typed entry for a field, if present and well-typed.
    pub fn entry(&self, field: SharedField) -> Option<SharedDataEntry> {
        self.data
            .get(field.key())
            .and_then(|stored| stored.to_entry(field))
    }

    /// Replace a field's entry wholesale.
    pub fn insert(&mut self, field: SharedField, entry: &SharedDataEntry) {
        self.data
            .insert(field.key().to_string(), StoredEntry::from(entry));
    }

    /// All recognized, well-typed entries.
    pub fn entries(&self) -> BTreeMap<SharedField, SharedDataEntry> {
        SharedField::ALL
            .into_iter()
            .filter_map(|field| self.entry(field).map(|entry| (field, entry)))
            .collect()
    }

    /// Advance `last_updated` to `now` without ever moving it backwards.
    pub fn touch(&mut self, now: i64) {
        self.last_updated = self.last_updated.max(now);
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldValue;

    #[test]
    fn test_touch_never_moves_backwards() {
        let mut doc = StoredDocument::new();
        doc.touch(100);
        doc.touch(50);
        assert_eq!(doc.last_updated, 100);
        doc.touch(150);
        assert_eq!(doc.last_updated, 150);
    }

    #[test]
    fn test_insert_replaces_wholesale() {
        let mut doc = StoredDocument::new();
        doc.insert(
            SharedField::GuestCount,
            &SharedDataEntry::new(FieldValue::Number(10.0), "a", "A", 1),
        );
        doc.insert(
            SharedField::GuestCount,
            &SharedDataEntry::new(FieldValue::Number(20.0), "b", "B", 2),
        );
        let entry = doc.entry(SharedField::GuestCount).unwrap();
        assert_eq!(entry.value, FieldValue::Number(20.0));
        assert_eq!(entry.source, "b");
        assert_eq!(entry.saved_at, 2);
        assert_eq!(doc.data.len(), 1);
    }

    #[test]
    fn test_unknown_keys_are_kept_but_not_exposed() {
        let json = r#"{"version":1,"data":{"shoeSize":{"value":42,"source":"x","sourceName":"X","savedAt":1}},"lastUpdated":1}"#;
        let doc: StoredDocument = serde_json::from_str(json).unwrap();
        assert!(doc.entries().is_empty());
        let back = serde_json::to_string(&doc).unwrap();
        assert!(back.contains("shoeSize"));
    }
}
