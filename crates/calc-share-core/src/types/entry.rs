//! Field entries with provenance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fields::{FieldValue, SharedField};

/// A shared value together with who wrote it and when.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedDataEntry {
    pub value: FieldValue,
    /// Calculator id of the writer.
    pub source: String,
    /// Calculator display name of the writer.
    pub source_name: String,
    /// Write time in epoch milliseconds.
    pub saved_at: i64,
}

impl SharedDataEntry {
    pub fn new(
        value: FieldValue,
        source: impl Into<String>,
        source_name: impl Into<String>,
        saved_at: i64,
    ) -> Self {
        Self {
            value,
            source: source.into(),
            source_name: source_name.into(),
            saved_at,
        }
    }

    /// Parse the write timestamp.
    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.saved_at)
    }
}

/// Wire form of an entry.
///
/// The value is kept as raw JSON so a well-formed document with one
/// ill-typed value still loads; the bad entry is simply never returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEntry {
    pub value: serde_json::Value,
    pub source: String,
    pub source_name: String,
    pub saved_at: i64,
}

impl StoredEntry {
    /// Convert to a typed entry for `field`, or `None` if the value does not
    /// match the field's declared kind.
    pub fn to_entry(&self, field: SharedField) -> Option<SharedDataEntry> {
        let value: FieldValue = serde_json::from_value(self.value.clone()).ok()?;
        if !value.fits(field) {
            return None;
        }
        Some(SharedDataEntry {
            value,
            source: self.source.clone(),
            source_name: self.source_name.clone(),
            saved_at: self.saved_at,
        })
    }
}

impl From<&SharedDataEntry> for StoredEntry {
    fn from(entry: &SharedDataEntry) -> Self {
        Self {
            value: serde_json::to_value(entry.value).unwrap_or(serde_json::Value::Null),
            source: entry.source.clone(),
            source_name: entry.source_name.clone(),
            saved_at: entry.saved_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Currency;

    #[test]
    fn test_wire_names_are_camel_case() {
        let entry = SharedDataEntry::new(
            FieldValue::Number(50.0),
            "bbq-planner",
            "BBQ Planner",
            1_700_000_000_000,
        );
        let json = serde_json::to_value(StoredEntry::from(&entry)).unwrap();
        assert_eq!(json["sourceName"], "BBQ Planner");
        assert_eq!(json["savedAt"], 1_700_000_000_000i64);
        assert_eq!(json["value"], 50.0);
    }

    #[test]
    fn test_ill_typed_value_is_rejected() {
        let stored = StoredEntry {
            value: serde_json::json!("GBP"),
            source: "x".into(),
            source_name: "X".into(),
            saved_at: 0,
        };
        assert!(stored.to_entry(SharedField::GuestCount).is_none());
        assert_eq!(
            stored.to_entry(SharedField::Currency).unwrap().value,
            FieldValue::Currency(Currency::Gbp)
        );
    }

    #[test]
    fn test_saved_at_parses() {
        let entry = SharedDataEntry::new(FieldValue::Number(1.0), "a", "A", 0);
        assert_eq!(entry.saved_at().unwrap().timestamp(), 0);
    }
}
