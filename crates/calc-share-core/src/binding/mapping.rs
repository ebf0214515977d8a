//! Import/export mapping between shared fields and local keys.

use std::collections::BTreeMap;

use crate::fields::SharedField;
use crate::registry::CalculatorConfig;

/// Two-sided mapping table declared by a calculator instance.
///
/// Import entries map a shared field to the local key it fills; export
/// entries map a local key to the shared field it publishes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMapping {
    imports: BTreeMap<SharedField, String>,
    exports: BTreeMap<String, SharedField>,
}

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill local `key` from shared `field`.
    #[must_use]
    pub fn import(mut self, field: SharedField, key: impl Into<String>) -> Self {
        self.imports.insert(field, key.into());
        self
    }

    /// Publish local `key` as shared `field`.
    #[must_use]
    pub fn export(mut self, key: impl Into<String>, field: SharedField) -> Self {
        self.exports.insert(key.into(), field);
        self
    }

    /// Map `field` and local `key` in both directions.
    #[must_use]
    pub fn both(self, field: SharedField, key: impl Into<String>) -> Self {
        let key = key.into();
        self.import(field, key.clone()).export(key, field)
    }

    /// Drop every entry `config` does not declare.
    #[must_use]
    pub fn validated(mut self, config: &CalculatorConfig) -> Self {
        self.imports.retain(|field, key| {
            let declared = config.can_import(*field);
            if !declared {
                tracing::debug!(
                    calculator = %config.id,
                    %field,
                    %key,
                    "dropping undeclared import mapping"
                );
            }
            declared
        });
        self.exports.retain(|key, field| {
            let declared = config.can_export(*field);
            if !declared {
                tracing::debug!(
                    calculator = %config.id,
                    %field,
                    %key,
                    "dropping undeclared export mapping"
                );
            }
            declared
        });
        self
    }

    pub fn import_key(&self, field: SharedField) -> Option<&str> {
        self.imports.get(&field).map(String::as_str)
    }

    pub fn imports(&self) -> impl Iterator<Item = (SharedField, &str)> {
        self.imports.iter().map(|(field, key)| (*field, key.as_str()))
    }

    pub fn exports(&self) -> impl Iterator<Item = (&str, SharedField)> {
        self.exports.iter().map(|(key, field)| (key.as_str(), *field))
    }

    pub fn is_empty(&self) -> bool {
        self.imports.is_empty() && self.exports.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_maps_each_direction() {
        let mapping = FieldMapping::new().both(SharedField::GuestCount, "guests");
        assert_eq!(mapping.import_key(SharedField::GuestCount), Some("guests"));
        assert_eq!(
            mapping.exports().collect::<Vec<_>>(),
            vec![("guests", SharedField::GuestCount)]
        );
    }

    #[test]
    fn test_validated_drops_undeclared_entries() {
        let config = CalculatorConfig::new(
            "bbq",
            "BBQ",
            [SharedField::GuestCount],
            [SharedField::GuestCount],
        );
        let mapping = FieldMapping::new()
            .both(SharedField::GuestCount, "guests")
            .import(SharedField::Currency, "currency")
            .export("budget", SharedField::EventBudget)
            .validated(&config);

        assert_eq!(mapping.import_key(SharedField::Currency), None);
        assert_eq!(mapping.imports().count(), 1);
        assert_eq!(
            mapping.exports().collect::<Vec<_>>(),
            vec![("guests", SharedField::GuestCount)]
        );
    }
}
