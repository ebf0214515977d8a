//! Binding between one mounted calculator and the shared-state broker.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::binding::{FieldMapping, LocalFields};
use crate::broker::SharedStateBroker;
use crate::display;
use crate::fields::{FieldValue, SharedField};
use crate::registry::{CalculatorConfig, CalculatorRegistry};
use crate::types::SharedDataEntry;

/// Default lifetime of the "just exported" acknowledgment.
pub const JUST_EXPORTED_FOR: Duration = Duration::from_millis(2000);

/// A stored value this calculator can take in.
#[derive(Debug, Clone, PartialEq)]
pub struct AvailableImport {
    pub shared_key: SharedField,
    pub local_key: String,
    pub entry: SharedDataEntry,
    /// Display label of the shared field.
    pub label: &'static str,
}

/// Import/export state for one calculator instance.
///
/// The import gate has two layers: a field is offered only if the registry
/// declares it importable for this calculator *and* this instance maps it to
/// a local key. Exports are filtered the same way against the registry's
/// export list, even when the instance mapping claims more.
///
/// Every operation is a silent no-op when storage is unavailable, the
/// calculator is not registered, or nothing qualifies.
pub struct CalculatorBinding {
    broker: SharedStateBroker,
    config: Option<CalculatorConfig>,
    mapping: FieldMapping,
    dismissed: bool,
    imports_cache: RefCell<Option<(u64, Vec<AvailableImport>)>>,
    exported_at: Option<Instant>,
    just_exported_for: Duration,
}

impl CalculatorBinding {
    /// Bind calculator `calculator_id` from `registry`.
    ///
    /// Mapping entries the registry does not declare are dropped here.
    pub fn new(
        broker: SharedStateBroker,
        registry: &CalculatorRegistry,
        calculator_id: &str,
        mapping: FieldMapping,
    ) -> Self {
        let config = registry.get_config(calculator_id).cloned();
        let mapping = match &config {
            Some(config) => mapping.validated(config),
            None => {
                tracing::warn!(calculator = calculator_id, "binding an unregistered calculator");
                FieldMapping::new()
            }
        };
        Self {
            broker,
            config,
            mapping,
            dismissed: false,
            imports_cache: RefCell::new(None),
            exported_at: None,
            just_exported_for: JUST_EXPORTED_FOR,
        }
    }

    /// Override how long [`just_exported`](Self::just_exported) stays true.
    #[must_use]
    pub fn with_just_exported_for(mut self, duration: Duration) -> Self {
        self.just_exported_for = duration;
        self
    }

    pub fn config(&self) -> Option<&CalculatorConfig> {
        self.config.as_ref()
    }

    pub fn mapping(&self) -> &FieldMapping {
        &self.mapping
    }

    pub fn broker(&self) -> &SharedStateBroker {
        &self.broker
    }

    /// Stored values this calculator can import, recomputed only when the
    /// broker has observed a change since the last call.
    pub fn available_imports(&self) -> Vec<AvailableImport> {
        let revision = self.broker.revision();
        if let Some((seen, imports)) = self.imports_cache.borrow().as_ref()
            && *seen == revision
        {
            return imports.clone();
        }
        let imports = self.compute_available_imports();
        *self.imports_cache.borrow_mut() = Some((revision, imports.clone()));
        imports
    }

    fn compute_available_imports(&self) -> Vec<AvailableImport> {
        let Some(config) = &self.config else {
            return Vec::new();
        };
        let stored = self.broker.get_fields(&config.imports);
        config
            .imports
            .iter()
            .filter_map(|&field| {
                let entry = stored.get(&field)?;
                let local_key = self.mapping.import_key(field)?;
                Some(AvailableImport {
                    shared_key: field,
                    local_key: local_key.to_string(),
                    entry: entry.clone(),
                    label: field.label(),
                })
            })
            .collect()
    }

    /// Whether the import banner should be shown.
    pub fn show_import_banner(&self) -> bool {
        !self.dismissed && !self.available_imports().is_empty()
    }

    /// Hide the banner for the rest of this binding's life.
    pub fn dismiss_import_banner(&mut self) {
        self.dismissed = true;
    }

    /// Banner text describing what can be imported.
    pub fn banner_message(&self) -> Option<String> {
        display::banner_message(&self.available_imports(), self.broker.now_millis())
    }

    /// Copy the stored values of `keys` into `inputs` as one update.
    ///
    /// Keys without a stored entry or without an import mapping are
    /// skipped. Dismisses the banner. Returns how many values were applied.
    pub fn import_fields<I: LocalFields + ?Sized>(
        &mut self,
        keys: &[SharedField],
        inputs: &mut I,
    ) -> usize {
        self.dismissed = true;
        let Some(config) = &self.config else {
            return 0;
        };
        let keys: Vec<SharedField> = keys
            .iter()
            .copied()
            .filter(|field| config.can_import(*field))
            .collect();
        let stored = self.broker.get_fields(&keys);
        let patch: Vec<(String, FieldValue)> = keys
            .iter()
            .filter_map(|field| {
                let entry = stored.get(field)?;
                let local_key = self.mapping.import_key(*field)?;
                Some((local_key.to_string(), entry.value))
            })
            .collect();
        if patch.is_empty() {
            return 0;
        }
        let applied = inputs.apply_patch(&patch);
        tracing::debug!(calculator = %config.id, applied, "imported shared fields");
        applied
    }

    /// Import every available value.
    pub fn import_all<I: LocalFields + ?Sized>(&mut self, inputs: &mut I) -> usize {
        let keys: Vec<SharedField> = self
            .available_imports()
            .iter()
            .map(|import| import.shared_key)
            .collect();
        self.import_fields(&keys, inputs)
    }

    /// Publish mapped local inputs.
    pub fn export_data<I: LocalFields + ?Sized>(&mut self, inputs: &I) -> bool {
        self.export_data_with(inputs, std::iter::empty())
    }

    /// Publish mapped local inputs plus `extra` derived values.
    ///
    /// Only fields the registry declares as exports are written. Returns
    /// true if the broker persisted the write.
    pub fn export_data_with<I: LocalFields + ?Sized>(
        &mut self,
        inputs: &I,
        extra: impl IntoIterator<Item = (SharedField, FieldValue)>,
    ) -> bool {
        let Some(config) = &self.config else {
            return false;
        };

        let mut candidates: BTreeMap<SharedField, FieldValue> = self
            .mapping
            .exports()
            .filter_map(|(key, field)| inputs.field(key).map(|value| (field, value)))
            .collect();
        candidates.extend(extra);
        candidates.retain(|field, _| config.can_export(*field));

        if candidates.is_empty() {
            return false;
        }

        let saved = self
            .broker
            .save_fields(candidates, &config.id, &config.name);
        if saved {
            self.exported_at = Some(Instant::now());
            self.broker.refresh();
        }
        saved
    }

    /// True for a short while after a successful export.
    pub fn just_exported(&self) -> bool {
        self.exported_at
            .is_some_and(|at| at.elapsed() < self.just_exported_for)
    }

    pub fn clear_just_exported(&mut self) {
        self.exported_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::FieldMap;
    use crate::clock::ManualClock;
    use crate::store::{MemoryBackend, SharedDataStore};
    use std::sync::Arc;

    fn registry() -> CalculatorRegistry {
        CalculatorRegistry::from_configs([
            CalculatorConfig::new(
                "bbq",
                "BBQ Planner",
                [SharedField::GuestCount],
                [SharedField::GuestCount, SharedField::EventBudget],
            ),
            CalculatorConfig::new(
                "party",
                "Party Budget",
                [SharedField::GuestCount, SharedField::EventBudget],
                [SharedField::GuestCount],
            ),
        ])
        .unwrap()
    }

    fn broker(backend: &MemoryBackend) -> SharedStateBroker {
        SharedStateBroker::with_clock(
            SharedDataStore::new(Arc::new(backend.clone())),
            Arc::new(ManualClock::new(1_000)),
        )
    }

    #[test]
    fn test_unregistered_calculator_is_inert() {
        let backend = MemoryBackend::new();
        let mut binding = CalculatorBinding::new(
            broker(&backend),
            &registry(),
            "nope",
            FieldMapping::new().both(SharedField::GuestCount, "guests"),
        );
        let mut inputs = FieldMap::from([("guests".to_string(), FieldValue::Number(4.0))]);
        assert!(binding.config().is_none());
        assert!(!binding.export_data(&inputs));
        assert_eq!(binding.import_all(&mut inputs), 0);
        assert!(!binding.show_import_banner());
    }

    #[test]
    fn test_available_imports_follow_broker_changes() {
        let backend = MemoryBackend::new();
        let broker = broker(&backend);
        let party = CalculatorBinding::new(
            broker.clone(),
            &registry(),
            "party",
            FieldMapping::new().import(SharedField::GuestCount, "partySize"),
        );
        assert!(party.available_imports().is_empty());

        assert!(broker.save_fields(
            [(SharedField::GuestCount, FieldValue::Number(8.0))],
            "bbq",
            "BBQ Planner"
        ));
        let imports = party.available_imports();
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].local_key, "partySize");
        assert_eq!(imports[0].label, "Number of Guests");
    }

    #[test]
    fn test_unmapped_stored_field_is_not_offered() {
        let backend = MemoryBackend::new();
        let broker = broker(&backend);
        assert!(broker.save_fields(
            [(SharedField::EventBudget, FieldValue::Number(300.0))],
            "bbq",
            "BBQ Planner"
        ));
        let party = CalculatorBinding::new(
            broker,
            &registry(),
            "party",
            FieldMapping::new().import(SharedField::GuestCount, "partySize"),
        );
        assert!(party.available_imports().is_empty());
        assert!(!party.show_import_banner());
    }

    #[test]
    fn test_dismiss_hides_banner() {
        let backend = MemoryBackend::new();
        let broker = broker(&backend);
        assert!(broker.save_fields(
            [(SharedField::GuestCount, FieldValue::Number(8.0))],
            "bbq",
            "BBQ Planner"
        ));
        let mut party = CalculatorBinding::new(
            broker,
            &registry(),
            "party",
            FieldMapping::new().import(SharedField::GuestCount, "partySize"),
        );
        assert!(party.show_import_banner());
        party.dismiss_import_banner();
        assert!(!party.show_import_banner());
        assert_eq!(party.available_imports().len(), 1);
    }

    #[test]
    fn test_banner_returns_for_new_binding() {
        let backend = MemoryBackend::new();
        let broker = broker(&backend);
        assert!(broker.save_fields(
            [(SharedField::GuestCount, FieldValue::Number(8.0))],
            "bbq",
            "BBQ Planner"
        ));
        let mapping = FieldMapping::new().import(SharedField::GuestCount, "partySize");
        let mut first =
            CalculatorBinding::new(broker.clone(), &registry(), "party", mapping.clone());
        first.dismiss_import_banner();
        assert!(!first.show_import_banner());
        drop(first);

        let second = CalculatorBinding::new(broker, &registry(), "party", mapping);
        assert!(second.show_import_banner());
    }

    /// Party inputs that refuse budgets of 1000 or more.
    #[derive(Default)]
    struct CappedBudget {
        party: Option<f64>,
        budget: Option<f64>,
    }

    impl LocalFields for CappedBudget {
        fn field(&self, key: &str) -> Option<FieldValue> {
            match key {
                "partySize" => self.party.map(FieldValue::Number),
                "budget" => self.budget.map(FieldValue::Number),
                _ => None,
            }
        }

        fn accepts(&self, key: &str, value: FieldValue) -> bool {
            match (key, value) {
                ("partySize", FieldValue::Number(_)) => true,
                ("budget", FieldValue::Number(n)) => n < 1000.0,
                _ => false,
            }
        }

        fn set_field(&mut self, key: &str, value: FieldValue) -> bool {
            if !self.accepts(key, value) {
                return false;
            }
            let FieldValue::Number(n) = value else {
                return false;
            };
            match key {
                "partySize" => self.party = Some(n),
                _ => self.budget = Some(n),
            }
            true
        }
    }

    #[test]
    fn test_rejected_value_leaves_inputs_untouched() {
        let backend = MemoryBackend::new();
        let broker = broker(&backend);
        assert!(broker.save_fields(
            [
                (SharedField::GuestCount, FieldValue::Number(50.0)),
                (SharedField::EventBudget, FieldValue::Number(5000.0)),
            ],
            "bbq",
            "BBQ Planner"
        ));
        let mut party = CalculatorBinding::new(
            broker,
            &registry(),
            "party",
            FieldMapping::new()
                .import(SharedField::GuestCount, "partySize")
                .import(SharedField::EventBudget, "budget"),
        );
        let mut inputs = CappedBudget {
            party: Some(4.0),
            budget: None,
        };

        assert_eq!(party.import_all(&mut inputs), 0);
        assert_eq!(inputs.party, Some(4.0));
        assert_eq!(inputs.budget, None);
        assert!(!party.show_import_banner());
    }

    #[test]
    fn test_accepted_patch_applies_every_value() {
        let mut inputs = CappedBudget::default();
        let patch = vec![
            ("partySize".to_string(), FieldValue::Number(12.0)),
            ("budget".to_string(), FieldValue::Number(400.0)),
        ];
        assert_eq!(inputs.apply_patch(&patch), 2);
        assert_eq!(inputs.field("partySize"), Some(FieldValue::Number(12.0)));
        assert_eq!(inputs.field("budget"), Some(FieldValue::Number(400.0)));
    }

    #[test]
    fn test_export_sets_and_clears_just_exported() {
        let backend = MemoryBackend::new();
        let mut bbq = CalculatorBinding::new(
            broker(&backend),
            &registry(),
            "bbq",
            FieldMapping::new().export("guests", SharedField::GuestCount),
        )
        .with_just_exported_for(Duration::from_secs(60));
        let inputs = FieldMap::from([("guests".to_string(), FieldValue::Number(8.0))]);

        assert!(!bbq.just_exported());
        assert!(bbq.export_data(&inputs));
        assert!(bbq.just_exported());
        bbq.clear_just_exported();
        assert!(!bbq.just_exported());
    }

    #[test]
    fn test_just_exported_expires() {
        let backend = MemoryBackend::new();
        let mut bbq = CalculatorBinding::new(
            broker(&backend),
            &registry(),
            "bbq",
            FieldMapping::new().export("guests", SharedField::GuestCount),
        )
        .with_just_exported_for(Duration::ZERO);
        let inputs = FieldMap::from([("guests".to_string(), FieldValue::Number(8.0))]);
        assert!(bbq.export_data(&inputs));
        assert!(!bbq.just_exported());
    }

    #[test]
    fn test_export_skips_undefined_inputs() {
        let backend = MemoryBackend::new();
        let mut bbq = CalculatorBinding::new(
            broker(&backend),
            &registry(),
            "bbq",
            FieldMapping::new().export("guests", SharedField::GuestCount),
        );
        assert!(!bbq.export_data(&FieldMap::new()));
        assert!(backend.keys().is_empty());
    }

    #[test]
    fn test_derived_exports_are_scoped() {
        let backend = MemoryBackend::new();
        let broker = broker(&backend);
        let mut bbq = CalculatorBinding::new(
            broker.clone(),
            &registry(),
            "bbq",
            FieldMapping::new(),
        );
        assert!(bbq.export_data_with(
            &FieldMap::new(),
            [
                (SharedField::EventBudget, FieldValue::Number(250.0)),
                (SharedField::Bmi, FieldValue::Number(22.0)),
            ],
        ));
        assert_eq!(broker.get_fields(&[SharedField::EventBudget]).len(), 1);
        assert!(broker.get_fields(&[SharedField::Bmi]).is_empty());
    }
}
