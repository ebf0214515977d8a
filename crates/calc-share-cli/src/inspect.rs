//! Read-side helpers behind the CLI commands.
//!
//! Everything here returns plain rows so the commands can render tables and
//! tests can assert on data instead of terminal output.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};

use calc_share_core::{
    AvailableImport, CalculatorBinding, CalculatorRegistry, Currency, FieldKind, FieldMap,
    FieldMapping, FieldValue, FileBackend, Gender, ShareError, ShareSettings, SharedDataStore,
    SharedField, SharedStateBroker, StoredDocument, display,
};

/// One stored field as shown by `show`.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    pub key: &'static str,
    pub label: &'static str,
    pub value: String,
    pub source_name: String,
    pub saved: String,
}

/// One downstream calculator as shown by `connections`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionRow {
    pub id: String,
    pub name: String,
    /// Fields the source exports that this calculator imports.
    pub shared: Vec<SharedField>,
}

/// Storage location and key for a CLI invocation.
#[derive(Debug, Clone)]
pub struct StorageTarget {
    pub backend: FileBackend,
    pub key: String,
}

impl StorageTarget {
    /// Resolve the target from settings, preferring an explicit data dir.
    pub fn resolve(settings: &ShareSettings, data_dir: Option<&Path>) -> Self {
        let dir = data_dir.map_or_else(|| settings.resolved_data_dir(), Path::to_path_buf);
        Self {
            backend: FileBackend::new(dir),
            key: settings.storage_key.clone(),
        }
    }

    pub fn store(&self) -> SharedDataStore {
        SharedDataStore::with_key(Arc::new(self.backend.clone()), self.key.as_str())
    }

    /// Open a broker over this target.
    ///
    /// # Errors
    ///
    /// Fails if the data directory cannot be written.
    pub fn open(&self) -> Result<SharedStateBroker> {
        let broker = SharedStateBroker::new(self.store());
        if !broker.is_available() {
            let path = self.backend.dir().display().to_string();
            return Err(ShareError::StoreUnavailable { reason: path })
                .context("open shared data storage");
        }
        Ok(broker)
    }
}

/// Rows for every known field present in `doc`, in field registry order.
pub fn stored_rows(doc: &StoredDocument, now: i64) -> Vec<StoredRow> {
    SharedField::ALL
        .into_iter()
        .filter_map(|field| {
            let entry = doc.entry(field)?;
            Some(StoredRow {
                key: field.key(),
                label: field.label(),
                value: entry.value.to_string(),
                source_name: entry.source_name,
                saved: display::time_ago(entry.saved_at, now),
            })
        })
        .collect()
}

/// Calculators that can consume what `calculator_id` exports.
///
/// # Errors
///
/// Fails if `calculator_id` is not registered.
pub fn connection_rows(
    registry: &CalculatorRegistry,
    calculator_id: &str,
) -> Result<Vec<ConnectionRow>> {
    let source = registry
        .get_config(calculator_id)
        .ok_or_else(|| ShareError::UnknownCalculator(calculator_id.to_string()))?;
    Ok(registry
        .get_connected(calculator_id)
        .into_iter()
        .map(|target| ConnectionRow {
            id: target.id.clone(),
            name: target.name.clone(),
            shared: target
                .imports
                .iter()
                .copied()
                .filter(|field| source.exports.contains(field))
                .collect(),
        })
        .collect())
}

/// Parse `key=value` into a shared field and a value of the field's kind.
///
/// # Errors
///
/// Fails on a missing `=`, an unknown field or a value of the wrong kind.
pub fn parse_assignment(input: &str) -> Result<(SharedField, FieldValue)> {
    let (key, raw) = input
        .split_once('=')
        .ok_or_else(|| anyhow!("expected FIELD=VALUE, got '{input}'"))?;
    let field = SharedField::from_key(key.trim())
        .ok_or_else(|| anyhow!("unknown shared field '{}'", key.trim()))?;
    let raw = raw.trim();
    let value = match field.kind() {
        FieldKind::Number => {
            let number: f64 = raw
                .parse()
                .with_context(|| format!("'{raw}' is not a number"))?;
            FieldValue::Number(number)
        }
        FieldKind::Currency => FieldValue::Currency(match raw.to_ascii_uppercase().as_str() {
            "USD" => Currency::Usd,
            "GBP" => Currency::Gbp,
            "EUR" => Currency::Eur,
            _ => bail!("unsupported currency '{raw}'"),
        }),
        FieldKind::Gender => FieldValue::Gender(match raw.to_ascii_lowercase().as_str() {
            "male" => Gender::Male,
            "female" => Gender::Female,
            _ => bail!("unsupported gender '{raw}'"),
        }),
    };
    if !value.fits(field) {
        bail!("'{raw}' is not a valid value for {}", field.key());
    }
    Ok((field, value))
}

/// Publish `values` as calculator `calculator_id`.
///
/// Goes through a [`CalculatorBinding`], so fields the calculator does not
/// declare as exports are left out. Returns the fields actually written.
///
/// # Errors
///
/// Fails for unknown calculators or when nothing could be written.
pub fn publish(
    broker: &SharedStateBroker,
    registry: &CalculatorRegistry,
    calculator_id: &str,
    values: &[(SharedField, FieldValue)],
) -> Result<Vec<SharedField>> {
    let config = registry
        .get_config(calculator_id)
        .ok_or_else(|| ShareError::UnknownCalculator(calculator_id.to_string()))?;
    let mut mapping = FieldMapping::new();
    let mut inputs = FieldMap::new();
    for (field, value) in values {
        mapping = mapping.export(field.key(), *field);
        inputs.insert(field.key().to_string(), *value);
    }
    let mut binding = CalculatorBinding::new(broker.clone(), registry, calculator_id, mapping);
    let written: Vec<SharedField> = values
        .iter()
        .map(|(field, _)| *field)
        .filter(|field| config.can_export(*field))
        .collect();
    if written.is_empty() {
        bail!("{} does not export any of the given fields", config.name);
    }
    if !binding.export_data(&inputs) {
        bail!("failed to write shared data");
    }
    Ok(written)
}

/// What calculator `calculator_id` would be offered on mount.
///
/// Each importable field maps to a local key equal to the field key.
///
/// # Errors
///
/// Fails if `calculator_id` is not registered.
pub fn pending_imports(
    broker: &SharedStateBroker,
    registry: &CalculatorRegistry,
    calculator_id: &str,
) -> Result<(Vec<AvailableImport>, Option<String>)> {
    let config = registry
        .get_config(calculator_id)
        .ok_or_else(|| ShareError::UnknownCalculator(calculator_id.to_string()))?;
    let mapping = config
        .imports
        .iter()
        .fold(FieldMapping::new(), |mapping, field| {
            mapping.import(*field, field.key())
        });
    let binding = CalculatorBinding::new(broker.clone(), registry, calculator_id, mapping);
    Ok((binding.available_imports(), binding.banner_message()))
}
