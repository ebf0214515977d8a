//! Shared-data synchronization for calculator apps.
//!
//! Calculators publish named values (`annualIncome`, `guestCount`, ...) into
//! one persisted document and pick up values other calculators published,
//! including values written from another tab or process.
//!
//! # Features
//!
//! - **Closed field vocabulary** so producers and consumers never share
//!   local input names
//! - **Provenance** on every stored value (writer id, name and time)
//! - **Version-gated document**: corrupt or outdated data reads as empty
//! - **Best-effort storage**: with storage disabled every operation is a
//!   silent no-op and calculators keep working on their own
//!
//! # Document Format
//!
//! ```text
//! {
//!   "version": 1,
//!   "data": {
//!     "guestCount": {
//!       "value": 50,
//!       "source": "bbq-planner",
//!       "sourceName": "BBQ Planner",
//!       "savedAt": 1700000000000
//!     }
//!   },
//!   "lastUpdated": 1700000000000
//! }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use calc_share_core::{
//!     CalculatorBinding, FieldMapping, MemoryBackend, SharedDataStore, SharedField,
//!     SharedStateBroker, default_registry,
//! };
//!
//! let backend = Arc::new(MemoryBackend::new());
//! let broker = SharedStateBroker::new(SharedDataStore::new(backend));
//! let mut party = CalculatorBinding::new(
//!     broker,
//!     default_registry(),
//!     "party-budget-calculator",
//!     FieldMapping::new().import(SharedField::GuestCount, "partySize"),
//! );
//! if party.show_import_banner() {
//!     party.import_all(&mut inputs);
//! }
//! ```
//!
//! # Architecture
//!
//! - `store/` - Storage backends, the document adapter, change detection
//! - `types/` - Persisted document and entry types
//! - `fields.rs` - Field registry
//! - `registry.rs` - Calculator configs and the connection graph
//! - `broker.rs` - Shared-state broker
//! - `binding/` - Per-calculator binding and session
//! - `settings.rs` - TOML settings
//! - `error.rs` - Error types with user-friendly messages

pub mod binding;
pub mod broker;
pub mod clock;
pub mod display;
mod error;
pub mod fields;
pub mod registry;
pub mod settings;
pub mod store;
mod types;

pub use binding::{
    AvailableImport, Calculator, CalculatorBinding, CalculatorSession, FieldMap, FieldMapping,
    LocalFields,
};
pub use broker::SharedStateBroker;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Result, ShareError};
pub use fields::{Currency, FieldKind, FieldValue, Gender, SharedField, field_label};
pub use registry::{CalculatorConfig, CalculatorRegistry, default_registry};
pub use settings::ShareSettings;
pub use store::{
    ChangeCallback, ChangeSubscription, ExternalChangeSource, FileBackend, FilePoller,
    MemoryBackend, NoExternalChanges, SharedDataStore, StorageBackend,
};
pub use types::{
    CURRENT_SCHEMA_VERSION, DEFAULT_STORAGE_KEY, SharedDataEntry, StoredDocument, StoredEntry,
};
