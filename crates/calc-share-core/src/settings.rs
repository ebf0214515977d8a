//! Shared-data settings, persisted as TOML.
//!
//! Settings are loaded from the user's config directory at startup. A
//! missing or unreadable file yields the defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ShareError};
use crate::types::DEFAULT_STORAGE_KEY;

/// Settings for the shared-data layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareSettings {
    /// Storage key the document lives under.
    pub storage_key: String,

    /// Directory for the file backend. `None` uses the platform data dir.
    pub data_dir: Option<PathBuf>,

    /// How often hosts poll for changes made by other processes.
    pub poll_interval_ms: u64,
}

impl Default for ShareSettings {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            data_dir: None,
            poll_interval_ms: 1000,
        }
    }
}

impl ShareSettings {
    /// Load settings from the default path.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load settings from a specific path, falling back to defaults.
    pub fn load_from(path: &Path) -> Self {
        match Self::try_load_from(path) {
            Ok(settings) => settings,
            Err(error) => {
                tracing::debug!(%error, "using default shared data settings");
                Self::default()
            }
        }
    }

    /// Load settings from a specific path, reporting why it failed.
    pub fn try_load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ShareError::Settings {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ShareError::Settings {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save settings to the default path.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ShareError::Io {
                operation: "create directory",
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| ShareError::Settings {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        std::fs::write(path, content).map_err(|e| ShareError::Io {
            operation: "write",
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path.
    pub fn config_path() -> PathBuf {
        project_dirs()
            .map(|dirs| dirs.config_dir().join("settings.toml"))
            .unwrap_or_else(|| PathBuf::from("settings.toml"))
    }

    /// Directory used by the file backend.
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            project_dirs()
                .map(|dirs| dirs.data_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from("shared-data"))
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "CalcShare", "calc-share")
}
