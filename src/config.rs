//! Configuration loading and management
//!
//! Handles parsing of `kanban.toml` configuration files.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::lock::DEFAULT_LOCK_TIMEOUT_MS;
use crate::model::Priority;

/// Config file name looked up in the data directory
pub const CONFIG_FILE_NAME: &str = "kanban.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub timer: TimerConfig,

    #[serde(default)]
    pub export: ExportConfig,

    /// Defaults applied to new tasks
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// Snapshot key names and lock behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_tasks_key")]
    pub tasks_key: String,

    #[serde(default = "default_history_key")]
    pub history_key: String,

    /// How long to wait for another process holding a snapshot lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_tasks_key() -> String {
    "kanban-tasks".to_string()
}

fn default_history_key() -> String {
    "kanban-history".to_string()
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            tasks_key: default_tasks_key(),
            history_key: default_history_key(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Poll interval for live elapsed-time displays
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

fn default_tick_ms() -> u64 {
    1000
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Value written to the `version` field of backups
    #[serde(default = "default_export_version")]
    pub version: String,

    /// Default backup file name prefix
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

fn default_export_version() -> String {
    "1.0".to_string()
}

fn default_file_prefix() -> String {
    "kanban-backup".to_string()
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            version: default_export_version(),
            file_prefix: default_file_prefix(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default)]
    pub priority: Priority,
}

impl BoardConfig {
    /// Load configuration from a `kanban.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: BoardConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `kanban.toml` from the data directory, or return defaults
    pub fn load_from_dir(data_dir: &Path) -> Self {
        let config_path = data_dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            return Self::default();
        }
        match Self::load(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %config_path.display(), "ignoring invalid config: {err}");
                Self::default()
            }
        }
    }

    fn validate(&self) -> Result<()> {
        self.storage.validate()?;
        if self.timer.tick_ms == 0 {
            return Err(Error::InvalidConfig("timer.tick_ms must be > 0".to_string()));
        }
        if self.export.version.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "export.version cannot be empty".to_string(),
            ));
        }
        validate_key(&self.export.file_prefix, "export.file_prefix")?;
        Ok(())
    }
}

impl StorageConfig {
    fn validate(&self) -> Result<()> {
        validate_key(&self.tasks_key, "storage.tasks_key")?;
        validate_key(&self.history_key, "storage.history_key")?;
        if self.tasks_key == self.history_key {
            return Err(Error::InvalidConfig(
                "storage.tasks_key and storage.history_key must differ".to_string(),
            ));
        }
        Ok(())
    }
}

/// Keys become file names, so keep them to a safe character set.
fn validate_key(key: &str, field: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(Error::InvalidConfig(format!("{field} cannot be empty")));
    }
    if !key
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
    {
        return Err(Error::InvalidConfig(format!(
            "{field}: '{key}' may only contain letters, digits, '-', '_' and '.'"
        )));
    }
    Ok(())
}
