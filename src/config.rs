//! Configuration loading and management
//!
//! Handles parsing of `blacklock.toml` in the base directory. Every key is
//! optional; a missing file means defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file name inside the base directory
pub const CONFIG_FILE: &str = "blacklock.toml";

/// Longest accepted backup retention window (about a century)
pub const MAX_KEEP_DAYS: u32 = 36_500;

/// Longest accepted minimum reminder lead (one day)
pub const MAX_MIN_LEAD_SECS: u64 = 86_400;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Document storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Backup configuration
    #[serde(default)]
    pub backup: BackupConfig,

    /// Write coalescing configuration
    #[serde(default)]
    pub writes: WritesConfig,

    /// Reminder planning configuration
    #[serde(default)]
    pub reminders: RemindersConfig,
}

/// Document storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Compress documents with the lz-string UTF-16 transform
    #[serde(default = "default_true")]
    pub compress: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            compress: default_true(),
        }
    }
}

/// Backup configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Backups older than this many days are removed after each backup
    #[serde(default = "default_keep_days")]
    pub keep_days: u32,

    /// Take a backup of the current state before restoring another one
    #[serde(default = "default_true")]
    pub snapshot_before_restore: bool,
}

fn default_keep_days() -> u32 {
    7
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            keep_days: default_keep_days(),
            snapshot_before_restore: default_true(),
        }
    }
}

/// Write coalescing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WritesConfig {
    /// Delay after the last change before queued writes hit disk
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    1000
}

impl Default for WritesConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

/// Reminder planning configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemindersConfig {
    /// Reminders due sooner than this are not scheduled
    #[serde(default = "default_min_lead_secs")]
    pub min_lead_secs: u64,
}

fn default_min_lead_secs() -> u64 {
    5
}

impl Default for RemindersConfig {
    fn default() -> Self {
        Self {
            min_lead_secs: default_min_lead_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a `blacklock.toml` file
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the base directory, or return defaults.
    ///
    /// An unreadable or invalid file is logged and ignored.
    pub fn load_from_dir(base: &Path) -> Self {
        let config_path = base.join(CONFIG_FILE);
        if !config_path.exists() {
            return Self::default();
        }
        match Self::load(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(
                    path = %config_path.display(),
                    error = %err,
                    "ignoring invalid config, using defaults"
                );
                Self::default()
            }
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> crate::error::Result<()> {
        let content = toml::to_string_pretty(self)?;
        crate::lock::write_atomic(path, content.as_bytes())?;
        Ok(())
    }

    fn validate(&self) -> crate::error::Result<()> {
        if self.backup.keep_days == 0 {
            return Err(crate::error::Error::InvalidConfig(
                "backup.keep_days must be >= 1".to_string(),
            ));
        }
        if self.backup.keep_days > MAX_KEEP_DAYS {
            return Err(crate::error::Error::InvalidConfig(format!(
                "backup.keep_days must be <= {MAX_KEEP_DAYS}"
            )));
        }
        if self.writes.debounce_ms > 60_000 {
            return Err(crate::error::Error::InvalidConfig(
                "writes.debounce_ms must be <= 60000".to_string(),
            ));
        }
        if self.reminders.min_lead_secs > MAX_MIN_LEAD_SECS {
            return Err(crate::error::Error::InvalidConfig(format!(
                "reminders.min_lead_secs must be <= {MAX_MIN_LEAD_SECS}"
            )));
        }
        Ok(())
    }
}
