//! Preferences slot
//!
//! A small key-value file (`<base>/preferences.json`) that lives outside the
//! document store so settings can be read before the store initializes.
//! Values are arbitrary JSON; the file is always plain, pretty-printed JSON.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::lock;
use crate::settings::AppSettings;

/// File name of the slot inside the base directory
pub const PREFS_FILE: &str = "preferences.json";

/// Well-known keys
pub mod keys {
    pub const APP_SETTINGS: &str = "app-settings";
    pub const FIRST_LAUNCH: &str = "first-launch";
}

#[derive(Debug, Clone)]
pub struct Preferences {
    path: PathBuf,
}

impl Preferences {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Slot for a base directory (`<base>/preferences.json`)
    pub fn for_base(base: &Path) -> Self {
        Self::new(base.join(PREFS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Map<String, Value>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(err) => return Err(Error::Io(err)),
        };
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(Error::CorruptDocument {
                name: PREFS_FILE.to_string(),
                reason: "expected a JSON object".to_string(),
            }),
            Err(err) => Err(Error::CorruptDocument {
                name: PREFS_FILE.to_string(),
                reason: err.to_string(),
            }),
        }
    }

    fn write_all(&self, map: Map<String, Value>) -> Result<()> {
        let content = serde_json::to_string_pretty(&Value::Object(map))?;
        lock::write_atomic(&self.path, content.as_bytes())
    }

    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.read_all()?.remove(key))
    }

    pub fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut map = self.read_all()?;
        map.insert(key.to_string(), value);
        self.write_all(map)?;
        tracing::debug!(key, "stored preference");
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        let mut map = self.read_all()?;
        if map.remove(key).is_some() {
            self.write_all(map)?;
        }
        Ok(())
    }

    // =========================================================================
    // Settings
    // =========================================================================

    /// Load settings merged over defaults.
    ///
    /// A stored value that no longer parses (say, an unknown language code)
    /// is logged and replaced by defaults rather than failing startup.
    pub fn settings(&self) -> Result<AppSettings> {
        let Some(stored) = self.get(keys::APP_SETTINGS)? else {
            return Ok(AppSettings::default());
        };
        match AppSettings::from_stored(&stored) {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::warn!(error = %err, "stored settings are invalid, using defaults");
                Ok(AppSettings::default())
            }
        }
    }

    /// Raw stored settings value, or `{}` when none were saved.
    pub fn settings_value(&self) -> Result<Value> {
        Ok(self
            .get(keys::APP_SETTINGS)?
            .unwrap_or_else(|| Value::Object(Map::new())))
    }

    pub fn save_settings(&self, settings: &AppSettings) -> Result<()> {
        self.set(keys::APP_SETTINGS, serde_json::to_value(settings)?)
    }

    /// Load, modify and save settings in one step.
    pub fn update_settings<F>(&self, update: F) -> Result<AppSettings>
    where
        F: FnOnce(&mut AppSettings) -> Result<()>,
    {
        let mut settings = self.settings()?;
        update(&mut settings)?;
        self.save_settings(&settings)?;
        Ok(settings)
    }

    /// True until onboarding stores `first-launch = "false"`.
    pub fn is_first_launch(&self) -> Result<bool> {
        Ok(match self.get(keys::FIRST_LAUNCH)? {
            Some(Value::String(flag)) => flag != "false",
            Some(Value::Bool(flag)) => flag,
            _ => true,
        })
    }

    pub fn set_first_launch(&self, value: bool) -> Result<()> {
        self.set(keys::FIRST_LAUNCH, Value::String(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Language;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn missing_slot_reads_as_defaults() {
        let temp = TempDir::new().unwrap();
        let prefs = Preferences::for_base(temp.path());

        assert_eq!(prefs.settings().unwrap(), AppSettings::default());
        assert!(prefs.is_first_launch().unwrap());
        assert_eq!(prefs.settings_value().unwrap(), json!({}));
    }

    #[test]
    fn keys_are_independent() {
        let temp = TempDir::new().unwrap();
        let prefs = Preferences::for_base(temp.path());

        prefs.set_first_launch(false).unwrap();
        prefs
            .update_settings(|s| {
                s.language = Language::Fr;
                Ok(())
            })
            .unwrap();

        assert!(!prefs.is_first_launch().unwrap());
        assert_eq!(prefs.settings().unwrap().language, Language::Fr);

        prefs.remove(keys::FIRST_LAUNCH).unwrap();
        assert!(prefs.is_first_launch().unwrap());
        assert_eq!(prefs.settings().unwrap().language, Language::Fr);
    }

    #[test]
    fn failed_update_does_not_persist() {
        let temp = TempDir::new().unwrap();
        let prefs = Preferences::for_base(temp.path());

        let result = prefs.update_settings(|s| s.set_pin(Some("12".to_string())));
        assert!(result.is_err());
        assert!(prefs.get(keys::APP_SETTINGS).unwrap().is_none());
    }

    #[test]
    fn invalid_stored_settings_fall_back_to_defaults() {
        let temp = TempDir::new().unwrap();
        let prefs = Preferences::for_base(temp.path());
        prefs
            .set(keys::APP_SETTINGS, json!({"language": "xx"}))
            .unwrap();

        assert_eq!(prefs.settings().unwrap(), AppSettings::default());
    }

    #[test]
    fn non_object_slot_is_corrupt() {
        let temp = TempDir::new().unwrap();
        let prefs = Preferences::for_base(temp.path());
        fs::write(prefs.path(), "[1, 2]").unwrap();

        assert!(matches!(
            prefs.get(keys::APP_SETTINGS),
            Err(Error::CorruptDocument { .. })
        ));
    }
}
