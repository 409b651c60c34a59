//! Application settings
//!
//! Settings are a single JSON object stored in the preferences slot under
//! `app-settings`. Stored objects are merged over [`AppSettings::default`],
//! so settings written by older versions gain new fields automatically.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Uk,
    Ru,
    Es,
    Fr,
    De,
    Zh,
    Ja,
    Hi,
    Ar,
    Pt,
    Id,
    Bn,
    Ur,
    Az,
    Tr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    #[default]
    Dark,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeColor {
    #[default]
    Blue,
    Purple,
    Green,
    Orange,
    Red,
    Pink,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Theme {
    pub mode: ThemeMode,
    pub color: ThemeColor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationFrequency {
    #[default]
    Instant,
    Hourly,
    Daily,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    pub enabled: bool,
    pub frequency: NotificationFrequency,
    pub task_reminders: bool,
    pub level_up_notifications: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            frequency: NotificationFrequency::Instant,
            task_reminders: true,
            level_up_notifications: true,
        }
    }
}

/// Focus timer durations (minutes) and auto-start flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PomodoroSettings {
    pub work_duration: u32,
    pub short_break_duration: u32,
    pub long_break_duration: u32,
    pub sessions_before_long_break: u32,
    pub auto_start_breaks: bool,
    pub auto_start_work: bool,
}

impl Default for PomodoroSettings {
    fn default() -> Self {
        Self {
            work_duration: 25,
            short_break_duration: 5,
            long_break_duration: 15,
            sessions_before_long_break: 4,
            auto_start_breaks: false,
            auto_start_work: false,
        }
    }
}

impl PomodoroSettings {
    pub fn validate(&self) -> Result<()> {
        for (field, minutes) in [
            ("workDuration", self.work_duration),
            ("shortBreakDuration", self.short_break_duration),
            ("longBreakDuration", self.long_break_duration),
        ] {
            if minutes == 0 || minutes > 24 * 60 {
                return Err(Error::InvalidArgument(format!(
                    "{field} must be between 1 and 1440 minutes"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderView {
    #[default]
    List,
    Grid,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub language: Language,
    pub theme: Theme,
    pub notifications: NotificationSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_completion_pin: Option<String>,
    pub pomodoro_settings: PomodoroSettings,
    pub folder_view: FolderView,
}

impl AppSettings {
    /// Merge a stored settings object over the defaults.
    ///
    /// Nested objects merge key by key; a key that is present but `null`
    /// keeps the default.
    pub fn from_stored(stored: &Value) -> Result<Self> {
        let mut merged = serde_json::to_value(Self::default())?;
        merge_over(&mut merged, stored);
        let settings: AppSettings = serde_json::from_value(merged)?;
        if let Some(pin) = &settings.task_completion_pin {
            validate_pin(pin)?;
        }
        Ok(settings)
    }

    /// Set or clear the task-completion PIN.
    pub fn set_pin(&mut self, pin: Option<String>) -> Result<()> {
        if let Some(pin) = &pin {
            validate_pin(pin)?;
        }
        self.task_completion_pin = pin;
        Ok(())
    }

    /// Check an entered PIN. Always passes when no PIN is set.
    pub fn pin_matches(&self, entered: &str) -> bool {
        match &self.task_completion_pin {
            Some(pin) => pin == entered,
            None => true,
        }
    }
}

/// A PIN is exactly four ASCII digits.
pub fn validate_pin(pin: &str) -> Result<()> {
    if pin.len() == 4 && pin.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(Error::InvalidArgument(
            "PIN must be exactly 4 digits".to_string(),
        ))
    }
}

fn merge_over(base: &mut Value, overlay: &Value) {
    let (Value::Object(base), Value::Object(overlay)) = (base, overlay) else {
        return;
    };
    for (key, value) in overlay {
        if value.is_null() {
            continue;
        }
        match base.get_mut(key) {
            Some(existing) if existing.is_object() && value.is_object() => {
                merge_over(existing, value)
            }
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}
