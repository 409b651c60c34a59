//! Data export and import
//!
//! Export writes one pretty JSON document holding the whole user state:
//!
//! ```text
//! { "version": 1, "exportDate": "<RFC 3339>", "account": {...} | null,
//!   "tasks": [...], "categories": [...], "folders": [...], "settings": {...} }
//! ```
//!
//! Import accepts that shape and the older
//! `{ "version", "exportDate", "data": { "account", "tasks", "categories" } }`
//! shape, whose category list only carried user categories. Import always
//! backs up the current state first.

use std::fs;
use std::io;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backup::{BackupData, BackupManager, RestoreSummary};
use crate::error::{Error, ImportIssue, Result};
use crate::lock;
use crate::models::{default_categories, Account, Category, Folder, Task};
use crate::prefs::Preferences;
use crate::repository::Repository;
use crate::settings::AppSettings;

/// Version written by [`Transfer::export_data`]
pub const EXPORT_VERSION: u32 = 1;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportPayload {
    version: u32,
    export_date: String,
    account: Option<Account>,
    tasks: Vec<Task>,
    categories: Vec<Category>,
    folders: Vec<Folder>,
    settings: AppSettings,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportPayload {
    account: Option<Account>,
    #[serde(default)]
    tasks: Vec<Task>,
    #[serde(default)]
    categories: Vec<Category>,
    #[serde(default)]
    folders: Vec<Folder>,
    #[serde(default)]
    settings: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct LegacyData {
    #[serde(default)]
    account: Option<Account>,
    #[serde(default)]
    tasks: Vec<Task>,
    #[serde(default)]
    categories: Vec<Category>,
}

/// Export/import over a repository and its backup manager
#[derive(Debug, Clone)]
pub struct Transfer {
    repo: Repository,
    backups: BackupManager,
    prefs: Preferences,
}

impl Transfer {
    pub fn new(repo: Repository, backups: BackupManager, prefs: Preferences) -> Self {
        Self {
            repo,
            backups,
            prefs,
        }
    }

    /// Serialize the whole user state as pretty JSON.
    pub fn export_data(&self) -> Result<String> {
        let payload = ExportPayload {
            version: EXPORT_VERSION,
            export_date: Utc::now().to_rfc3339(),
            account: self.repo.account()?,
            tasks: self.repo.tasks()?,
            categories: self.repo.categories()?,
            folders: self.repo.folders()?,
            settings: self.prefs.settings()?,
        };
        Ok(serde_json::to_string_pretty(&payload)?)
    }

    /// Replace the user state with an exported document.
    ///
    /// Nothing is written unless the whole document validates.
    pub fn import_data(&self, json: &str) -> Result<RestoreSummary> {
        let value: Value = serde_json::from_str(json)
            .map_err(|err| Error::InvalidBackup(ImportIssue::NotJson(err.to_string())))?;
        let data = self.parse_import(value)?;

        self.repo.flush()?;
        let summary = self.backups.replace_all(&data)?;
        tracing::info!(
            tasks = summary.tasks,
            categories = summary.categories,
            folders = summary.folders,
            "data imported"
        );
        Ok(summary)
    }

    fn parse_import(&self, value: Value) -> Result<BackupData> {
        let Value::Object(object) = value else {
            return Err(malformed("expected a JSON object"));
        };
        if object.get("version").map_or(true, Value::is_null) {
            return Err(Error::InvalidBackup(ImportIssue::MissingVersion));
        }

        if !object.contains_key("account") {
            if let Some(data) = object.get("data").filter(|d| d.is_object()) {
                return self.parse_legacy(data.clone());
            }
            return Err(Error::InvalidBackup(ImportIssue::MissingAccount));
        }

        let payload: ImportPayload = serde_json::from_value(Value::Object(object))
            .map_err(|err| malformed(&err.to_string()))?;

        let settings = match payload.settings {
            Some(settings @ Value::Object(_)) => {
                AppSettings::from_stored(&settings).map_err(|err| malformed(&err.to_string()))?;
                settings
            }
            _ => self.prefs.settings_value()?,
        };

        Ok(BackupData {
            tasks: payload.tasks,
            account: payload.account.map(normalized),
            settings,
            categories: payload.categories,
            folders: payload.folders,
        })
    }

    fn parse_legacy(&self, data: Value) -> Result<BackupData> {
        let legacy: LegacyData =
            serde_json::from_value(data).map_err(|err| malformed(&err.to_string()))?;

        // Old exports left out the built-in categories; keep the current ones.
        let mut categories: Vec<Category> = self
            .repo
            .categories()?
            .into_iter()
            .filter(|c| c.is_default)
            .collect();
        if categories.is_empty() {
            categories = default_categories();
        }
        categories.extend(legacy.categories.into_iter().map(|mut c| {
            c.is_default = false;
            c
        }));

        Ok(BackupData {
            tasks: legacy.tasks,
            account: legacy.account.map(normalized),
            settings: self.prefs.settings_value()?,
            categories,
            folders: self.repo.folders()?,
        })
    }

    pub fn export_to_file(&self, path: &Path) -> Result<()> {
        let json = self.export_data()?;
        lock::write_atomic(path, json.as_bytes())?;
        tracing::info!(path = %path.display(), "data exported");
        Ok(())
    }

    pub fn import_from_file(&self, path: &Path) -> Result<RestoreSummary> {
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(Error::InvalidArgument(format!(
                    "import file not found: {}",
                    path.display()
                )))
            }
            Err(err) => return Err(Error::Io(err)),
        };
        self.import_data(&json)
    }
}

fn malformed(reason: &str) -> Error {
    Error::InvalidBackup(ImportIssue::Malformed(reason.to_string()))
}

fn normalized(mut account: Account) -> Account {
    account.normalize_level();
    account
}
