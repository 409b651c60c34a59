//! Backup manager
//!
//! A backup is one compressed JSON snapshot of every persisted slot:
//!
//! ```text
//! { "version": "1.0", "timestamp": <epoch ms>, "date": "<RFC 3339>",
//!   "data": { "tasks": [...], "account": {...} | null, "settings": {...},
//!             "categories": [...], "folders": [...] } }
//! ```
//!
//! Files are named `backup-YYYY-MM-DD-HH-MM-SS.json` (UTC), so name order is
//! chronological order and the timestamp of a listing comes from the name,
//! not from file metadata. Creation and restore hold `backups/.backup.lock`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec;
use crate::error::{Error, ImportIssue, Result};
use crate::lock::{self, FileLock, DEFAULT_LOCK_TIMEOUT_MS};
use crate::models::{Account, Category, Folder, Task};
use crate::prefs::{keys, Preferences};
use crate::queue::WriteQueue;
use crate::store::{documents, DocumentStore};

/// Format version written into every backup
pub const BACKUP_VERSION: &str = "1.0";

/// Backups older than this are removed after each new backup
pub const DEFAULT_KEEP_DAYS: u32 = 7;

const BACKUP_PREFIX: &str = "backup-";
const BACKUP_SUFFIX: &str = ".json";
const NAME_TIME_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";
const LOCK_FILE: &str = ".backup.lock";

/// One entry of [`BackupManager::list_backups`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupMetadata {
    pub filename: String,
    /// `YYYY-MM-DD HH:MM:SS` (UTC)
    pub date: String,
    /// Epoch milliseconds
    pub timestamp: i64,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    pub total_size: u64,
    pub file_count: usize,
    pub backup_count: usize,
    pub backup_size: u64,
}

/// The five slots captured by a backup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackupData {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub account: Option<Account>,
    #[serde(default = "empty_object")]
    pub settings: Value,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub folders: Vec<Folder>,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

/// A parsed backup file
#[derive(Debug, Clone, PartialEq)]
pub struct BackupFile {
    pub version: Value,
    pub timestamp: Option<i64>,
    pub date: Option<String>,
    pub data: BackupData,
}

/// Outcome of a restore or import
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreSummary {
    /// Backup taken of the previous state, if any
    pub snapshot: Option<String>,
    pub tasks: usize,
    pub categories: usize,
    pub folders: usize,
    pub has_account: bool,
}

/// Build the file name for a backup taken at `at`.
pub fn backup_file_name(at: DateTime<Utc>) -> String {
    format!("{BACKUP_PREFIX}{}{BACKUP_SUFFIX}", at.format(NAME_TIME_FORMAT))
}

/// Parse the UTC time out of a backup file name.
///
/// Returns `None` for anything that is not exactly a backup name, which
/// also rules out path separators and traversal.
pub fn parse_backup_name(name: &str) -> Option<DateTime<Utc>> {
    let stamp = name.strip_prefix(BACKUP_PREFIX)?.strip_suffix(BACKUP_SUFFIX)?;
    if stamp.len() != 19 || !stamp.bytes().all(|b| b.is_ascii_digit() || b == b'-') {
        return None;
    }
    NaiveDateTime::parse_from_str(stamp, NAME_TIME_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// List backups in `dir`, newest first.
pub fn scan_backups(dir: &Path) -> Result<Vec<BackupMetadata>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let pattern = format!(
        "{}/{BACKUP_PREFIX}*{BACKUP_SUFFIX}",
        glob::Pattern::escape(&dir.to_string_lossy())
    );
    let paths = glob::glob(&pattern)
        .map_err(|err| Error::OperationFailed(format!("invalid backup pattern: {err}")))?;

    let mut backups = Vec::new();
    for path in paths.filter_map(|entry| entry.ok()) {
        let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(at) = parse_backup_name(filename) else {
            continue;
        };
        let size = match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => meta.len(),
            Ok(_) => continue,
            Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
            Err(err) => return Err(Error::Io(err)),
        };
        backups.push(BackupMetadata {
            filename: filename.to_string(),
            date: at.format("%Y-%m-%d %H:%M:%S").to_string(),
            timestamp: at.timestamp_millis(),
            size,
        });
    }

    backups.sort_by(|a, b| b.filename.cmp(&a.filename));
    Ok(backups)
}

/// Parse backup file content (compressed or plain JSON).
pub fn parse_backup(content: &str) -> Result<BackupFile> {
    let (value, _) =
        codec::decode(content).map_err(|reason| Error::InvalidBackup(ImportIssue::NotJson(reason)))?;
    let Value::Object(mut object) = value else {
        return Err(Error::InvalidBackup(ImportIssue::Malformed(
            "expected a JSON object".to_string(),
        )));
    };

    let version = match object.remove("version") {
        Some(Value::Null) | None => return Err(Error::InvalidBackup(ImportIssue::MissingVersion)),
        Some(version) => version,
    };
    let data = match object.remove("data") {
        Some(Value::Null) | None => return Err(Error::InvalidBackup(ImportIssue::MissingData)),
        Some(data) => data,
    };
    let data: BackupData = serde_json::from_value(data)
        .map_err(|err| Error::InvalidBackup(ImportIssue::Malformed(err.to_string())))?;

    Ok(BackupFile {
        version,
        timestamp: object.get("timestamp").and_then(Value::as_i64),
        date: object
            .get("date")
            .and_then(Value::as_str)
            .map(str::to_string),
        data,
    })
}

/// Creates, lists, restores and prunes full-state backups
#[derive(Debug, Clone)]
pub struct BackupManager {
    store: DocumentStore,
    prefs: Preferences,
    keep_days: u32,
    snapshot_before_restore: bool,
    queue: Option<WriteQueue>,
}

impl BackupManager {
    pub fn new(store: DocumentStore, prefs: Preferences) -> Self {
        Self {
            store,
            prefs,
            keep_days: DEFAULT_KEEP_DAYS,
            snapshot_before_restore: true,
            queue: None,
        }
    }

    /// Retention window applied after each new backup
    pub fn with_keep_days(mut self, keep_days: u32) -> Self {
        self.keep_days = keep_days;
        self
    }

    pub fn with_snapshot_before_restore(mut self, enabled: bool) -> Self {
        self.snapshot_before_restore = enabled;
        self
    }

    /// Flush this queue before reading or overwriting slots.
    pub fn with_write_queue(mut self, queue: WriteQueue) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.store.backups_dir()
    }

    fn lock(&self) -> Result<FileLock> {
        FileLock::acquire(self.backups_dir().join(LOCK_FILE), DEFAULT_LOCK_TIMEOUT_MS)
    }

    fn flush_queue(&self) -> Result<()> {
        if let Some(queue) = &self.queue {
            queue.flush_now()?;
        }
        Ok(())
    }

    fn backup_path(&self, filename: &str) -> Result<PathBuf> {
        if parse_backup_name(filename).is_none() {
            return Err(Error::InvalidName(filename.to_string()));
        }
        Ok(self.backups_dir().join(filename))
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Snapshot every slot into a new backup and prune old ones.
    ///
    /// Returns the new backup's file name.
    pub fn create_backup(&self) -> Result<String> {
        fs::create_dir_all(self.backups_dir())?;
        let _lock = self.lock()?;
        self.create_backup_locked(None)
    }

    /// Write a backup while holding the lock. Retention never removes
    /// `spare`, the backup a restore is reading from.
    fn create_backup_locked(&self, spare: Option<&str>) -> Result<String> {
        self.flush_queue()?;

        let data = serde_json::json!({
            "tasks": self.store.load_value(documents::TASKS)?.unwrap_or_else(|| Value::Array(Vec::new())),
            "account": self.store.load_value(documents::ACCOUNT)?.unwrap_or(Value::Null),
            "settings": self.prefs.settings_value()?,
            "categories": self.store.load_value(documents::CATEGORIES)?.unwrap_or_else(|| Value::Array(Vec::new())),
            "folders": self.store.load_value(documents::FOLDERS)?.unwrap_or_else(|| Value::Array(Vec::new())),
        });

        let now = Utc::now();
        let mut at = now;
        let mut path = self.backups_dir().join(backup_file_name(at));
        while path.exists() {
            at += Duration::seconds(1);
            path = self.backups_dir().join(backup_file_name(at));
        }
        let filename = backup_file_name(at);

        let backup = serde_json::json!({
            "version": BACKUP_VERSION,
            "timestamp": now.timestamp_millis(),
            "date": now.to_rfc3339(),
            "data": data,
        });
        let content = codec::encode(&backup, true)?;
        lock::write_atomic(&path, content.as_bytes())?;
        tracing::info!(backup = %filename, bytes = content.len(), "backup created");

        self.prune(self.keep_days, spare)?;
        Ok(filename)
    }

    // =========================================================================
    // List / delete / prune
    // =========================================================================

    /// All backups, newest first
    pub fn list_backups(&self) -> Result<Vec<BackupMetadata>> {
        scan_backups(&self.backups_dir())
    }

    /// Remove a backup. Removing an absent backup is not an error.
    pub fn delete_backup(&self, filename: &str) -> Result<()> {
        let path = self.backup_path(filename)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(backup = filename, "backup deleted");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Error::Io(err)),
        }
    }

    /// Delete backups older than `keep_days`. Returns the deleted names.
    ///
    /// A window reaching past the earliest representable date keeps
    /// everything.
    pub fn clean_old_backups(&self, keep_days: u32) -> Result<Vec<String>> {
        self.prune(keep_days, None)
    }

    fn prune(&self, keep_days: u32, spare: Option<&str>) -> Result<Vec<String>> {
        let Some(cutoff) = Duration::try_days(i64::from(keep_days))
            .and_then(|window| Utc::now().checked_sub_signed(window))
        else {
            tracing::debug!(keep_days, "retention window out of range, keeping all backups");
            return Ok(Vec::new());
        };
        let cutoff_ms = cutoff.timestamp_millis();

        let mut deleted = Vec::new();
        for backup in self.list_backups()? {
            if backup.timestamp < cutoff_ms && Some(backup.filename.as_str()) != spare {
                self.delete_backup(&backup.filename)?;
                deleted.push(backup.filename);
            }
        }
        if !deleted.is_empty() {
            tracing::info!(count = deleted.len(), keep_days, "pruned old backups");
        }
        Ok(deleted)
    }

    // =========================================================================
    // Restore / import / export
    // =========================================================================

    /// Read and validate a managed backup.
    pub fn read_backup(&self, filename: &str) -> Result<BackupFile> {
        let path = self.backup_path(filename)?;
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(Error::BackupNotFound(filename.to_string()))
            }
            Err(err) => return Err(Error::Io(err)),
        };
        parse_backup(&content)
    }

    /// Replace every slot with the contents of a managed backup.
    ///
    /// The current state is backed up first unless disabled.
    pub fn restore_backup(&self, filename: &str) -> Result<RestoreSummary> {
        let backup = self.read_backup(filename)?;
        fs::create_dir_all(self.backups_dir())?;
        let _lock = self.lock()?;

        let snapshot = if self.snapshot_before_restore {
            Some(self.create_backup_locked(Some(filename))?)
        } else {
            self.flush_queue()?;
            None
        };

        let summary = self.write_slots(&backup.data, snapshot)?;
        tracing::info!(backup = filename, "backup restored");
        Ok(summary)
    }

    /// Copy a managed backup to `dest_dir`. Returns the destination path.
    pub fn export_backup(&self, filename: &str, dest_dir: &Path) -> Result<PathBuf> {
        let source = self.backup_path(filename)?;
        if !source.is_file() {
            return Err(Error::BackupNotFound(filename.to_string()));
        }
        fs::create_dir_all(dest_dir)?;
        let dest = dest_dir.join(filename);
        fs::copy(&source, &dest)?;
        tracing::info!(backup = filename, dest = %dest.display(), "backup exported");
        Ok(dest)
    }

    /// Restore from a backup file outside the managed directory.
    ///
    /// The file may be compressed or plain JSON. The current state is always
    /// backed up before anything is overwritten.
    pub fn import_backup(&self, path: &Path) -> Result<RestoreSummary> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(Error::BackupNotFound(path.display().to_string()))
            }
            Err(err) => return Err(Error::Io(err)),
        };
        let backup = parse_backup(&content)?;

        fs::create_dir_all(self.backups_dir())?;
        let _lock = self.lock()?;
        let snapshot = self.create_backup_locked(None)?;
        let summary = self.write_slots(&backup.data, Some(snapshot))?;
        tracing::info!(source = %path.display(), "backup imported");
        Ok(summary)
    }

    /// Overwrite all five slots. Callers hold the backup lock and have
    /// flushed the write queue.
    pub(crate) fn write_slots(
        &self,
        data: &BackupData,
        snapshot: Option<String>,
    ) -> Result<RestoreSummary> {
        self.store.save_all(
            &[
                (documents::TASKS, serde_json::to_value(&data.tasks)?),
                (documents::ACCOUNT, serde_json::to_value(&data.account)?),
                (documents::CATEGORIES, serde_json::to_value(&data.categories)?),
                (documents::FOLDERS, serde_json::to_value(&data.folders)?),
            ],
            self.store.compression_enabled(),
        )?;
        let settings = if data.settings.is_object() {
            data.settings.clone()
        } else {
            empty_object()
        };
        self.prefs.set(keys::APP_SETTINGS, settings)?;

        Ok(RestoreSummary {
            snapshot,
            tasks: data.tasks.len(),
            categories: data.categories.len(),
            folders: data.folders.len(),
            has_account: data.account.is_some(),
        })
    }

    /// Take the backup lock and snapshot, then overwrite the slots.
    pub(crate) fn replace_all(&self, data: &BackupData) -> Result<RestoreSummary> {
        fs::create_dir_all(self.backups_dir())?;
        let _lock = self.lock()?;
        let snapshot = self.create_backup_locked(None)?;
        self.write_slots(data, Some(snapshot))
    }

    // =========================================================================
    // Stats
    // =========================================================================

    pub fn stats(&self) -> Result<StorageStats> {
        self.store.stats()
    }
}

impl DocumentStore {
    /// Sizes and counts of documents and backups
    pub fn stats(&self) -> Result<StorageStats> {
        let files = self.list()?;
        let mut total_size = 0;
        for file in &files {
            total_size += self.file_size(file)?;
        }
        let backups = scan_backups(&self.backups_dir())?;
        Ok(StorageStats {
            total_size,
            file_count: files.len(),
            backup_count: backups.len(),
            backup_size: backups.iter().map(|b| b.size).sum(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use tempfile::TempDir;

    fn manager() -> (TempDir, BackupManager) {
        let temp = TempDir::new().unwrap();
        let store = DocumentStore::for_base(temp.path());
        store.init().unwrap();
        let prefs = Preferences::for_base(temp.path());
        (temp, BackupManager::new(store, prefs))
    }

    #[test]
    fn names_round_trip_through_parse() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let name = backup_file_name(at);
        assert_eq!(name, "backup-2024-03-09-07-05-01.json");
        assert_eq!(parse_backup_name(&name), Some(at));
    }

    #[test]
    fn non_backup_names_do_not_parse() {
        for name in [
            "backup-2024-03-09.json",
            "../backup-2024-03-09-07-05-01.json",
            "backup-2024-13-09-07-05-01.json",
            "tasks.json",
            "backup-2024-03-09-07-05-01.json.bak",
        ] {
            assert!(parse_backup_name(name).is_none(), "{name}");
        }
    }

    #[test]
    fn empty_store_backs_up_empty_collections() {
        let (_temp, manager) = manager();
        let name = manager.create_backup().unwrap();

        let backup = manager.read_backup(&name).unwrap();
        assert_eq!(backup.version, json!("1.0"));
        assert!(backup.data.tasks.is_empty());
        assert!(backup.data.account.is_none());
        assert_eq!(backup.data.settings, json!({}));
    }

    #[test]
    fn backups_in_the_same_second_get_distinct_names() {
        let (_temp, manager) = manager();
        let first = manager.create_backup().unwrap();
        let second = manager.create_backup().unwrap();
        let third = manager.create_backup().unwrap();

        assert_ne!(first, second);
        assert_ne!(second, third);
        assert_eq!(manager.list_backups().unwrap().len(), 3);
    }

    #[test]
    fn listing_is_newest_first_with_times_from_names() {
        let (_temp, manager) = manager();
        let dir = manager.backups_dir();
        let now = Utc::now();
        let older = backup_file_name(now - Duration::days(1));
        let newer = backup_file_name(now - Duration::hours(1));
        fs::write(dir.join(&older), "x").unwrap();
        fs::write(dir.join(&newer), "xy").unwrap();
        fs::write(dir.join("notes.json"), "{}").unwrap();

        let listed = manager.list_backups().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].filename, newer);
        assert_eq!(listed[0].size, 2);
        assert_eq!(
            listed[1].timestamp,
            parse_backup_name(&older).unwrap().timestamp_millis()
        );
        assert_eq!(listed[1].date.len(), "YYYY-MM-DD HH:MM:SS".len());
    }

    #[test]
    fn retention_removes_only_old_backups() {
        let (_temp, manager) = manager();
        let dir = manager.backups_dir();
        let now = Utc::now();
        let stale = backup_file_name(now - Duration::days(10));
        let recent = backup_file_name(now - Duration::days(2));
        fs::write(dir.join(&stale), "x").unwrap();
        fs::write(dir.join(&recent), "x").unwrap();

        let deleted = manager.clean_old_backups(7).unwrap();
        assert_eq!(deleted, vec![stale]);
        let remaining: Vec<_> = manager
            .list_backups()
            .unwrap()
            .into_iter()
            .map(|b| b.filename)
            .collect();
        assert_eq!(remaining, vec![recent]);
    }

    #[test]
    fn create_prunes_with_configured_window() {
        let (_temp, manager) = manager();
        let manager = manager.with_keep_days(1);
        let stale = backup_file_name(Utc::now() - Duration::days(2));
        fs::write(manager.backups_dir().join(&stale), "x").unwrap();

        manager.create_backup().unwrap();
        let names: Vec<_> = manager
            .list_backups()
            .unwrap()
            .into_iter()
            .map(|b| b.filename)
            .collect();
        assert_eq!(names.len(), 1);
        assert!(!names.contains(&stale));
    }

    #[test]
    fn delete_is_idempotent_and_validates_names() {
        let (_temp, manager) = manager();
        let name = manager.create_backup().unwrap();
        manager.delete_backup(&name).unwrap();
        manager.delete_backup(&name).unwrap();
        assert!(manager.list_backups().unwrap().is_empty());

        assert!(matches!(
            manager.delete_backup("../tasks.json"),
            Err(Error::InvalidName(_))
        ));
    }

    #[test]
    fn restore_missing_backup_is_not_found() {
        let (_temp, manager) = manager();
        let err = manager
            .restore_backup("backup-2020-01-01-00-00-00.json")
            .unwrap_err();
        assert!(matches!(err, Error::BackupNotFound(_)));
    }

    #[test]
    fn parse_rejects_payloads_with_reasons() {
        let cases = [
            ("not json at all", "not a JSON document"),
            (r#"{"data": {}}"#, "missing 'version' field"),
            (r#"{"version": "1.0"}"#, "missing 'data' field"),
            (r#"{"version": "1.0", "data": {"tasks": 5}}"#, "malformed payload"),
        ];
        for (content, expected) in cases {
            match parse_backup(content) {
                Err(Error::InvalidBackup(issue)) => {
                    assert!(issue.to_string().contains(expected), "{content}: {issue}")
                }
                other => panic!("{content}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn plain_json_backups_parse() {
        let backup = parse_backup(r#"{"version": 1, "data": {"account": null}}"#).unwrap();
        assert_eq!(backup.version, json!(1));
        assert!(backup.data.folders.is_empty());
        assert_eq!(backup.data.settings, json!({}));
    }

    #[test]
    fn export_copies_outside_the_managed_dir() {
        let (temp, manager) = manager();
        let name = manager.create_backup().unwrap();
        let dest = manager
            .export_backup(&name, &temp.path().join("exports"))
            .unwrap();

        assert!(dest.is_file());
        assert_eq!(
            fs::read(&dest).unwrap(),
            fs::read(manager.backups_dir().join(&name)).unwrap()
        );
    }

    #[test]
    fn stats_count_documents_and_backups() {
        let (_temp, manager) = manager();
        manager
            .store()
            .save(documents::TASKS, &json!([]), true)
            .unwrap();
        manager.create_backup().unwrap();

        let stats = manager.stats().unwrap();
        assert_eq!(stats.file_count, 1);
        assert_eq!(stats.backup_count, 1);
        assert!(stats.total_size > 0);
        assert!(stats.backup_size > 0);
    }
}
