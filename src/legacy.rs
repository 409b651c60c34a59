//! One-shot migration from the SQLite database used by earlier releases
//!
//! Earlier releases kept everything in `blacklock.db` (schema versions 0-4,
//! tracked in `PRAGMA user_version`). Schema v2 added the current account and
//! task tables, v3 added categories and `tasks.categoryId`, v4 added
//! `tasks.color`. Data from before v2 was incompatible and was discarded by
//! those releases, so it migrates as empty. The `logs` table carries over
//! into the activity log.
//!
//! The database is opened read-only. Documents are written only when the
//! store has no task document yet; afterwards the database is renamed to
//! `blacklock.db.migrated` so the migration never runs twice.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use serde::Serialize;

use crate::error::Result;
use crate::models::{
    default_categories, level_for_experience, now_millis, Account, Category, Frequency, LogEntry,
    LogKind, Task, DEFAULT_EXPERIENCE_REWARD,
};
use crate::store::{documents, DocumentStore};

/// Legacy database file name inside the base directory
pub const LEGACY_DB: &str = "blacklock.db";

/// Suffix appended to the database once migrated
pub const MIGRATED_SUFFIX: &str = ".migrated";

/// First schema version whose rows are carried over
const FIRST_COMPATIBLE_VERSION: i64 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub schema_version: i64,
    pub account: bool,
    pub tasks: usize,
    pub categories: usize,
    pub logs: usize,
    /// Rows that could not be converted
    pub skipped_rows: usize,
    /// False when the store already had data and nothing was written
    pub documents_written: bool,
    pub renamed_to: PathBuf,
}

/// Path of the legacy database for a base directory
pub fn legacy_db_path(base: &Path) -> PathBuf {
    base.join(LEGACY_DB)
}

/// Whether a not-yet-migrated legacy database exists
pub fn has_legacy_db(base: &Path) -> bool {
    legacy_db_path(base).is_file()
}

#[derive(Debug, Default)]
struct LegacyRows {
    version: i64,
    account: Option<Account>,
    tasks: Vec<Task>,
    categories: Vec<Category>,
    logs: Vec<LogEntry>,
    skipped: usize,
}

/// Migrate `<base>/blacklock.db` into `store`, if present.
///
/// Returns `None` when there is no legacy database.
pub fn migrate(base: &Path, store: &DocumentStore) -> Result<Option<MigrationReport>> {
    let db_path = legacy_db_path(base);
    if !db_path.is_file() {
        return Ok(None);
    }

    let rows = {
        let conn = Connection::open_with_flags(&db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        read_rows(&conn)?
    };

    let documents_written = !store.exists(documents::TASKS)?;
    let categories = if rows.categories.is_empty() {
        default_categories()
    } else {
        rows.categories
    };
    if documents_written {
        let compress = store.compression_enabled();
        store.save(documents::ACCOUNT, &rows.account, compress)?;
        store.save(documents::CATEGORIES, &categories, compress)?;
        if !store.exists(documents::FOLDERS)? {
            store.save(documents::FOLDERS, &Vec::<()>::new(), compress)?;
        }
        if !rows.logs.is_empty() {
            store.save(documents::LOGS, &rows.logs, compress)?;
        }
        // Tasks last: their presence marks the store as migrated.
        store.save(documents::TASKS, &rows.tasks, compress)?;
    } else {
        tracing::warn!("store already has tasks, legacy rows not imported");
    }

    let mut renamed = db_path.clone().into_os_string();
    renamed.push(MIGRATED_SUFFIX);
    let renamed_to = PathBuf::from(renamed);
    fs::rename(&db_path, &renamed_to)?;

    tracing::info!(
        version = rows.version,
        tasks = rows.tasks.len(),
        categories = categories.len(),
        skipped = rows.skipped,
        written = documents_written,
        "migrated legacy database"
    );

    Ok(Some(MigrationReport {
        schema_version: rows.version,
        account: rows.account.is_some(),
        tasks: rows.tasks.len(),
        categories: categories.len(),
        logs: rows.logs.len(),
        skipped_rows: rows.skipped,
        documents_written,
        renamed_to,
    }))
}

fn read_rows(conn: &Connection) -> Result<LegacyRows> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    let mut rows = LegacyRows {
        version,
        ..LegacyRows::default()
    };

    if version < FIRST_COMPATIBLE_VERSION {
        tracing::info!(version, "legacy schema predates v2, nothing to carry over");
        return Ok(rows);
    }

    if table_exists(conn, "account")? {
        rows.account = read_account(conn)?;
    }
    if table_exists(conn, "tasks")? {
        let (tasks, skipped) = read_tasks(conn)?;
        rows.tasks = tasks;
        rows.skipped += skipped;
    }
    if table_exists(conn, "categories")? {
        let (categories, skipped) = read_categories(conn)?;
        rows.categories = categories;
        rows.skipped += skipped;
    }
    if table_exists(conn, "logs")? {
        let (logs, skipped) = read_logs(conn)?;
        rows.logs = logs;
        rows.skipped += skipped;
    }
    Ok(rows)
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn column_names(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(names)
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw?.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn read_account(conn: &Connection) -> Result<Option<Account>> {
    let row = conn
        .query_row(
            "SELECT id, nickname, name, avatar, characterType, experience, createdAt, updatedAt
             FROM account LIMIT 1",
            [],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, Option<String>>(7)?,
                ))
            },
        )
        .optional()?;

    let Some((id, nickname, name, avatar, character_type, experience, created, updated)) = row
    else {
        return Ok(None);
    };

    let now = now_millis();
    let experience = u64::try_from(experience).unwrap_or(0);
    let created_at = parse_timestamp(created.as_deref()).unwrap_or(now);
    Ok(Some(Account {
        id,
        nickname,
        name,
        avatar,
        character_type,
        level: level_for_experience(experience),
        experience,
        created_at,
        updated_at: parse_timestamp(updated.as_deref()).unwrap_or(created_at),
    }))
}

fn read_tasks(conn: &Connection) -> Result<(Vec<Task>, usize)> {
    let columns = column_names(conn, "tasks")?;
    let optional = |name: &str| {
        if columns.iter().any(|c| c == name) {
            name.to_string()
        } else {
            format!("NULL AS {name}")
        }
    };
    let sql = format!(
        "SELECT id, taskName, description, {}, {}, isCompleted, isRepeated, frequencyData,
                experienceReward, createdAt, updatedAt
         FROM tasks",
        optional("categoryId"),
        optional("color"),
    );

    let mut stmt = conn.prepare(&sql)?;
    let raw = stmt
        .query_map([], |row| {
            Ok(RawTask {
                id: row.get(0)?,
                task_name: row.get(1)?,
                description: row.get(2)?,
                category_id: row.get(3)?,
                color: row.get(4)?,
                is_completed: row.get(5)?,
                is_repeated: row.get(6)?,
                frequency_data: row.get(7)?,
                experience_reward: row.get(8)?,
                created_at: row.get(9)?,
                updated_at: row.get(10)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut tasks = Vec::with_capacity(raw.len());
    let mut skipped = 0;
    for row in raw {
        match row.into_task() {
            Some(task) => tasks.push(task),
            None => skipped += 1,
        }
    }
    Ok((tasks, skipped))
}

struct RawTask {
    id: Option<String>,
    task_name: Option<String>,
    description: Option<String>,
    category_id: Option<String>,
    color: Option<String>,
    is_completed: Option<i64>,
    is_repeated: Option<i64>,
    frequency_data: Option<String>,
    experience_reward: Option<i64>,
    created_at: Option<String>,
    updated_at: Option<String>,
}

impl RawTask {
    fn into_task(self) -> Option<Task> {
        let id = self.id.filter(|id| !id.is_empty())?;
        let task_name = self.task_name.filter(|name| !name.trim().is_empty())?;
        let now = now_millis();
        let created_at = parse_timestamp(self.created_at.as_deref()).unwrap_or(now);

        let frequency = self.frequency_data.as_deref().and_then(|raw| {
            match serde_json::from_str::<Frequency>(raw) {
                Ok(frequency) => Some(frequency),
                Err(err) => {
                    tracing::warn!(task = %id, error = %err, "dropping unreadable frequency");
                    None
                }
            }
        });

        Some(Task {
            description: self.description.unwrap_or_default(),
            category_id: self.category_id.filter(|c| !c.is_empty()),
            folder_id: None,
            color: self.color.filter(|c| !c.is_empty()),
            is_completed: self.is_completed.unwrap_or(0) != 0,
            is_repeated: self.is_repeated.unwrap_or(0) != 0,
            frequency,
            experience_reward: self
                .experience_reward
                .and_then(|xp| u32::try_from(xp).ok())
                .unwrap_or(DEFAULT_EXPERIENCE_REWARD),
            deadline: None,
            notification_minutes: None,
            order: None,
            updated_at: parse_timestamp(self.updated_at.as_deref()).unwrap_or(created_at),
            created_at,
            id,
            task_name,
        })
    }
}

fn read_categories(conn: &Connection) -> Result<(Vec<Category>, usize)> {
    let mut stmt =
        conn.prepare("SELECT id, name, icon, color, isDefault, createdAt, updatedAt FROM categories")?;
    let raw = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, Option<String>>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<i64>>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, Option<String>>(6)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let now = now_millis();
    let mut categories = Vec::with_capacity(raw.len());
    let mut skipped = 0;
    for (id, name, icon, color, is_default, created, updated) in raw {
        let (Some(id), Some(name), Some(icon), Some(color)) = (id, name, icon, color) else {
            skipped += 1;
            continue;
        };
        let created_at = parse_timestamp(created.as_deref()).unwrap_or(now);
        categories.push(Category {
            id,
            name,
            icon,
            color,
            is_default: is_default.unwrap_or(0) != 0,
            created_at,
            updated_at: parse_timestamp(updated.as_deref()).unwrap_or(created_at),
        });
    }
    Ok((categories, skipped))
}

/// Log rows, oldest first. Unknown types and unreadable timestamps skip
/// the row; malformed `data` is dropped but the entry kept.
fn read_logs(conn: &Connection) -> Result<(Vec<LogEntry>, usize)> {
    let mut stmt = conn.prepare("SELECT id, type, message, data, timestamp FROM logs")?;
    let raw = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, Option<String>>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut logs = Vec::with_capacity(raw.len());
    let mut skipped = 0;
    for (id, kind, message, data, timestamp) in raw {
        let kind = match kind.as_deref() {
            Some("error") => LogKind::Error,
            Some("warning") => LogKind::Warning,
            Some("analytics") => LogKind::Analytics,
            _ => {
                skipped += 1;
                continue;
            }
        };
        let (Some(id), Some(message), Some(timestamp)) =
            (id, message, parse_timestamp(timestamp.as_deref()))
        else {
            skipped += 1;
            continue;
        };
        logs.push(LogEntry {
            id,
            kind,
            message,
            data: data.and_then(|raw| serde_json::from_str(&raw).ok()),
            timestamp,
        });
    }
    logs.sort_by_key(|entry| entry.timestamp);
    Ok((logs, skipped))
}
