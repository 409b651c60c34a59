//! blacklock init, migrate and status commands

use std::path::PathBuf;

use crate::app::App;
use crate::backup::StorageStats;
use crate::config::{Config, CONFIG_FILE};
use crate::error::{Error, Result};
use crate::legacy::{self, MigrationReport};
use crate::output::{emit_success, HumanOutput, OutputOptions};

#[derive(serde::Serialize)]
struct InitOutput {
    base: PathBuf,
    created: InitCreated,
    seeded_categories: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    migration: Option<MigrationReport>,
}

#[derive(serde::Serialize)]
struct InitCreated {
    store: bool,
    config: bool,
}

pub fn run_init(app: &App, output: OutputOptions) -> Result<()> {
    let report = app.initialize()?;
    let created_config = ensure_config(app)?;

    let out = InitOutput {
        base: app.base.clone(),
        created: InitCreated {
            store: report.created,
            config: created_config,
        },
        seeded_categories: report.seeded_categories,
        migration: report.migration,
    };

    let mut created_items = Vec::new();
    if out.created.store {
        created_items.push("blacklock/");
    }
    if created_config {
        created_items.push(CONFIG_FILE);
    }

    let header = if created_items.is_empty() && out.seeded_categories == 0 && out.migration.is_none() {
        "blacklock init: nothing to do".to_string()
    } else {
        "blacklock init: initialized data directory".to_string()
    };

    let mut human = HumanOutput::new(header);
    human.push_summary("base", app.base.display().to_string());
    human.push_summary(
        "created",
        if created_items.is_empty() {
            "none".to_string()
        } else {
            created_items.join(", ")
        },
    );
    human.push_summary("seeded categories", out.seeded_categories.to_string());
    if let Some(migration) = &out.migration {
        push_migration(&mut human, migration);
    }
    if app.repo.account()?.is_none() {
        human.push_next_step("blacklock account create <nickname>");
    }

    emit_success(output, "init", &out, Some(&human))
}

fn ensure_config(app: &App) -> Result<bool> {
    let config_path = app.base.join(CONFIG_FILE);
    if config_path.exists() {
        if !config_path.is_file() {
            return Err(Error::OperationFailed(format!(
                "{CONFIG_FILE} exists but is not a file: {}",
                config_path.display()
            )));
        }
        return Ok(false);
    }

    Config::default().save(&config_path)?;
    Ok(true)
}

#[derive(serde::Serialize)]
struct MigrateOutput {
    database: PathBuf,
    migrated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<MigrationReport>,
}

pub fn run_migrate(app: &App, output: OutputOptions) -> Result<()> {
    app.store.init()?;
    let database = legacy::legacy_db_path(&app.base);
    let report = legacy::migrate(&app.base, &app.store)?;

    let mut human = match &report {
        Some(report) => {
            let mut human = HumanOutput::new("blacklock migrate: legacy database converted");
            push_migration(&mut human, report);
            human
        }
        None => {
            let mut human = HumanOutput::new("blacklock migrate: nothing to migrate");
            human.push_summary("looked for", database.display().to_string());
            human
        }
    };
    if report.as_ref().is_some_and(|r| !r.documents_written) {
        human.push_warning("store already had tasks; legacy rows were not written");
    }

    let out = MigrateOutput {
        database,
        migrated: report.is_some(),
        report,
    };
    emit_success(output, "migrate", &out, Some(&human))
}

fn push_migration(human: &mut HumanOutput, report: &MigrationReport) {
    human.push_summary("schema version", report.schema_version.to_string());
    human.push_summary("account", if report.account { "yes" } else { "no" });
    human.push_summary("tasks", report.tasks.to_string());
    human.push_summary("categories", report.categories.to_string());
    if report.logs > 0 {
        human.push_summary("log entries", report.logs.to_string());
    }
    if report.skipped_rows > 0 {
        human.push_warning(format!("{} rows could not be converted", report.skipped_rows));
    }
    human.push_detail(format!("database renamed to {}", report.renamed_to.display()));
}

#[derive(serde::Serialize)]
struct StatusOutput {
    base: PathBuf,
    first_launch: bool,
    account: Option<AccountSummary>,
    tasks: TaskSummary,
    categories: usize,
    folders: usize,
    storage: StorageStats,
}

#[derive(serde::Serialize)]
struct AccountSummary {
    nickname: String,
    level: u32,
    experience: u64,
    rank: String,
}

#[derive(serde::Serialize)]
struct TaskSummary {
    open: usize,
    completed: usize,
}

pub fn run_status(app: &App, output: OutputOptions) -> Result<()> {
    let cache = app.cache()?;
    let storage = app.backups.stats()?;

    let out = StatusOutput {
        base: app.base.clone(),
        first_launch: cache.is_first_launch,
        account: cache.account.as_ref().map(|account| AccountSummary {
            nickname: account.nickname.clone(),
            level: account.level,
            experience: account.experience,
            rank: account.rank().to_string(),
        }),
        tasks: TaskSummary {
            open: cache.open_tasks().count(),
            completed: cache.completed_count(),
        },
        categories: cache.categories.len(),
        folders: cache.folders.len(),
        storage,
    };

    let mut human = HumanOutput::new("blacklock status");
    match &out.account {
        Some(account) => human.push_summary(
            "account",
            format!(
                "{} (level {}, {} xp, {})",
                account.nickname, account.level, account.experience, account.rank
            ),
        ),
        None => {
            human.push_summary("account", "none");
            human.push_next_step("blacklock account create <nickname>");
        }
    }
    human.push_summary(
        "tasks",
        format!("{} open, {} completed", out.tasks.open, out.tasks.completed),
    );
    human.push_summary("categories", out.categories.to_string());
    human.push_summary("folders", out.folders.to_string());
    human.push_summary(
        "storage",
        format!(
            "{} documents ({} bytes), {} backups ({} bytes)",
            storage.file_count, storage.total_size, storage.backup_count, storage.backup_size
        ),
    );

    emit_success(output, "status", &out, Some(&human))
}
