//! Wiring for one base directory
//!
//! [`App`] reads `blacklock.toml` and builds the store, preferences slot,
//! repository, backup manager and transfer service that share it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::backup::BackupManager;
use crate::cache::AppCache;
use crate::config::Config;
use crate::error::Result;
use crate::legacy::{self, MigrationReport};
use crate::prefs::Preferences;
use crate::queue::WriteQueue;
use crate::reminders::ReminderScheduler;
use crate::repository::Repository;
use crate::store::DocumentStore;
use crate::transfer::Transfer;

/// What [`App::initialize`] did
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitReport {
    pub created: bool,
    pub migration: Option<MigrationReport>,
    pub seeded_categories: usize,
}

#[derive(Debug, Clone)]
pub struct App {
    pub base: PathBuf,
    pub config: Config,
    pub store: DocumentStore,
    pub prefs: Preferences,
    pub repo: Repository,
    pub backups: BackupManager,
}

impl App {
    /// Build the services for `base` without touching the disk beyond
    /// reading the config file.
    pub fn open(base: &Path) -> Self {
        let config = Config::load_from_dir(base);
        Self::with_config(base, config)
    }

    pub fn with_config(base: &Path, config: Config) -> Self {
        let store = DocumentStore::for_base(base).with_compression(config.storage.compress);
        let prefs = Preferences::for_base(base);
        let repo = Repository::new(store.clone()).with_min_lead_secs(config.reminders.min_lead_secs);
        let backups = BackupManager::new(store.clone(), prefs.clone())
            .with_keep_days(config.backup.keep_days)
            .with_snapshot_before_restore(config.backup.snapshot_before_restore);
        Self {
            base: base.to_path_buf(),
            config,
            store,
            prefs,
            repo,
            backups,
        }
    }

    /// Attach a reminder scheduler to the repository.
    pub fn with_scheduler(mut self, scheduler: Arc<dyn ReminderScheduler>) -> Self {
        self.repo = self.repo.with_scheduler(scheduler);
        self
    }

    /// Route repository writes through a debounced [`WriteQueue`] using
    /// `writes.debounce_ms`. Backups and imports flush it first.
    pub fn with_write_queue(mut self) -> Self {
        let debounce = Duration::from_millis(self.config.writes.debounce_ms);
        let queue = WriteQueue::with_debounce(self.store.clone(), debounce);
        self.repo = self.repo.with_write_queue(queue.clone());
        self.backups = self.backups.with_write_queue(queue);
        self
    }

    /// Create directories, migrate a legacy database and seed default
    /// categories. Safe to call on every start.
    pub fn initialize(&self) -> Result<InitReport> {
        let created = !self.store.is_initialized();
        self.store.init()?;
        let migration = legacy::migrate(&self.base, &self.store)?;
        let seeded_categories = self.repo.seed_default_categories()?;
        if created {
            tracing::info!(base = %self.base.display(), "initialized store");
        }
        Ok(InitReport {
            created,
            migration,
            seeded_categories,
        })
    }

    pub fn transfer(&self) -> Transfer {
        Transfer::new(self.repo.clone(), self.backups.clone(), self.prefs.clone())
    }

    pub fn cache(&self) -> Result<AppCache> {
        AppCache::load(&self.repo, &self.prefs)
    }
}
