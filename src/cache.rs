//! In-memory snapshot of the persisted state
//!
//! The cache is explicit: it is loaded once and callers reload the slices
//! they mutated. Nothing here writes to disk.

use serde::Serialize;

use crate::error::Result;
use crate::models::{Account, Category, Folder, Rank, Task};
use crate::prefs::Preferences;
use crate::repository::Repository;
use crate::settings::AppSettings;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppCache {
    pub account: Option<Account>,
    pub tasks: Vec<Task>,
    pub categories: Vec<Category>,
    pub folders: Vec<Folder>,
    pub settings: AppSettings,
    pub is_first_launch: bool,
}

impl AppCache {
    pub fn load(repo: &Repository, prefs: &Preferences) -> Result<Self> {
        Ok(Self {
            account: repo.account()?,
            tasks: repo.tasks()?,
            categories: repo.categories()?,
            folders: repo.folders()?,
            settings: prefs.settings()?,
            is_first_launch: prefs.is_first_launch()?,
        })
    }

    pub fn reload_account(&mut self, repo: &Repository) -> Result<()> {
        self.account = repo.account()?;
        Ok(())
    }

    pub fn reload_tasks(&mut self, repo: &Repository) -> Result<()> {
        self.tasks = repo.tasks()?;
        Ok(())
    }

    pub fn reload_categories(&mut self, repo: &Repository) -> Result<()> {
        self.categories = repo.categories()?;
        Ok(())
    }

    pub fn reload_folders(&mut self, repo: &Repository) -> Result<()> {
        self.folders = repo.folders()?;
        Ok(())
    }

    pub fn reload_settings(&mut self, prefs: &Preferences) -> Result<()> {
        self.settings = prefs.settings()?;
        self.is_first_launch = prefs.is_first_launch()?;
        Ok(())
    }

    pub fn open_tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|task| !task.is_completed)
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|task| task.is_completed).count()
    }

    /// Lookup by id; dangling ids yield `None`.
    pub fn category(&self, id: Option<&str>) -> Option<&Category> {
        let id = id?;
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn folder(&self, id: Option<&str>) -> Option<&Folder> {
        let id = id?;
        self.folders.iter().find(|f| f.id == id)
    }

    pub fn rank(&self) -> Option<Rank> {
        self.account.as_ref().map(Account::rank)
    }
}
