//! Domain repository
//!
//! CRUD for the account, tasks, categories and folders on top of the
//! document store, plus an append-only activity log. Every mutation loads the collection, changes a copy and
//! writes the whole document back; a failure anywhere leaves the persisted
//! collection as it was.
//!
//! When a [`WriteQueue`] is attached, writes are debounced and reads prefer
//! the queued value over the document on disk.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::{
    default_categories, now_millis, required_text, validate_color, Account, AccountPatch, Category,
    CategoryPatch, Folder, FolderPatch, LogEntry, LogKind, NewAccount, NewCategory, NewFolder,
    NewTask, Patch, Task, TaskPatch,
};
use crate::queue::WriteQueue;
use crate::reminders::{self, NoopScheduler, ReminderScheduler, DEFAULT_MIN_LEAD_SECS};
use crate::store::{documents, DocumentStore};

/// Entries kept in the activity log; older ones are dropped on append.
pub const MAX_LOG_ENTRIES: usize = 500;

/// Entries returned by [`Repository::logs`] when no limit is given.
pub const DEFAULT_LOG_LIMIT: usize = 100;

/// Result of completing a task
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    pub task: Task,
    pub experience_gained: u64,
    pub level_before: u32,
    pub level_after: u32,
    pub leveled_up: bool,
}

/// Repository over one document store
#[derive(Clone)]
pub struct Repository {
    store: DocumentStore,
    queue: Option<WriteQueue>,
    scheduler: Arc<dyn ReminderScheduler>,
    min_lead_secs: u64,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("store", &self.store)
            .field("queued", &self.queue.is_some())
            .field("min_lead_secs", &self.min_lead_secs)
            .finish()
    }
}

impl Repository {
    pub fn new(store: DocumentStore) -> Self {
        Self {
            store,
            queue: None,
            scheduler: Arc::new(NoopScheduler),
            min_lead_secs: DEFAULT_MIN_LEAD_SECS,
        }
    }

    /// Route writes through a debouncing queue.
    pub fn with_write_queue(mut self, queue: WriteQueue) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn ReminderScheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_min_lead_secs(mut self, secs: u64) -> Self {
        self.min_lead_secs = secs;
        self
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn write_queue(&self) -> Option<&WriteQueue> {
        self.queue.as_ref()
    }

    /// Write any queued documents now.
    pub fn flush(&self) -> Result<()> {
        if let Some(queue) = &self.queue {
            queue.flush_now()?;
        }
        Ok(())
    }

    // =========================================================================
    // Document plumbing
    // =========================================================================

    fn read<T: DeserializeOwned>(&self, name: &str, default: T) -> Result<T> {
        if let Some(value) = self.queue.as_ref().and_then(|q| q.pending(name)) {
            return serde_json::from_value(value).map_err(|err| Error::CorruptDocument {
                name: name.to_string(),
                reason: format!("queued value has unexpected shape: {err}"),
            });
        }
        self.store.load(name, default)
    }

    fn write<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        let result = match &self.queue {
            Some(queue) => serde_json::to_value(value)
                .map_err(Error::from)
                .and_then(|value| queue.enqueue(name, value)),
            None => self
                .store
                .save(name, value, self.store.compression_enabled()),
        };
        if let Err(err) = &result {
            tracing::warn!(document = name, error = %err, "repository write failed");
        }
        result
    }

    /// Write documents that must change together.
    ///
    /// Without a queue this is all-or-nothing on disk. With one, every value
    /// becomes pending before any of them is flushed.
    fn write_all(&self, docs: &[(&str, Value)]) -> Result<()> {
        let result = match &self.queue {
            Some(queue) => docs
                .iter()
                .try_for_each(|(name, value)| queue.enqueue(name, value.clone())),
            None => self.store.save_all(docs, self.store.compression_enabled()),
        };
        if let Err(err) = &result {
            let names: Vec<&str> = docs.iter().map(|(name, _)| *name).collect();
            tracing::warn!(documents = ?names, error = %err, "repository write failed");
        }
        result
    }

    // =========================================================================
    // Account
    // =========================================================================

    pub fn account(&self) -> Result<Option<Account>> {
        self.read(documents::ACCOUNT, None)
    }

    fn require_account(&self) -> Result<Account> {
        self.account()?.ok_or(Error::AccountNotFound)
    }

    pub fn create_account(&self, input: NewAccount) -> Result<Account> {
        if let Some(existing) = self.account()? {
            return Err(Error::AccountExists(existing.nickname));
        }
        let account = Account::new(input)?;
        self.write(documents::ACCOUNT, &Some(&account))?;
        tracing::info!(account = %account.id, "account created");
        Ok(account)
    }

    pub fn update_account(&self, patch: AccountPatch) -> Result<Account> {
        let mut account = self.require_account()?;
        if let Some(nickname) = &patch.nickname {
            account.nickname = required_text("nickname", nickname)?;
        }
        patch.name.apply(&mut account.name);
        patch.avatar.apply(&mut account.avatar);
        patch.character_type.apply(&mut account.character_type);
        account.updated_at = now_millis();
        self.write(documents::ACCOUNT, &Some(&account))?;
        Ok(account)
    }

    /// Award experience outside task completion. Level follows experience.
    pub fn add_experience(&self, amount: u64) -> Result<Account> {
        let mut account = self.require_account()?;
        account.gain_experience(amount);
        self.write(documents::ACCOUNT, &Some(&account))?;
        Ok(account)
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    /// All tasks, newest first
    pub fn tasks(&self) -> Result<Vec<Task>> {
        let mut tasks: Vec<Task> = self.read(documents::TASKS, Vec::new())?;
        sort_tasks(&mut tasks);
        Ok(tasks)
    }

    pub fn task(&self, id: &str) -> Result<Task> {
        self.tasks()?
            .into_iter()
            .find(|task| task.id == id)
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))
    }

    pub fn add_task(&self, input: NewTask) -> Result<Task> {
        if let Some(category_id) = &input.category_id {
            self.category(category_id)?;
        }
        if let Some(folder_id) = &input.folder_id {
            self.folder(folder_id)?;
        }
        let task = Task::new(input)?;

        let mut tasks = self.tasks()?;
        tasks.push(task.clone());
        self.write(documents::TASKS, &tasks)?;
        tracing::debug!(task = %task.id, "task added");

        self.sync_reminders(&task);
        Ok(task)
    }

    /// Merge `patch` into the task. Fields left as `Keep`/`None` are untouched.
    pub fn update_task(&self, id: &str, patch: TaskPatch) -> Result<Task> {
        if let Some(category_id) = patch.category_id.as_set() {
            self.category(category_id)?;
        }
        if let Some(folder_id) = patch.folder_id.as_set() {
            self.folder(folder_id)?;
        }
        let reschedule = patch.touches_reminders();

        let mut tasks = self.tasks()?;
        let task = tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;
        task.apply(patch)?;
        let updated = task.clone();

        self.write(documents::TASKS, &tasks)?;
        if reschedule {
            self.sync_reminders(&updated);
        }
        Ok(updated)
    }

    pub fn delete_task(&self, id: &str) -> Result<()> {
        let mut tasks = self.tasks()?;
        let before = tasks.len();
        tasks.retain(|task| task.id != id);
        if tasks.len() == before {
            return Err(Error::TaskNotFound(id.to_string()));
        }
        self.write(documents::TASKS, &tasks)?;
        self.cancel_reminders(id);
        tracing::debug!(task = id, "task deleted");
        Ok(())
    }

    /// Mark a task completed and award its experience to the account.
    ///
    /// Completing an already completed task awards nothing.
    pub fn complete_task(&self, id: &str) -> Result<Completion> {
        let mut tasks = self.tasks()?;
        let task = tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;

        let account = self.account()?;
        let level_before = account.as_ref().map(|a| a.level).unwrap_or(1);

        if task.is_completed {
            return Ok(Completion {
                task: task.clone(),
                experience_gained: 0,
                level_before,
                level_after: level_before,
                leveled_up: false,
            });
        }

        task.is_completed = true;
        task.updated_at = now_millis();
        let completed = task.clone();

        // The completed flag and the reward land together or not at all.
        let (experience_gained, level_after) = match account {
            Some(mut account) => {
                let reward = u64::from(completed.experience_reward);
                let level = account.gain_experience(reward);
                self.write_all(&[
                    (documents::TASKS, serde_json::to_value(&tasks)?),
                    (documents::ACCOUNT, serde_json::to_value(Some(&account))?),
                ])?;
                (reward, level)
            }
            None => {
                self.write(documents::TASKS, &tasks)?;
                (0, level_before)
            }
        };

        self.cancel_reminders(id);
        tracing::info!(
            task = id,
            experience = experience_gained,
            level = level_after,
            "task completed"
        );
        Ok(Completion {
            task: completed,
            experience_gained,
            level_before,
            level_after,
            leveled_up: level_after > level_before,
        })
    }

    /// Move a task into a folder, or out of any folder with `None`.
    pub fn move_task_to_folder(&self, id: &str, folder_id: Option<&str>) -> Result<Task> {
        let patch = TaskPatch {
            folder_id: Patch::from(folder_id.map(str::to_string)),
            ..TaskPatch::default()
        };
        self.update_task(id, patch)
    }

    /// Tasks in a folder; `None` selects tasks outside any folder.
    pub fn tasks_in_folder(&self, folder_id: Option<&str>) -> Result<Vec<Task>> {
        Ok(self
            .tasks()?
            .into_iter()
            .filter(|task| task.folder_id.as_deref() == folder_id)
            .collect())
    }

    pub fn tasks_in_category(&self, category_id: &str) -> Result<Vec<Task>> {
        Ok(self
            .tasks()?
            .into_iter()
            .filter(|task| task.category_id.as_deref() == Some(category_id))
            .collect())
    }

    /// The task's category, or `None` when unset or dangling.
    pub fn resolve_category(&self, task: &Task) -> Result<Option<Category>> {
        let Some(id) = &task.category_id else {
            return Ok(None);
        };
        Ok(self.categories()?.into_iter().find(|c| &c.id == id))
    }

    /// The task's folder, or `None` when unset or dangling.
    pub fn resolve_folder(&self, task: &Task) -> Result<Option<Folder>> {
        let Some(id) = &task.folder_id else {
            return Ok(None);
        };
        Ok(self.folders()?.into_iter().find(|f| &f.id == id))
    }

    fn sync_reminders(&self, task: &Task) {
        let planned = reminders::plan(task, Utc::now(), self.min_lead_secs);
        if let Err(err) = self.scheduler.schedule(&task.id, &planned) {
            tracing::warn!(task = %task.id, error = %err, "failed to schedule reminders");
        }
    }

    fn cancel_reminders(&self, task_id: &str) {
        if let Err(err) = self.scheduler.cancel(task_id) {
            tracing::warn!(task = task_id, error = %err, "failed to cancel reminders");
        }
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// Defaults first, then by name
    pub fn categories(&self) -> Result<Vec<Category>> {
        let mut categories: Vec<Category> = self.read(documents::CATEGORIES, Vec::new())?;
        categories.sort_by(|a, b| {
            b.is_default
                .cmp(&a.is_default)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });
        Ok(categories)
    }

    pub fn category(&self, id: &str) -> Result<Category> {
        self.categories()?
            .into_iter()
            .find(|c| c.id == id)
            .ok_or_else(|| Error::CategoryNotFound(id.to_string()))
    }

    /// Insert the built-in categories unless any default already exists.
    ///
    /// Returns how many were inserted.
    pub fn seed_default_categories(&self) -> Result<usize> {
        let mut categories: Vec<Category> = self.read(documents::CATEGORIES, Vec::new())?;
        if categories.iter().any(|c| c.is_default) {
            return Ok(0);
        }
        let defaults = default_categories();
        let count = defaults.len();
        categories.extend(defaults);
        self.write(documents::CATEGORIES, &categories)?;
        tracing::info!(count, "seeded default categories");
        Ok(count)
    }

    pub fn add_category(&self, input: NewCategory) -> Result<Category> {
        let category = Category::new(input)?;
        let mut categories: Vec<Category> = self.read(documents::CATEGORIES, Vec::new())?;
        categories.push(category.clone());
        self.write(documents::CATEGORIES, &categories)?;
        Ok(category)
    }

    pub fn update_category(&self, id: &str, patch: CategoryPatch) -> Result<Category> {
        let mut categories: Vec<Category> = self.read(documents::CATEGORIES, Vec::new())?;
        let category = categories
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| Error::CategoryNotFound(id.to_string()))?;
        category.apply(patch)?;
        let updated = category.clone();
        self.write(documents::CATEGORIES, &categories)?;
        Ok(updated)
    }

    /// Delete a user category and clear it from every task that used it.
    pub fn delete_category(&self, id: &str) -> Result<()> {
        let mut categories: Vec<Category> = self.read(documents::CATEGORIES, Vec::new())?;
        let Some(position) = categories.iter().position(|c| c.id == id) else {
            return Err(Error::CategoryNotFound(id.to_string()));
        };
        if categories[position].is_default {
            tracing::warn!(category = id, "refusing to delete default category");
            return Err(Error::CannotDeleteDefault(id.to_string()));
        }

        let mut tasks: Vec<Task> = self.read(documents::TASKS, Vec::new())?;
        let now = now_millis();
        let mut cleared = 0;
        for task in tasks.iter_mut().filter(|t| t.category_id.as_deref() == Some(id)) {
            task.category_id = None;
            task.updated_at = now;
            cleared += 1;
        }
        categories.remove(position);
        let mut docs = vec![(documents::CATEGORIES, serde_json::to_value(&categories)?)];
        if cleared > 0 {
            docs.push((documents::TASKS, serde_json::to_value(&tasks)?));
        }
        self.write_all(&docs)?;
        tracing::debug!(category = id, tasks = cleared, "category deleted");
        Ok(())
    }

    // =========================================================================
    // Folders
    // =========================================================================

    /// By `order`, then name
    pub fn folders(&self) -> Result<Vec<Folder>> {
        let mut folders: Vec<Folder> = self.read(documents::FOLDERS, Vec::new())?;
        sort_folders(&mut folders);
        Ok(folders)
    }

    pub fn folder(&self, id: &str) -> Result<Folder> {
        self.folders()?
            .into_iter()
            .find(|f| f.id == id)
            .ok_or_else(|| Error::FolderNotFound(id.to_string()))
    }

    pub fn add_folder(&self, input: NewFolder) -> Result<Folder> {
        let name = required_text("name", &input.name)?;
        let icon = required_text("icon", &input.icon)?;
        validate_color(&input.color)?;

        let folders = self.folders()?;
        if let Some(parent_id) = &input.parent_folder_id {
            check_parent(&folders, None, parent_id)?;
        }
        let order = input
            .order
            .unwrap_or_else(|| folders.iter().map(|f| f.order + 1).max().unwrap_or(0));

        let now = now_millis();
        let folder = Folder {
            id: crate::models::new_id(),
            name,
            icon,
            color: input.color,
            parent_folder_id: input.parent_folder_id,
            order,
            created_at: now,
            updated_at: now,
        };

        let mut folders = folders;
        folders.push(folder.clone());
        self.write(documents::FOLDERS, &folders)?;
        Ok(folder)
    }

    pub fn update_folder(&self, id: &str, patch: FolderPatch) -> Result<Folder> {
        let mut folders = self.folders()?;
        if let Some(parent_id) = patch.parent_folder_id.as_set() {
            check_parent(&folders, Some(id), parent_id)?;
        }

        let folder = folders
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| Error::FolderNotFound(id.to_string()))?;
        if let Some(name) = &patch.name {
            folder.name = required_text("name", name)?;
        }
        if let Some(icon) = &patch.icon {
            folder.icon = required_text("icon", icon)?;
        }
        if let Some(color) = patch.color {
            validate_color(&color)?;
            folder.color = color;
        }
        patch.parent_folder_id.apply(&mut folder.parent_folder_id);
        if let Some(order) = patch.order {
            folder.order = order;
        }
        folder.updated_at = now_millis();
        let updated = folder.clone();

        self.write(documents::FOLDERS, &folders)?;
        Ok(updated)
    }

    /// Delete a folder. Its tasks become unfiled and its subfolders move to
    /// the top level.
    pub fn delete_folder(&self, id: &str) -> Result<()> {
        let mut folders = self.folders()?;
        let before = folders.len();
        folders.retain(|f| f.id != id);
        if folders.len() == before {
            return Err(Error::FolderNotFound(id.to_string()));
        }

        let now = now_millis();
        let mut tasks: Vec<Task> = self.read(documents::TASKS, Vec::new())?;
        let mut cleared = 0;
        for task in tasks.iter_mut().filter(|t| t.folder_id.as_deref() == Some(id)) {
            task.folder_id = None;
            task.updated_at = now;
            cleared += 1;
        }
        for child in folders
            .iter_mut()
            .filter(|f| f.parent_folder_id.as_deref() == Some(id))
        {
            child.parent_folder_id = None;
            child.updated_at = now;
        }
        let mut docs = vec![(documents::FOLDERS, serde_json::to_value(&folders)?)];
        if cleared > 0 {
            docs.push((documents::TASKS, serde_json::to_value(&tasks)?));
        }
        self.write_all(&docs)?;
        tracing::debug!(folder = id, tasks = cleared, "folder deleted");
        Ok(())
    }

    /// Put the listed folders first, in the given order; the rest follow
    /// in their current order.
    pub fn reorder_folders(&self, ids: &[String]) -> Result<Vec<Folder>> {
        let mut folders = self.folders()?;
        let mut seen = HashSet::new();
        for id in ids {
            if !folders.iter().any(|f| &f.id == id) {
                return Err(Error::FolderNotFound(id.clone()));
            }
            if !seen.insert(id.as_str()) {
                return Err(Error::InvalidArgument(format!("folder {id} listed twice")));
            }
        }

        let positions: HashMap<&str, usize> = ids
            .iter()
            .enumerate()
            .map(|(idx, id)| (id.as_str(), idx))
            .collect();
        // Stable sort keeps unlisted folders in their current relative order.
        folders.sort_by_key(|f| positions.get(f.id.as_str()).copied().unwrap_or(usize::MAX));

        let now = now_millis();
        for (idx, folder) in folders.iter_mut().enumerate() {
            let order = i64::try_from(idx).unwrap_or(i64::MAX);
            if folder.order != order {
                folder.order = order;
                folder.updated_at = now;
            }
        }
        self.write(documents::FOLDERS, &folders)?;
        Ok(folders)
    }

    // =========================================================================
    // Activity log
    // =========================================================================

    /// Append an entry, trimming the log to [`MAX_LOG_ENTRIES`].
    pub fn add_log(&self, kind: LogKind, message: &str, data: Option<Value>) -> Result<LogEntry> {
        let entry = LogEntry::new(kind, message, data)?;
        let mut entries: Vec<LogEntry> = self.read(documents::LOGS, Vec::new())?;
        entries.push(entry.clone());
        if entries.len() > MAX_LOG_ENTRIES {
            let excess = entries.len() - MAX_LOG_ENTRIES;
            entries.drain(..excess);
        }
        self.write(documents::LOGS, &entries)?;
        Ok(entry)
    }

    /// Up to `limit` entries, newest first.
    pub fn logs(&self, limit: usize) -> Result<Vec<LogEntry>> {
        let mut entries: Vec<LogEntry> = self.read(documents::LOGS, Vec::new())?;
        // Stable: entries sharing a millisecond keep append order, reversed.
        entries.reverse();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(limit);
        Ok(entries)
    }
}

/// Newest first; ties broken by explicit order, then id.
fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| match (a.order, b.order) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => std::cmp::Ordering::Equal,
            })
            .then_with(|| a.id.cmp(&b.id))
    });
}

fn sort_folders(folders: &mut [Folder]) {
    folders.sort_by(|a, b| {
        a.order
            .cmp(&b.order)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
}

/// Folders nest one level deep: a parent must be a top-level folder, and a
/// folder that has children cannot itself get a parent.
fn check_parent(folders: &[Folder], child_id: Option<&str>, parent_id: &str) -> Result<()> {
    if Some(parent_id) == child_id {
        return Err(Error::InvalidArgument(
            "a folder cannot be its own parent".to_string(),
        ));
    }
    let parent = folders
        .iter()
        .find(|f| f.id == parent_id)
        .ok_or_else(|| Error::FolderNotFound(parent_id.to_string()))?;
    if parent.parent_folder_id.is_some() {
        return Err(Error::InvalidArgument(format!(
            "folder {parent_id} is already nested; folders nest one level deep"
        )));
    }
    if let Some(child_id) = child_id {
        if folders
            .iter()
            .any(|f| f.parent_folder_id.as_deref() == Some(child_id))
        {
            return Err(Error::InvalidArgument(format!(
                "folder {child_id} has subfolders and cannot be nested"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::level_for_experience;
    use tempfile::TempDir;

    fn repo() -> (TempDir, Repository) {
        let temp = TempDir::new().unwrap();
        let repo = Repository::new(DocumentStore::for_base(temp.path()));
        (temp, repo)
    }

    fn folder(repo: &Repository, name: &str, parent: Option<&str>) -> Folder {
        repo.add_folder(NewFolder {
            name: name.to_string(),
            icon: "star".to_string(),
            color: "#3b82f6".to_string(),
            parent_folder_id: parent.map(str::to_string),
            order: None,
        })
        .unwrap()
    }

    #[test]
    fn only_one_account() {
        let (_temp, repo) = repo();
        repo.create_account(NewAccount {
            nickname: "hero".to_string(),
            ..NewAccount::default()
        })
        .unwrap();

        let err = repo
            .create_account(NewAccount {
                nickname: "other".to_string(),
                ..NewAccount::default()
            })
            .unwrap_err();
        assert!(matches!(err, Error::AccountExists(ref n) if n == "hero"));
    }

    #[test]
    fn add_experience_recomputes_level() {
        let (_temp, repo) = repo();
        assert!(matches!(repo.add_experience(10), Err(Error::AccountNotFound)));

        repo.create_account(NewAccount {
            nickname: "hero".to_string(),
            ..NewAccount::default()
        })
        .unwrap();
        let account = repo.add_experience(950).unwrap();
        assert_eq!(account.level, level_for_experience(950));
        assert_eq!(repo.account().unwrap().unwrap().level, 4);
    }

    #[test]
    fn tasks_are_newest_first() {
        let (_temp, repo) = repo();
        let first = repo.add_task(NewTask::named("first")).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = repo.add_task(NewTask::named("second")).unwrap();

        let ids: Vec<_> = repo.tasks().unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn unknown_references_are_rejected_on_write() {
        let (_temp, repo) = repo();
        let err = repo
            .add_task(NewTask {
                folder_id: Some("missing".to_string()),
                ..NewTask::named("x")
            })
            .unwrap_err();
        assert!(matches!(err, Error::FolderNotFound(_)));
        assert!(repo.tasks().unwrap().is_empty());
    }

    #[test]
    fn dangling_references_resolve_to_none() {
        let (_temp, repo) = repo();
        let f = folder(&repo, "Inbox", None);
        let task = repo
            .add_task(NewTask {
                folder_id: Some(f.id.clone()),
                ..NewTask::named("x")
            })
            .unwrap();

        // Simulate a stale reference by removing the folder document.
        repo.store().delete(documents::FOLDERS).unwrap();
        assert!(repo.resolve_folder(&task).unwrap().is_none());
        assert!(repo.resolve_category(&task).unwrap().is_none());
    }

    #[test]
    fn folders_nest_one_level() {
        let (_temp, repo) = repo();
        let top = folder(&repo, "Top", None);
        let child = folder(&repo, "Child", Some(&top.id));
        assert_eq!(child.order, top.order + 1);

        let err = repo
            .add_folder(NewFolder {
                name: "Grandchild".to_string(),
                icon: "star".to_string(),
                color: "#3b82f6".to_string(),
                parent_folder_id: Some(child.id.clone()),
                order: None,
            })
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        let other = folder(&repo, "Other", None);
        let err = repo
            .update_folder(
                &top.id,
                FolderPatch {
                    parent_folder_id: Patch::Set(other.id.clone()),
                    ..FolderPatch::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn deleting_a_folder_unfiles_tasks_and_lifts_children() {
        let (_temp, repo) = repo();
        let top = folder(&repo, "Top", None);
        let child = folder(&repo, "Child", Some(&top.id));
        let task = repo
            .add_task(NewTask {
                folder_id: Some(top.id.clone()),
                ..NewTask::named("x")
            })
            .unwrap();

        repo.delete_folder(&top.id).unwrap();
        assert!(repo.task(&task.id).unwrap().folder_id.is_none());
        assert!(repo.folder(&child.id).unwrap().parent_folder_id.is_none());
        assert!(matches!(
            repo.delete_folder(&top.id),
            Err(Error::FolderNotFound(_))
        ));
    }

    #[test]
    fn reorder_puts_listed_folders_first() {
        let (_temp, repo) = repo();
        let a = folder(&repo, "A", None);
        let b = folder(&repo, "B", None);
        let c = folder(&repo, "C", None);

        let reordered = repo.reorder_folders(&[c.id.clone(), a.id.clone()]).unwrap();
        let names: Vec<_> = reordered.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["C", "A", "B"]);
        let orders: Vec<_> = repo.folders().unwrap().iter().map(|f| f.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);

        assert!(matches!(
            repo.reorder_folders(&[b.id.clone(), b.id.clone()]),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn move_task_between_folders() {
        let (_temp, repo) = repo();
        let f = folder(&repo, "Errands", None);
        let task = repo.add_task(NewTask::named("Buy milk")).unwrap();

        repo.move_task_to_folder(&task.id, Some(&f.id)).unwrap();
        assert_eq!(repo.tasks_in_folder(Some(&f.id)).unwrap().len(), 1);
        assert!(repo.tasks_in_folder(None).unwrap().is_empty());

        repo.move_task_to_folder(&task.id, None).unwrap();
        assert_eq!(repo.tasks_in_folder(None).unwrap().len(), 1);
    }

    #[test]
    fn seeding_is_a_one_time_operation() {
        let (_temp, repo) = repo();
        assert_eq!(repo.seed_default_categories().unwrap(), 8);
        assert_eq!(repo.seed_default_categories().unwrap(), 0);
        assert_eq!(repo.categories().unwrap().len(), 8);
    }

    #[test]
    fn categories_list_defaults_first() {
        let (_temp, repo) = repo();
        repo.add_category(NewCategory {
            name: "Art".to_string(),
            icon: "star".to_string(),
            color: "#ef4444".to_string(),
        })
        .unwrap();
        repo.seed_default_categories().unwrap();

        let categories = repo.categories().unwrap();
        assert!(categories[..8].iter().all(|c| c.is_default));
        assert_eq!(categories[8].name, "Art");
        assert_eq!(categories[0].name, "Finance");
    }
}
