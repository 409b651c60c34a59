//! Deadline reminders
//!
//! Planning is pure: a task with a deadline and reminder offsets yields one
//! [`Reminder`] per offset whose trigger is still far enough in the future.
//! Delivery goes through the [`ReminderScheduler`] seam so the platform
//! notification layer can be swapped out (or left out entirely).

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::error::Result;
use crate::models::Task;

/// Reminders due sooner than this are skipped
pub const DEFAULT_MIN_LEAD_SECS: u64 = 5;

/// A planned notification for one task deadline offset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub task_id: String,
    pub title: String,
    pub body: String,
    pub minutes_before: u32,
    pub trigger_at: DateTime<Utc>,
}

/// Plan reminders for `task` as of `now`.
///
/// Completed tasks, tasks without a deadline and triggers less than
/// `min_lead_secs` away produce nothing.
pub fn plan(task: &Task, now: DateTime<Utc>, min_lead_secs: u64) -> Vec<Reminder> {
    if task.is_completed {
        return Vec::new();
    }
    let (Some(deadline), Some(offsets)) = (task.deadline, task.notification_minutes.as_ref()) else {
        return Vec::new();
    };

    // No trigger can be further ahead than the largest representable lead.
    let Some(min_lead) = i64::try_from(min_lead_secs)
        .ok()
        .and_then(Duration::try_seconds)
    else {
        tracing::debug!(task = %task.id, min_lead_secs, "minimum lead out of range, skipping");
        return Vec::new();
    };
    offsets
        .iter()
        .filter_map(|&minutes| {
            let trigger_at = deadline.checked_sub_signed(Duration::minutes(i64::from(minutes)))?;
            if trigger_at - now < min_lead {
                tracing::debug!(task = %task.id, minutes, "reminder too soon, skipping");
                return None;
            }
            Some(Reminder {
                task_id: task.id.clone(),
                title: task.task_name.clone(),
                body: time_until_text(minutes),
                minutes_before: minutes,
                trigger_at,
            })
        })
        .collect()
}

/// Human text for an offset: "30 minutes", "2 hours", "1 day" until deadline.
pub fn time_until_text(minutes: u32) -> String {
    let plural = |n: u32| if n == 1 { "" } else { "s" };
    if minutes < 60 {
        format!("{minutes} minutes until deadline")
    } else if minutes < 1440 {
        let hours = minutes / 60;
        format!("{hours} hour{} until deadline", plural(hours))
    } else {
        let days = minutes / 1440;
        format!("{days} day{} until deadline", plural(days))
    }
}

/// Platform notification seam
pub trait ReminderScheduler: Send + Sync {
    /// Replace every scheduled reminder for `task_id` with `reminders`.
    fn schedule(&self, task_id: &str, reminders: &[Reminder]) -> Result<()>;

    /// Drop every scheduled reminder for `task_id`.
    fn cancel(&self, task_id: &str) -> Result<()>;
}

/// Scheduler that delivers nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopScheduler;

impl ReminderScheduler for NoopScheduler {
    fn schedule(&self, _task_id: &str, _reminders: &[Reminder]) -> Result<()> {
        Ok(())
    }

    fn cancel(&self, _task_id: &str) -> Result<()> {
        Ok(())
    }
}

/// In-memory scheduler that keeps the current plan per task
#[derive(Debug, Default)]
pub struct MemoryScheduler {
    scheduled: Mutex<BTreeMap<String, Vec<Reminder>>>,
}

impl MemoryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_task(&self, task_id: &str) -> Vec<Reminder> {
        self.scheduled
            .lock()
            .get(task_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn all(&self) -> Vec<Reminder> {
        self.scheduled.lock().values().flatten().cloned().collect()
    }
}

impl ReminderScheduler for MemoryScheduler {
    fn schedule(&self, task_id: &str, reminders: &[Reminder]) -> Result<()> {
        let mut scheduled = self.scheduled.lock();
        if reminders.is_empty() {
            scheduled.remove(task_id);
        } else {
            scheduled.insert(task_id.to_string(), reminders.to_vec());
        }
        Ok(())
    }

    fn cancel(&self, task_id: &str) -> Result<()> {
        self.scheduled.lock().remove(task_id);
        Ok(())
    }
}
