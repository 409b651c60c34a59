mod support;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use blacklock::error::Error;
use blacklock::models::{
    level_for_experience, Frequency, LogEntry, LogKind, NewAccount, NewCategory, NewTask, Patch,
    Task, TaskPatch,
};
use blacklock::reminders::MemoryScheduler;
use blacklock::repository::MAX_LOG_ENTRIES;
use blacklock::store::documents;
use chrono::Utc;

use support::TestBase;

fn hero(base: &TestBase) -> blacklock::app::App {
    let app = base.app();
    app.repo
        .create_account(NewAccount {
            nickname: "hero".to_string(),
            ..NewAccount::default()
        })
        .unwrap();
    app
}

#[test]
fn buy_milk_survives_a_restart() {
    let base = TestBase::new();
    let created = {
        let app = base.app();
        app.repo.add_task(NewTask::named("Buy milk")).unwrap()
    };

    let reopened = blacklock::app::App::open(base.path());
    let tasks = reopened.repo.tasks().unwrap();
    assert_eq!(tasks, vec![created.clone()]);
    assert_eq!(tasks[0].task_name, "Buy milk");
    assert!(!tasks[0].is_completed);
    assert_eq!(reopened.repo.task(&created.id).unwrap(), created);
}

#[test]
fn completing_twice_awards_experience_once() {
    let base = TestBase::new();
    let app = hero(&base);
    let task = app
        .repo
        .add_task(NewTask {
            experience_reward: Some(150),
            ..NewTask::named("Big job")
        })
        .unwrap();

    let first = app.repo.complete_task(&task.id).unwrap();
    assert_eq!(first.experience_gained, 150);
    assert_eq!(first.level_before, 1);
    assert_eq!(first.level_after, 2);
    assert!(first.leveled_up);
    assert!(first.task.is_completed);

    let second = app.repo.complete_task(&task.id).unwrap();
    assert_eq!(second.experience_gained, 0);
    assert!(!second.leveled_up);

    let account = app.repo.account().unwrap().unwrap();
    assert_eq!(account.experience, 150);
    assert_eq!(account.level, level_for_experience(account.experience));
}

#[test]
fn level_follows_experience_after_every_change() {
    let base = TestBase::new();
    let app = hero(&base);
    for amount in [50, 50, 300, 499, 1] {
        let account = app.repo.add_experience(amount).unwrap();
        assert_eq!(account.level, level_for_experience(account.experience));
    }
    let account = app.repo.account().unwrap().unwrap();
    assert_eq!(account.experience, 900);
    assert_eq!(account.level, 4);
}

#[test]
fn completing_without_an_account_still_completes_the_task() {
    let base = TestBase::new();
    let app = base.app();
    let task = app.repo.add_task(NewTask::named("Solo")).unwrap();
    let completion = app.repo.complete_task(&task.id).unwrap();
    assert!(completion.task.is_completed);
    assert!(app.repo.account().unwrap().is_none());
}

#[test]
fn deleting_a_category_uncategorizes_all_its_tasks() {
    let base = TestBase::new();
    let app = base.app();
    let garden = app
        .repo
        .add_category(NewCategory {
            name: "Garden".to_string(),
            icon: "leaf".to_string(),
            color: "#10b981".to_string(),
        })
        .unwrap();
    for i in 0..5 {
        app.repo
            .add_task(NewTask {
                category_id: Some(garden.id.clone()),
                ..NewTask::named(format!("Weed bed {i}"))
            })
            .unwrap();
    }
    let other = app.repo.add_task(NewTask::named("Unrelated")).unwrap();

    app.repo.delete_category(&garden.id).unwrap();

    let tasks = app.repo.tasks().unwrap();
    assert_eq!(tasks.len(), 6);
    assert!(tasks.iter().all(|t| t.category_id.is_none()));
    assert_eq!(app.repo.task(&other.id).unwrap(), other);
    assert!(matches!(
        app.repo.category(&garden.id),
        Err(Error::CategoryNotFound(_))
    ));
}

#[test]
fn default_categories_cannot_be_deleted() {
    let base = TestBase::new();
    let app = base.app();
    let before = app.repo.categories().unwrap();
    let work = before.iter().find(|c| c.is_default).unwrap().clone();
    let task = app
        .repo
        .add_task(NewTask {
            category_id: Some(work.id.clone()),
            ..NewTask::named("Report")
        })
        .unwrap();

    assert!(matches!(
        app.repo.delete_category(&work.id),
        Err(Error::CannotDeleteDefault(_))
    ));
    assert_eq!(app.repo.categories().unwrap(), before);
    assert_eq!(app.repo.task(&task.id).unwrap().category_id, Some(work.id));
}

#[test]
fn update_merges_fields_and_clears_on_request() {
    let base = TestBase::new();
    let app = base.app();
    let task = app
        .repo
        .add_task(NewTask {
            description: "two litres".to_string(),
            color: Some("#ef4444".to_string()),
            ..NewTask::named("Buy milk")
        })
        .unwrap();

    let updated = app
        .repo
        .update_task(
            &task.id,
            TaskPatch {
                task_name: Some("Buy oat milk".to_string()),
                color: Patch::Clear,
                frequency: Patch::Set(Frequency::Weekly {
                    days_of_week: [6].into_iter().collect(),
                }),
                ..TaskPatch::default()
            },
        )
        .unwrap();

    assert_eq!(updated.task_name, "Buy oat milk");
    assert_eq!(updated.description, "two litres");
    assert!(updated.color.is_none());
    assert_eq!(updated.frequency.as_ref().map(Frequency::kind), Some("weekly"));
    assert_eq!(updated.created_at, task.created_at);
    assert!(updated.updated_at >= task.updated_at);
}

#[test]
fn failed_updates_leave_the_task_untouched() {
    let base = TestBase::new();
    let app = base.app();
    let task = app.repo.add_task(NewTask::named("Stable")).unwrap();

    let err = app
        .repo
        .update_task(
            &task.id,
            TaskPatch {
                task_name: Some("Renamed".to_string()),
                color: Patch::Set("blue".to_string()),
                ..TaskPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert_eq!(app.repo.task(&task.id).unwrap(), task);

    assert!(matches!(
        app.repo.update_task("nope", TaskPatch::default()),
        Err(Error::TaskNotFound(_))
    ));
}

#[test]
fn reminders_follow_the_task_lifecycle() {
    let base = TestBase::new();
    let scheduler = Arc::new(MemoryScheduler::new());
    let app = base.app().with_scheduler(scheduler.clone());
    let deadline = Utc::now() + chrono::Duration::hours(3);

    let task = app
        .repo
        .add_task(NewTask {
            deadline: Some(deadline),
            notification_minutes: Some(BTreeSet::from([15, 60, 600])),
            ..NewTask::named("Dentist")
        })
        .unwrap();
    // Ten hours before a deadline three hours away is already past.
    assert_eq!(scheduler.for_task(&task.id).len(), 2);

    app.repo.complete_task(&task.id).unwrap();
    assert!(scheduler.for_task(&task.id).is_empty());

    let other = app
        .repo
        .add_task(NewTask {
            deadline: Some(deadline),
            notification_minutes: Some(BTreeSet::from([30])),
            ..NewTask::named("Call back")
        })
        .unwrap();
    assert_eq!(scheduler.for_task(&other.id).len(), 1);
    app.repo.delete_task(&other.id).unwrap();
    assert!(scheduler.all().is_empty());
}

#[tokio::test(start_paused = true)]
async fn rapid_updates_coalesce_into_one_write() {
    let base = TestBase::new();
    let app = base.app().with_write_queue();
    let queue = app.repo.write_queue().expect("queue").clone();

    let task = app.repo.add_task(NewTask::named("Draft")).unwrap();
    queue.flush_now().unwrap();
    let writes = queue.flush_count();

    app.repo
        .update_task(
            &task.id,
            TaskPatch {
                task_name: Some("Draft v2".to_string()),
                ..TaskPatch::default()
            },
        )
        .unwrap();
    app.repo
        .update_task(
            &task.id,
            TaskPatch {
                description: Some("final notes".to_string()),
                ..TaskPatch::default()
            },
        )
        .unwrap();

    // Reads see the pending state before anything hits the disk.
    assert_eq!(app.repo.task(&task.id).unwrap().task_name, "Draft v2");
    let on_disk: Vec<Task> = app.store.load(documents::TASKS, Vec::new()).unwrap();
    assert_eq!(on_disk[0].task_name, "Draft");

    tokio::time::sleep(Duration::from_millis(1100)).await;

    assert_eq!(queue.flush_count(), writes + 1);
    assert!(!queue.has_pending());
    let on_disk: Vec<Task> = app.store.load(documents::TASKS, Vec::new()).unwrap();
    assert_eq!(on_disk[0].task_name, "Draft v2");
    assert_eq!(on_disk[0].description, "final notes");
}

#[test]
fn folders_scope_task_listings() {
    let base = TestBase::new();
    let app = base.app();
    let errands = app
        .repo
        .add_folder(blacklock::models::NewFolder {
            name: "Errands".to_string(),
            icon: "cart".to_string(),
            color: "#f97316".to_string(),
            ..Default::default()
        })
        .unwrap();
    let milk = app.repo.add_task(NewTask::named("Buy milk")).unwrap();
    app.repo.add_task(NewTask::named("Read")).unwrap();

    app.repo.move_task_to_folder(&milk.id, Some(&errands.id)).unwrap();
    assert_eq!(app.repo.tasks_in_folder(Some(&errands.id)).unwrap().len(), 1);
    assert_eq!(app.repo.tasks_in_folder(None).unwrap().len(), 1);

    app.repo.delete_folder(&errands.id).unwrap();
    assert_eq!(app.repo.tasks_in_folder(None).unwrap().len(), 2);
    assert!(app.repo.task(&milk.id).unwrap().folder_id.is_none());
}

#[test]
fn unreachable_reminder_lead_schedules_nothing() {
    let base = TestBase::new();
    let scheduler = Arc::new(MemoryScheduler::new());
    let app = base.app();
    let repo = app
        .repo
        .clone()
        .with_scheduler(scheduler.clone())
        .with_min_lead_secs(u64::MAX);

    let task = repo
        .add_task(NewTask {
            deadline: Some(Utc::now() + chrono::Duration::days(2)),
            notification_minutes: Some(BTreeSet::from([30])),
            ..NewTask::named("Far off")
        })
        .unwrap();
    assert!(scheduler.for_task(&task.id).is_empty());
}

#[test]
fn activity_log_lists_newest_first() {
    let base = TestBase::new();
    let app = base.app();
    assert!(app.repo.logs(10).unwrap().is_empty());

    let first = app
        .repo
        .add_log(LogKind::Warning, "Category is a default", None)
        .unwrap();
    let second = app
        .repo
        .add_log(
            LogKind::Error,
            "Operation failed: disk full",
            Some(serde_json::json!({ "code": 4 })),
        )
        .unwrap();

    let logs = app.repo.logs(10).unwrap();
    assert_eq!(logs, vec![second.clone(), first]);
    assert_eq!(logs[0].data.as_ref().unwrap()["code"], 4);
    assert_eq!(app.repo.logs(1).unwrap(), vec![second]);

    let err = app.repo.add_log(LogKind::Analytics, "  ", None).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert_eq!(app.repo.logs(10).unwrap().len(), 2);
}

#[test]
fn activity_log_drops_the_oldest_past_its_cap() {
    let base = TestBase::new();
    let app = base.app();
    let start = Utc::now() - chrono::Duration::hours(1);
    let seeded: Vec<LogEntry> = (0..MAX_LOG_ENTRIES)
        .map(|idx| {
            let mut entry =
                LogEntry::new(LogKind::Analytics, &format!("event {idx}"), None).unwrap();
            entry.timestamp = start + chrono::Duration::seconds(idx as i64);
            entry
        })
        .collect();
    base.store().save(documents::LOGS, &seeded, true).unwrap();

    app.repo.add_log(LogKind::Error, "latest", None).unwrap();

    let logs = app.repo.logs(usize::MAX).unwrap();
    assert_eq!(logs.len(), MAX_LOG_ENTRIES);
    assert_eq!(logs[0].message, "latest");
    assert_eq!(logs.last().unwrap().message, "event 1");
    assert!(logs.iter().all(|entry| entry.message != "event 0"));
}
