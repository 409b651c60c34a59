//! blacklock task subcommands

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::app::App;
use crate::cli::TaskCommands;
use crate::error::{Error, Result};
use crate::models::{Frequency, NewTask, Patch, Task, TaskPatch};
use crate::output::{emit_success, HumanOutput, OutputOptions};

#[derive(serde::Serialize)]
struct ListOutput {
    tasks: Vec<Task>,
    total: usize,
    open: usize,
}

pub fn run(app: &App, cmd: TaskCommands, output: OutputOptions) -> Result<()> {
    match cmd {
        TaskCommands::Add {
            name,
            description,
            category,
            folder,
            color,
            reward,
            deadline,
            remind,
            repeat,
        } => {
            let frequency = repeat.as_deref().map(parse_frequency).transpose()?;
            let task = app.repo.add_task(NewTask {
                task_name: name,
                description,
                category_id: category,
                folder_id: folder,
                color,
                is_repeated: frequency.as_ref().is_some_and(|f| *f != Frequency::Once),
                frequency,
                experience_reward: reward,
                deadline: deadline.as_deref().map(parse_deadline).transpose()?,
                notification_minutes: reminder_offsets(remind),
                order: None,
            })?;
            let human = task_human("blacklock task add: task created", app, &task)?;
            emit_success(output, "task add", &task, Some(&human))
        }
        TaskCommands::List {
            folder,
            category,
            open,
        } => {
            let mut tasks = match (folder.as_deref(), category.as_deref()) {
                (Some("none"), _) => app.repo.tasks_in_folder(None)?,
                (Some(folder), _) => app.repo.tasks_in_folder(Some(folder))?,
                (None, Some(category)) => app.repo.tasks_in_category(category)?,
                (None, None) => app.repo.tasks()?,
            };
            if open {
                tasks.retain(|task| !task.is_completed);
            }
            let out = ListOutput {
                total: tasks.len(),
                open: tasks.iter().filter(|task| !task.is_completed).count(),
                tasks,
            };

            let mut human = HumanOutput::new("blacklock task list");
            human.push_summary("tasks", out.total.to_string());
            human.push_summary("open", out.open.to_string());
            for task in &out.tasks {
                let mark = if task.is_completed { "x" } else { " " };
                human.push_detail(format!("[{mark}] {}  {}", task.id, task.task_name));
            }
            if out.tasks.is_empty() {
                human.push_next_step("blacklock task add <name>");
            }
            emit_success(output, "task list", &out, Some(&human))
        }
        TaskCommands::Show { id } => {
            let task = app.repo.task(&id)?;
            let human = task_human("blacklock task", app, &task)?;
            emit_success(output, "task show", &task, Some(&human))
        }
        TaskCommands::Edit {
            id,
            name,
            description,
            category,
            no_category,
            deadline,
            no_deadline,
            remind,
            reward,
            repeat,
        } => {
            let mut patch = TaskPatch {
                task_name: name,
                description,
                experience_reward: reward,
                ..TaskPatch::default()
            };
            if no_category {
                patch.category_id = Patch::Clear;
            } else if let Some(category) = category {
                patch.category_id = Patch::Set(category);
            }
            if no_deadline {
                patch.deadline = Patch::Clear;
                patch.notification_minutes = Patch::Clear;
            } else if let Some(deadline) = deadline {
                patch.deadline = Patch::Set(parse_deadline(&deadline)?);
            }
            if let Some(offsets) = reminder_offsets(remind) {
                patch.notification_minutes = Patch::Set(offsets);
            }
            if let Some(repeat) = repeat {
                let frequency = parse_frequency(&repeat)?;
                patch.is_repeated = Some(frequency != Frequency::Once);
                patch.frequency = Patch::Set(frequency);
            }

            let task = app.repo.update_task(&id, patch)?;
            let human = task_human("blacklock task edit: task updated", app, &task)?;
            emit_success(output, "task edit", &task, Some(&human))
        }
        TaskCommands::Complete { id, pin } => {
            let settings = app.prefs.settings()?;
            if !settings.pin_matches(pin.as_deref().unwrap_or_default()) {
                return Err(Error::InvalidArgument(
                    "task completion PIN does not match".to_string(),
                ));
            }

            let completion = app.repo.complete_task(&id)?;
            let header = if completion.experience_gained > 0 {
                "blacklock task complete: task completed"
            } else {
                "blacklock task complete: already completed"
            };
            let mut human = HumanOutput::new(header);
            human.push_summary("task", completion.task.task_name.clone());
            human.push_summary("experience", format!("+{}", completion.experience_gained));
            human.push_summary("level", completion.level_after.to_string());
            if completion.leveled_up {
                human.push_detail(format!(
                    "level up: {} -> {}",
                    completion.level_before, completion.level_after
                ));
            }
            emit_success(output, "task complete", &completion, Some(&human))
        }
        TaskCommands::Rm { id } => {
            app.repo.delete_task(&id)?;
            let mut human = HumanOutput::new("blacklock task rm: task deleted");
            human.push_summary("id", id.clone());
            emit_success(output, "task rm", &serde_json::json!({ "id": id }), Some(&human))
        }
        TaskCommands::Move { id, folder } => {
            let task = app.repo.move_task_to_folder(&id, folder.as_deref())?;
            let human = task_human("blacklock task move: task moved", app, &task)?;
            emit_success(output, "task move", &task, Some(&human))
        }
    }
}

fn task_human(header: &str, app: &App, task: &Task) -> Result<HumanOutput> {
    let mut human = HumanOutput::new(header);
    human.push_summary("id", task.id.clone());
    human.push_summary("name", task.task_name.clone());
    if !task.description.is_empty() {
        human.push_summary("description", task.description.clone());
    }
    human.push_summary("completed", if task.is_completed { "yes" } else { "no" });
    human.push_summary("reward", format!("{} xp", task.experience_reward));
    if let Some(category) = app.repo.resolve_category(task)? {
        human.push_summary("category", category.name);
    }
    if let Some(folder) = app.repo.resolve_folder(task)? {
        human.push_summary("folder", folder.name);
    }
    if let Some(frequency) = &task.frequency {
        human.push_summary("repeat", frequency.kind());
    }
    if let Some(deadline) = task.deadline {
        human.push_summary("deadline", deadline.to_rfc3339());
    }
    if let Some(minutes) = &task.notification_minutes {
        let offsets: Vec<String> = minutes.iter().map(u32::to_string).collect();
        human.push_summary("reminders", format!("{} min before", offsets.join(", ")));
    }
    Ok(human)
}

fn reminder_offsets(minutes: Vec<u32>) -> Option<BTreeSet<u32>> {
    if minutes.is_empty() {
        None
    } else {
        Some(minutes.into_iter().collect())
    }
}

fn parse_deadline(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| Error::InvalidArgument(format!("invalid deadline '{raw}': {err}")))
}

/// `once`, `daily`, `daily:1,2`, `weekly:1,3`, `monthly:1,15`, `every:3`
fn parse_frequency(raw: &str) -> Result<Frequency> {
    let raw = raw.trim();
    let (kind, args) = match raw.split_once(':') {
        Some((kind, args)) => (kind, Some(args)),
        None => (raw, None),
    };

    let frequency = match (kind.to_ascii_lowercase().as_str(), args) {
        ("once", None) => Frequency::Once,
        ("daily", None) => Frequency::Daily {
            days_of_week: BTreeSet::new(),
        },
        ("daily", Some(days)) => Frequency::Daily {
            days_of_week: parse_days(days)?,
        },
        ("weekly", Some(days)) => Frequency::Weekly {
            days_of_week: parse_days(days)?,
        },
        ("monthly", Some(days)) => Frequency::Monthly {
            days_of_month: parse_days(days)?,
        },
        ("every", Some(days)) => Frequency::Custom {
            custom_days: days.trim().parse().map_err(|_| bad_repeat(raw))?,
        },
        _ => return Err(bad_repeat(raw)),
    };
    frequency.validate()?;
    Ok(frequency)
}

fn parse_days(list: &str) -> Result<BTreeSet<u8>> {
    list.split(',')
        .map(|day| day.trim().parse::<u8>().map_err(|_| bad_repeat(list)))
        .collect()
}

fn bad_repeat(raw: &str) -> Error {
    Error::InvalidArgument(format!(
        "invalid repeat rule '{raw}' (expected once, daily[:days], weekly:days, monthly:days or every:N)"
    ))
}
