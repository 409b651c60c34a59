//! Command-line interface for blacklock
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is implemented in its own submodule.

use std::path::PathBuf;

use clap::{ArgMatches, Parser, Subcommand};

use crate::app::App;
use crate::error::{Error, Result};
use crate::models::LogKind;
use crate::output::OutputOptions;

mod account;
mod backup;
mod category;
mod focus;
mod init;
mod log;
mod settings;
mod task;

/// blacklock - local task and progress store
///
/// Keeps an account, tasks, categories and folders in compressed JSON
/// documents, with timestamped backups, JSON export/import and a
/// Pomodoro focus timer.
#[derive(Parser, Debug)]
#[command(name = "blacklock")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Base data directory (defaults to the platform data directory)
    #[arg(long, global = true, env = "BLACKLOCK_DIR")]
    pub dir: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the store, migrate a legacy database and seed categories
    Init,

    /// Summary of the account, tasks and storage
    Status,

    /// Convert a legacy SQLite database into documents
    Migrate,

    /// Account management
    #[command(subcommand)]
    Account(AccountCommands),

    /// Task management
    #[command(subcommand)]
    Task(TaskCommands),

    /// Category management
    #[command(subcommand)]
    Category(CategoryCommands),

    /// Folder management
    #[command(subcommand)]
    Folder(FolderCommands),

    /// Timestamped backups of the whole state
    #[command(subcommand)]
    Backup(BackupCommands),

    /// JSON export and import
    #[command(subcommand)]
    Data(DataCommands),

    /// Application settings
    #[command(subcommand)]
    Settings(SettingsCommands),

    /// Pomodoro focus timer
    #[command(subcommand)]
    Focus(FocusCommands),

    /// Activity log
    #[command(subcommand)]
    Log(LogCommands),
}

#[derive(Subcommand, Debug)]
pub enum AccountCommands {
    /// Create the account (only one may exist)
    Create {
        nickname: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        avatar: Option<String>,

        /// Character type shown next to the avatar
        #[arg(long)]
        character: Option<String>,
    },

    /// Show the account with level and rank
    Show,

    /// Change the nickname
    Rename { nickname: String },
}

#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Add a task
    Add {
        name: String,

        #[arg(short, long, default_value = "")]
        description: String,

        /// Category id
        #[arg(long)]
        category: Option<String>,

        /// Folder id
        #[arg(long)]
        folder: Option<String>,

        /// Hex color (#rgb or #rrggbb)
        #[arg(long)]
        color: Option<String>,

        /// Experience awarded on completion
        #[arg(long)]
        reward: Option<u32>,

        /// Deadline (RFC 3339, e.g. 2026-05-01T18:00:00Z)
        #[arg(long)]
        deadline: Option<String>,

        /// Reminder offsets in minutes before the deadline
        #[arg(long, value_delimiter = ',')]
        remind: Vec<u32>,

        /// Repeat rule: once, daily[:days], weekly:days, monthly:days, every:N
        #[arg(long)]
        repeat: Option<String>,
    },

    /// List tasks, newest first
    List {
        /// Only tasks in this folder ("none" for unfiled tasks)
        #[arg(long)]
        folder: Option<String>,

        /// Only tasks in this category
        #[arg(long, conflicts_with = "folder")]
        category: Option<String>,

        /// Hide completed tasks
        #[arg(long)]
        open: bool,
    },

    /// Show one task
    Show { id: String },

    /// Change task fields
    Edit {
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(long, conflicts_with = "no_category")]
        category: Option<String>,

        /// Clear the category
        #[arg(long)]
        no_category: bool,

        #[arg(long, conflicts_with = "no_deadline")]
        deadline: Option<String>,

        /// Clear the deadline and its reminders
        #[arg(long)]
        no_deadline: bool,

        #[arg(long, value_delimiter = ',')]
        remind: Vec<u32>,

        #[arg(long)]
        reward: Option<u32>,

        #[arg(long)]
        repeat: Option<String>,
    },

    /// Complete a task and collect its experience
    Complete {
        id: String,

        /// Task-completion PIN, when one is set
        #[arg(long)]
        pin: Option<String>,
    },

    /// Delete a task
    Rm { id: String },

    /// Move a task into a folder, or out of every folder when omitted
    Move { id: String, folder: Option<String> },
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommands {
    /// List categories, defaults first
    List,

    /// Add a category
    Add {
        name: String,

        #[arg(long, default_value = "star")]
        icon: String,

        #[arg(long, default_value = "#3b82f6")]
        color: String,
    },

    /// Delete a category; its tasks become uncategorized
    Rm { id: String },
}

#[derive(Subcommand, Debug)]
pub enum FolderCommands {
    /// List folders in display order
    List,

    /// Add a folder
    Add {
        name: String,

        #[arg(long, default_value = "folder")]
        icon: String,

        #[arg(long, default_value = "#6366f1")]
        color: String,

        /// Parent folder id (one level of nesting)
        #[arg(long)]
        parent: Option<String>,
    },

    /// Delete a folder; its tasks and subfolders move to the top level
    Rm { id: String },
}

#[derive(Subcommand, Debug)]
pub enum BackupCommands {
    /// Take a backup now
    Create,

    /// List backups, newest first
    List,

    /// Replace the current state with a backup
    Restore { filename: String },

    /// Delete a backup
    Rm { filename: String },

    /// Delete backups older than the retention window
    Clean {
        /// Days to keep (defaults to backup.keep_days)
        #[arg(
            long,
            value_parser = clap::value_parser!(u32).range(0..=i64::from(crate::config::MAX_KEEP_DAYS))
        )]
        keep_days: Option<u32>,
    },

    /// Copy a backup to another directory
    Export { filename: String, dest: PathBuf },

    /// Restore from a backup file outside the data directory
    Import { path: PathBuf },
}

#[derive(Subcommand, Debug)]
pub enum DataCommands {
    /// Write the whole state as pretty JSON
    Export {
        /// Destination file (stdout when omitted)
        path: Option<PathBuf>,
    },

    /// Replace the whole state from an export file
    Import { path: PathBuf },
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommands {
    /// Show the effective settings
    Show,

    /// Change focus timer durations (minutes)
    SetPomodoro {
        #[arg(long)]
        work: Option<u32>,

        #[arg(long)]
        short_break: Option<u32>,

        #[arg(long)]
        long_break: Option<u32>,

        /// Work sessions before a long break
        #[arg(long)]
        sessions: Option<u32>,

        #[arg(long)]
        auto_start_breaks: Option<bool>,

        #[arg(long)]
        auto_start_work: Option<bool>,
    },

    /// Set or clear the task-completion PIN
    SetPin {
        /// Four digits
        #[arg(required_unless_present = "clear")]
        pin: Option<String>,

        #[arg(long, conflicts_with = "pin")]
        clear: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum FocusCommands {
    /// Run the timer in the foreground until the sessions are done
    Run {
        /// Work sessions to complete before exiting
        #[arg(long, default_value_t = 1)]
        sessions: u32,

        /// Override the work duration (minutes)
        #[arg(long)]
        work: Option<u32>,

        /// Override the short break duration (minutes)
        #[arg(long)]
        short_break: Option<u32>,
    },
}

#[derive(Subcommand, Debug)]
pub enum LogCommands {
    /// Show recorded failures and events, newest first
    List {
        /// Entries to show
        #[arg(long, default_value_t = crate::repository::DEFAULT_LOG_LIMIT)]
        limit: usize,
    },
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let base = resolve_base(self.dir)?;
        let output = OutputOptions {
            json: self.json,
            quiet: self.quiet,
        };
        let app = App::open(&base);

        match self.command {
            Commands::Init => init::run_init(&app, output),
            Commands::Migrate => init::run_migrate(&app, output),
            command => {
                app.initialize()?;
                let result = match command {
                    Commands::Status => init::run_status(&app, output),
                    Commands::Account(cmd) => account::run(&app, cmd, output),
                    Commands::Task(cmd) => task::run(&app, cmd, output),
                    Commands::Category(cmd) => category::run_category(&app, cmd, output),
                    Commands::Folder(cmd) => category::run_folder(&app, cmd, output),
                    Commands::Backup(cmd) => backup::run_backup(&app, cmd, output),
                    Commands::Data(cmd) => backup::run_data(&app, cmd, output),
                    Commands::Settings(cmd) => settings::run(&app, cmd, output),
                    Commands::Focus(cmd) => focus::run(&app, cmd, output),
                    Commands::Log(cmd) => log::run(&app, cmd, output),
                    Commands::Init | Commands::Migrate => Ok(()),
                };
                if let Err(err) = &result {
                    record_failure(&app, err);
                }
                result
            }
        }
    }
}

/// Blocked and failed operations go to the activity log; usage errors do not.
fn record_failure(app: &App, err: &Error) {
    let code = err.exit_code();
    let kind = match code {
        crate::error::exit_codes::OPERATION_FAILED => LogKind::Error,
        crate::error::exit_codes::POLICY_BLOCKED => LogKind::Warning,
        _ => return,
    };
    let data = serde_json::json!({ "error": err.to_string(), "code": code });
    if let Err(log_err) = app.repo.add_log(kind, &err.to_string(), Some(data)) {
        tracing::warn!(error = %log_err, "failed to record failure in the activity log");
    }
}

/// Subcommand names joined by spaces ("task add", "backup list").
pub fn command_path(matches: &ArgMatches) -> String {
    let mut names = Vec::new();
    let mut current = matches;
    while let Some((name, sub)) = current.subcommand() {
        names.push(name);
        current = sub;
    }
    if names.is_empty() {
        "blacklock".to_string()
    } else {
        names.join(" ")
    }
}

/// `--dir`, then the platform data directory.
fn resolve_base(dir: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = dir {
        return Ok(dir);
    }
    directories::ProjectDirs::from("", "", "blacklock")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| {
            Error::OperationFailed(
                "no home directory found; pass --dir or set BLACKLOCK_DIR".to_string(),
            )
        })
}
