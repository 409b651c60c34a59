//! blacklock - local persistence, backup and focus-timer core
//!
//! Stores one user's account, tasks, categories and folders as JSON
//! documents (lz-string compressed by default) under a base directory,
//! with timestamped full-state backups and JSON export/import.
//!
//! # Core Concepts
//!
//! - **Document store**: one file per collection, written atomically
//! - **Backups**: compressed snapshots of every slot, pruned by age
//! - **Repository**: typed CRUD with cascade-to-null references and XP
//! - **Write queue**: debounced, coalesced document writes
//! - **Focus timer**: Pomodoro state machine with a tokio driver
//!
//! # Module Organization
//!
//! - `app`: wiring for one base directory
//! - `backup`: backup creation, listing, pruning, restore and import
//! - `cache`: explicit in-memory snapshot of the persisted state
//! - `cli`: command-line interface using clap
//! - `codec`: lz-string document encoding
//! - `config`: configuration loading from `blacklock.toml`
//! - `error`: error types and result aliases
//! - `focus`: Pomodoro timer and its async driver
//! - `legacy`: one-shot migration from the old SQLite database
//! - `lock`: file locking and atomic writes
//! - `models`: account, task, category and folder records
//! - `prefs`: the preferences key-value slot
//! - `queue`: debounced write coalescing
//! - `reminders`: deadline reminder planning and the scheduler seam
//! - `repository`: domain operations over the store
//! - `settings`: application settings merged over defaults
//! - `store`: the document store
//! - `transfer`: JSON export and import

pub mod app;
pub mod backup;
pub mod cache;
pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod focus;
pub mod legacy;
pub mod lock;
pub mod models;
pub mod output;
pub mod prefs;
pub mod queue;
pub mod reminders;
pub mod repository;
pub mod settings;
pub mod store;
pub mod transfer;

pub use error::{Error, Result};
