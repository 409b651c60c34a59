//! What blacklock prints.
//!
//! Every command ends in one [`Envelope`]: a `blacklock.v1` JSON object under
//! `--json`, or a [`HumanOutput`] report otherwise. Failures use the same
//! envelope with `status: "error"` so scripts only parse one shape.

use std::fmt;

use serde::Serialize;

use crate::error::{Error, JsonError, Result};

pub const SCHEMA_VERSION: &str = "blacklock.v1";

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

/// Plain-text report: a header, `key: value` facts, then listed sections.
#[derive(Debug, Clone)]
pub struct HumanOutput {
    header: String,
    summary: Vec<(String, String)>,
    details: Vec<String>,
    warnings: Vec<String>,
    next_steps: Vec<String>,
}

impl HumanOutput {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            summary: Vec::new(),
            details: Vec::new(),
            warnings: Vec::new(),
            next_steps: Vec::new(),
        }
    }

    pub fn push_summary(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.summary.push((key.into(), value.into()));
    }

    /// One line per listed item (a task, a backup, a log entry).
    pub fn push_detail(&mut self, value: impl Into<String>) {
        self.details.push(value.into());
    }

    /// Shown in both renderings.
    pub fn push_warning(&mut self, value: impl Into<String>) {
        self.warnings.push(value.into());
    }

    /// A blacklock command worth running next. Shown in both renderings.
    pub fn push_next_step(&mut self, value: impl Into<String>) {
        self.next_steps.push(value.into());
    }
}

impl fmt::Display for HumanOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header)?;
        if !self.summary.is_empty() {
            f.write_str("\n\nSummary:")?;
            for (key, value) in &self.summary {
                if value.is_empty() {
                    write!(f, "\n- {key}")?;
                } else {
                    write!(f, "\n- {key}: {value}")?;
                }
            }
        }
        for (title, items) in [
            ("Details", &self.details),
            ("Warnings", &self.warnings),
            ("Next steps", &self.next_steps),
        ] {
            if items.is_empty() {
                continue;
            }
            write!(f, "\n\n{title}:")?;
            for item in items {
                write!(f, "\n- {item}")?;
            }
        }
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum Outcome<'a, T: Serialize> {
    Success { data: &'a T },
    Error { error: JsonError },
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    #[serde(flatten)]
    outcome: Outcome<'a, T>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    next_steps: Vec<String>,
}

impl<T: Serialize> Envelope<'_, T> {
    fn print(&self) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(self)?);
        Ok(())
    }
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    if options.json {
        return Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            outcome: Outcome::Success { data },
            warnings: human.map(|h| h.warnings.clone()).unwrap_or_default(),
            next_steps: human.map(|h| h.next_steps.clone()).unwrap_or_default(),
        }
        .print();
    }

    if let (false, Some(human)) = (options.quiet, human) {
        println!("{human}");
    }
    Ok(())
}

/// Reports a failed command on stdout (`--json`) or stderr.
pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let hint = recovery_hint(err);
    if json {
        return Envelope::<()> {
            schema_version: SCHEMA_VERSION,
            command,
            outcome: Outcome::Error {
                error: JsonError::from(err),
            },
            warnings: Vec::new(),
            next_steps: hint.into_iter().map(str::to_string).collect(),
        }
        .print();
    }

    eprintln!("error: {err}");
    if let Some(hint) = hint {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

fn recovery_hint(err: &Error) -> Option<&'static str> {
    let hint = match err {
        Error::AccountNotFound => "blacklock account create <nickname>",
        Error::AccountExists(_) => "blacklock account show",
        Error::TaskNotFound(_) => "blacklock task list",
        Error::CategoryNotFound(_) | Error::CannotDeleteDefault(_) => "blacklock category list",
        Error::FolderNotFound(_) => "blacklock folder list",
        Error::BackupNotFound(_) => "blacklock backup list",
        Error::InvalidConfig(_) | Error::TomlParse(_) => "fix blacklock.toml then retry",
        Error::CorruptDocument { .. } => "blacklock backup restore <filename>",
        _ => return None,
    };
    Some(hint)
}
