//! Error types for blacklock
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, unknown ids, invalid backup files)
//! - 3: Blocked by an invariant (default categories, duplicate account)
//! - 4: Operation failed (I/O, corrupt documents, database errors)

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the blacklock CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const POLICY_BLOCKED: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Why an import or backup payload was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportIssue {
    /// The payload has no `version` field.
    MissingVersion,
    /// The export payload has no `account` field.
    MissingAccount,
    /// The backup payload has no `data` field.
    MissingData,
    /// The payload is not JSON (or not a compressed JSON document).
    NotJson(String),
    /// A field exists but has the wrong shape.
    Malformed(String),
}

impl fmt::Display for ImportIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportIssue::MissingVersion => write!(f, "missing 'version' field"),
            ImportIssue::MissingAccount => write!(f, "missing 'account' field"),
            ImportIssue::MissingData => write!(f, "missing 'data' field"),
            ImportIssue::NotJson(reason) => write!(f, "not a JSON document ({reason})"),
            ImportIssue::Malformed(reason) => write!(f, "malformed payload ({reason})"),
        }
    }
}

/// Main error type for blacklock operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid document name: {0}")]
    InvalidName(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    #[error("Folder not found: {0}")]
    FolderNotFound(String),

    #[error("No account has been created yet")]
    AccountNotFound,

    #[error("Backup not found: {0}")]
    BackupNotFound(String),

    #[error("Invalid backup format: {0}")]
    InvalidBackup(ImportIssue),

    // Invariant blocks (exit code 3)
    #[error("Cannot delete default category: {0}")]
    CannotDeleteDefault(String),

    #[error("An account already exists: {0}")]
    AccountExists(String),

    // Operation failures (exit code 4)
    #[error("Corrupt document {name}: {reason}")]
    CorruptDocument { name: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors
            Error::InvalidConfig(_)
            | Error::InvalidArgument(_)
            | Error::InvalidName(_)
            | Error::TaskNotFound(_)
            | Error::CategoryNotFound(_)
            | Error::FolderNotFound(_)
            | Error::AccountNotFound
            | Error::BackupNotFound(_)
            | Error::InvalidBackup(_) => exit_codes::USER_ERROR,

            // Invariant blocks
            Error::CannotDeleteDefault(_) | Error::AccountExists(_) => exit_codes::POLICY_BLOCKED,

            // Operation failures
            Error::CorruptDocument { .. }
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::Database(_)
            | Error::LockFailed(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured details for JSON error output, when the variant carries any.
    /// Machine-readable class matching the exit code.
    pub fn kind(&self) -> &'static str {
        match self.exit_code() {
            exit_codes::USER_ERROR => "user_error",
            exit_codes::POLICY_BLOCKED => "policy_blocked",
            _ => "operation_failed",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::CorruptDocument { name, reason } => Some(serde_json::json!({
                "document": name,
                "reason": reason,
            })),
            Error::InvalidBackup(issue) => Some(serde_json::json!({
                "issue": issue.to_string(),
            })),
            Error::LockFailed(path) => Some(serde_json::json!({
                "lock": path.display().to_string(),
            })),
            _ => None,
        }
    }
}

/// Result type alias for blacklock operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error body of a `--json` failure envelope
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub message: String,
    pub code: i32,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            message: err.to_string(),
            code: err.exit_code(),
            kind: err.kind(),
            details: err.details(),
        }
    }
}
