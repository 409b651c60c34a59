//! Document store for blacklock
//!
//! Every domain collection is one named document inside the store root:
//!
//! ```text
//! <base>/
//!   preferences.json            # settings slot (see `prefs`), not a document
//!   blacklock/                  # document store root
//!     account.json              # Account or null
//!     tasks.json                # [Task]
//!     categories.json           # [Category]
//!     folders.json              # [Folder]
//!     logs.json                 # [LogEntry], newest last
//!     backups/                  # reserved for the backup manager
//!       backup-YYYY-MM-DD-HH-MM-SS.json
//! ```
//!
//! Documents are written atomically and, by default, compressed (see
//! `codec`). Reads accept compressed and plain JSON documents alike.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::codec::{self, Encoding};
use crate::error::{Error, Result};
use crate::lock;

/// Name of the document store directory under the base directory
pub const STORE_DIR: &str = "blacklock";

/// Name of the reserved backup subdirectory inside the store root
pub const BACKUP_DIR: &str = "backups";

/// Well-known document names
pub mod documents {
    pub const ACCOUNT: &str = "account.json";
    pub const TASKS: &str = "tasks.json";
    pub const CATEGORIES: &str = "categories.json";
    pub const FOLDERS: &str = "folders.json";
    pub const LOGS: &str = "logs.json";
}

/// Key-to-document storage with transparent compression
#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
    compression: bool,
}

impl DocumentStore {
    /// Create a store rooted at `root` with compression enabled.
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            compression: true,
        }
    }

    /// Create the store for a base directory (`<base>/blacklock`).
    pub fn for_base(base: &Path) -> Self {
        Self::new(base.join(STORE_DIR))
    }

    /// Globally enable or disable compression for saves.
    ///
    /// With compression disabled every save is pretty-printed JSON, which is
    /// handy for debugging a store by hand.
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compression = enabled;
        self
    }

    // =========================================================================
    // Path accessors
    // =========================================================================

    /// Path to the store root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to the reserved backup directory
    pub fn backups_dir(&self) -> PathBuf {
        self.root.join(BACKUP_DIR)
    }

    /// Whether saves compress by default
    pub fn compression_enabled(&self) -> bool {
        self.compression
    }

    /// Resolve a document name to its path, rejecting anything that would
    /// escape the store root or collide with the backup directory.
    pub fn document_path(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }

    // =========================================================================
    // Directory initialization
    // =========================================================================

    /// Create the store root and backup directory.
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        fs::create_dir_all(self.backups_dir())?;
        Ok(())
    }

    /// Whether the store root exists yet
    pub fn is_initialized(&self) -> bool {
        self.root.is_dir()
    }

    // =========================================================================
    // Document operations
    // =========================================================================

    /// Serialize `value` and write it under `name`.
    ///
    /// `compress` is honored only while store-wide compression is enabled.
    pub fn save<T: Serialize + ?Sized>(&self, name: &str, value: &T, compress: bool) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.save_value(name, &value, compress)
    }

    /// Write an already-built JSON value under `name`.
    pub fn save_value(&self, name: &str, value: &Value, compress: bool) -> Result<()> {
        let path = self.document_path(name)?;
        fs::create_dir_all(&self.root)?;

        let compress = compress && self.compression;
        let content = codec::encode(value, compress)?;
        lock::write_atomic(&path, content.as_bytes()).map_err(|err| {
            tracing::error!(document = name, error = %err, "failed to save document");
            err
        })?;

        tracing::debug!(
            document = name,
            compressed = compress,
            bytes = content.len(),
            "saved document"
        );
        Ok(())
    }

    /// Write several documents as one unit.
    ///
    /// If any write fails, the documents this call already wrote are put
    /// back to their previous bytes (or removed when they did not exist)
    /// and the failing write's error is returned.
    pub fn save_all(&self, docs: &[(&str, Value)], compress: bool) -> Result<()> {
        let mut previous = Vec::with_capacity(docs.len());
        for (name, _) in docs {
            previous.push(self.read_raw(name)?);
        }

        for (idx, (name, value)) in docs.iter().enumerate() {
            if let Err(err) = self.save_value(name, value, compress) {
                for ((written, _), before) in docs[..idx].iter().zip(&previous).rev() {
                    self.put_back(written, before.as_deref());
                }
                return Err(err);
            }
        }
        Ok(())
    }

    /// Raw bytes of a regular-file document, `None` otherwise
    fn read_raw(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.document_path(name)?;
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(fs::read(&path)?))
    }

    fn put_back(&self, name: &str, before: Option<&[u8]>) {
        let restored = match before {
            Some(bytes) => self
                .document_path(name)
                .and_then(|path| lock::write_atomic(&path, bytes)),
            None => self.delete(name),
        };
        match restored {
            Ok(()) => tracing::warn!(document = name, "rolled back partial write"),
            Err(err) => {
                tracing::error!(document = name, error = %err, "failed to roll back document")
            }
        }
    }

    /// Load `name`, returning `default` when the document does not exist.
    ///
    /// A document that exists but cannot be decoded, or does not match the
    /// requested type, is reported as [`Error::CorruptDocument`].
    pub fn load<T: DeserializeOwned>(&self, name: &str, default: T) -> Result<T> {
        let Some(value) = self.load_value(name)? else {
            tracing::debug!(document = name, "document absent, using default");
            return Ok(default);
        };

        serde_json::from_value(value).map_err(|err| Error::CorruptDocument {
            name: name.to_string(),
            reason: format!("unexpected shape: {err}"),
        })
    }

    /// Load the raw JSON value of `name`, or `None` when absent.
    pub fn load_value(&self, name: &str) -> Result<Option<Value>> {
        let path = self.document_path(name)?;
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(Error::Io(err)),
        };

        match codec::decode(&content) {
            Ok((value, encoding)) => {
                tracing::debug!(
                    document = name,
                    compressed = encoding == Encoding::Compressed,
                    "loaded document"
                );
                Ok(Some(value))
            }
            Err(reason) => {
                tracing::error!(document = name, %reason, "document is corrupt");
                Err(Error::CorruptDocument {
                    name: name.to_string(),
                    reason,
                })
            }
        }
    }

    /// Whether a document exists
    pub fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.document_path(name)?.is_file())
    }

    /// Remove a document. Removing an absent document is not an error.
    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.document_path(name)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(document = name, "deleted document");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Error::Io(err)),
        }
    }

    /// List top-level documents (sorted), excluding the backup directory and
    /// in-flight temp files.
    pub fn list(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(Error::Io(err)),
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .filter(|name| !lock::is_temp_name(name) && !name.starts_with('.'))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Size of a document in bytes (0 when absent)
    pub fn file_size(&self, name: &str) -> Result<u64> {
        let path = self.document_path(name)?;
        match fs::metadata(&path) {
            Ok(meta) => Ok(meta.len()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(err) => Err(Error::Io(err)),
        }
    }
}

fn validate_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name == BACKUP_DIR
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
        || name.starts_with('.');
    if invalid {
        return Err(Error::InvalidName(name.to_string()));
    }
    Ok(())
}
