#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use blacklock::app::App;
use blacklock::backup::BackupManager;
use blacklock::prefs::Preferences;
use blacklock::repository::Repository;
use blacklock::store::DocumentStore;
use serde_json::Value;
use tempfile::TempDir;

/// A throwaway base directory
pub struct TestBase {
    dir: TempDir,
}

impl TestBase {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_file(&self, rel_path: &str, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn store(&self) -> DocumentStore {
        DocumentStore::for_base(self.path())
    }

    pub fn prefs(&self) -> Preferences {
        Preferences::for_base(self.path())
    }

    pub fn repo(&self) -> Repository {
        Repository::new(self.store())
    }

    pub fn backups(&self) -> BackupManager {
        BackupManager::new(self.store(), self.prefs())
    }

    /// App over this base, initialized
    pub fn app(&self) -> App {
        let app = App::open(self.path());
        app.initialize().expect("initialize");
        app
    }

    /// `blacklock --dir <base>`
    pub fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::cargo_bin("blacklock").expect("binary");
        cmd.arg("--dir").arg(self.path()).env_remove("BLACKLOCK_DIR");
        cmd
    }

    /// Run a command with `--json` and return the parsed envelope.
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self.cmd().arg("--json").args(args).output().expect("run");
        serde_json::from_slice(&output.stdout).unwrap_or_else(|err| {
            panic!(
                "{args:?}: stdout is not JSON ({err}): {}",
                String::from_utf8_lossy(&output.stdout)
            )
        })
    }
}
