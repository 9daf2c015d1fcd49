//! Shared fixtures for the integration tests.

// Not every helper is used by every test module
#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary working directory with its own settings file and cache.
pub struct TestProject {
    temp: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let cache_dir = temp.path().join("cache");
        let settings = format!("shell = \"sh\"\ncache_dir = {:?}\n", cache_dir.display().to_string());
        fs::write(temp.path().join("settings.toml"), settings).unwrap();
        Self {
            temp,
        }
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.temp.path().join("cache")
    }

    /// Write `content` to `name` inside the project and return its path.
    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    /// The binary, run inside the project with the project's settings.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("conftree").unwrap();
        cmd.current_dir(self.temp.path())
            .env_remove("RUST_LOG")
            .arg("--config")
            .arg(self.temp.path().join("settings.toml"));
        cmd
    }

    /// Like [`TestProject::cmd`] but never touching the cache.
    pub fn uncached(&self) -> Command {
        let mut cmd = self.cmd();
        cmd.arg("-c");
        cmd
    }
}
