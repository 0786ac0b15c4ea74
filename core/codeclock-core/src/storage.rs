//! Storage configuration and path management for codeclock.
//!
//! All on-disk locations are decided here so that the store, the config loader
//! and the binary's log setup agree on one per-user application-data directory.
//!
//! Production code uses [`StorageConfig::new`], which resolves
//! `<data_dir>/codeclock` through the `dirs` crate
//! (`~/.local/share/codeclock` on Linux, `~/Library/Application Support/codeclock`
//! on macOS). Tests use [`StorageConfig::with_root`] with a temp directory.

use crate::error::{ClockError, Result};
use std::path::{Path, PathBuf};

/// Directory name under the platform data directory.
pub const APP_DIR_NAME: &str = "codeclock";

/// Central configuration for all codeclock storage paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    root: PathBuf,
}

impl StorageConfig {
    /// Resolves the default per-user root.
    pub fn new() -> Result<Self> {
        let data_dir = dirs::data_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
            .ok_or(ClockError::StorageUnavailable)?;
        Ok(Self {
            root: data_dir.join(APP_DIR_NAME),
        })
    }

    /// Creates a StorageConfig with a custom root directory.
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    /// Returns the root directory for codeclock data.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Files
    // ─────────────────────────────────────────────────────────────────────────────

    /// Path to timer.json (global editor counter).
    pub fn global_timer_file(&self) -> PathBuf {
        self.root.join("timer.json")
    }

    /// Path to project-timers.json (path → per-project record).
    pub fn project_timers_file(&self) -> PathBuf {
        self.root.join("project-timers.json")
    }

    /// Path to config.toml (user preferences).
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    /// Path to logs/ directory (rolling log files).
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Ensures the root directory exists.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        fs_err::create_dir_all(&self.root)
    }
}
