//! Durable state store for timer records.
//!
//! Two JSON documents, one per record kind:
//!
//! ```json
//! // timer.json
//! { "secondsTotal": 5120 }
//!
//! // project-timers.json
//! {
//!   "/repo/a": { "secondsTotal": 5, "dailyTimes": { "2024-01-10": 3, "2024-01-11": 2 } }
//! }
//! ```
//!
//! # Defensive Design
//!
//! Loads never fail. A missing file, an empty file or content that does not
//! parse as the expected shape yields the zero value, and the reason is logged.
//! Losing accumulated time after corruption is preferred over refusing to start.
//!
//! # Atomic Writes
//!
//! Every save rewrites the whole document through a temp file in the same
//! directory followed by a rename, so a reader never observes a partial file
//! and saving once per second does not accumulate handles.

use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{ClockError, Result};
use crate::storage::StorageConfig;
use crate::types::{GlobalTimerRecord, ProjectRecords};

/// Reads and writes the global record and the project record mapping.
#[derive(Debug, Clone)]
pub struct TimeStore {
    storage: StorageConfig,
}

impl TimeStore {
    pub fn new(storage: StorageConfig) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &StorageConfig {
        &self.storage
    }

    /// Loads the global record, or `{secondsTotal: 0}` when unavailable.
    pub fn load_global(&self) -> GlobalTimerRecord {
        load_or_default(&self.storage.global_timer_file(), "global timer")
    }

    /// Overwrites the global record file.
    pub fn save_global(&self, record: &GlobalTimerRecord) -> Result<()> {
        write_atomic(&self.storage.global_timer_file(), record)
    }

    /// Loads every project record, or an empty mapping when unavailable.
    pub fn load_project_records(&self) -> ProjectRecords {
        let records: ProjectRecords =
            load_or_default(&self.storage.project_timers_file(), "project timers");
        for (path, record) in &records {
            if !record.is_consistent() {
                warn!(
                    project = %path,
                    seconds_total = record.seconds_total,
                    bucket_sum = record.bucket_sum(),
                    "Project record total does not match its day buckets"
                );
            }
        }
        records
    }

    /// Overwrites the project record file with the full mapping.
    pub fn save_project_records(&self, records: &ProjectRecords) -> Result<()> {
        write_atomic(&self.storage.project_timers_file(), records)
    }
}

fn load_or_default<T: DeserializeOwned + Default>(path: &Path, label: &str) -> T {
    let content = match fs_err::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No {} file yet, starting from zero", label);
            return T::default();
        }
        Err(err) => {
            warn!(error = %err, "Failed to read {} file, starting from zero", label);
            return T::default();
        }
    };

    if content.trim().is_empty() {
        debug!(path = %path.display(), "{} file is empty, starting from zero", label);
        return T::default();
    }

    match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(err) => {
            warn!(
                error = %err,
                path = %path.display(),
                "Failed to parse {} file, starting from zero",
                label
            );
            T::default()
        }
    }
}

fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value).map_err(|e| ClockError::Json {
        context: format!("Failed to serialize {}", path.display()),
        source: e,
    })?;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs_err::create_dir_all(dir).map_err(|e| ClockError::Io {
        context: "Failed to create data directory".to_string(),
        source: e,
    })?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| ClockError::Io {
        context: "Failed to create temp file".to_string(),
        source: e,
    })?;

    tmp.write_all(content.as_bytes()).map_err(|e| ClockError::Io {
        context: "Failed to write temp file".to_string(),
        source: e,
    })?;

    tmp.flush().map_err(|e| ClockError::Io {
        context: "Failed to flush temp file".to_string(),
        source: e,
    })?;

    tmp.persist(path).map_err(|e| ClockError::Io {
        context: format!("Failed to persist {}", path.display()),
        source: e.error,
    })?;

    Ok(())
}
