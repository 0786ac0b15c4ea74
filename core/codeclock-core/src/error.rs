//! Error types for codeclock-core operations.
//!
//! Loaders in [`crate::store`] never return these; they degrade to defaults.
//! Writers, the launcher and config parsing do.

use std::path::PathBuf;

/// All errors that can occur in codeclock-core operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    #[error("Application data directory could not be resolved")]
    StorageUnavailable,

    // ─────────────────────────────────────────────────────────────────────
    // Editor Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Editor executable not found (searched: {})", format_searched(.searched))]
    EditorNotFound { searched: Vec<PathBuf> },

    #[error("Failed to launch editor: {command}: {source}")]
    LaunchFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command execution failed: {command}: {details}")]
    CommandFailed { command: String, details: String },

    // ─────────────────────────────────────────────────────────────────────
    // I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

fn format_searched(searched: &[PathBuf]) -> String {
    if searched.is_empty() {
        return "nothing".to_string();
    }
    searched
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convenience type alias for Results using ClockError.
pub type Result<T> = std::result::Result<T, ClockError>;

impl From<ClockError> for String {
    fn from(err: ClockError) -> String {
        err.to_string()
    }
}
