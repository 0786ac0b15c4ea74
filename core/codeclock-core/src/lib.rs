//! # codeclock-core
//!
//! Time accounting for an external code editor: a global timer that counts
//! seconds while the editor is running, and one timer per launched project
//! that counts seconds while the project is open, bucketed by calendar day.
//!
//! ## Design Principles
//!
//! - **Memory is authoritative**: Records live in memory while running and are
//!   written through on every increment. A failed write is logged and retried
//!   by the next write; it never stops a timer.
//! - **Graceful degradation**: Missing or corrupt files load as empty records.
//!   Probe failures, panics and timeouts count as "not active".
//! - **Atomic persistence**: Files are replaced via temp-file + rename, so a
//!   crash never leaves a half-written record.
//! - **Pluggable edges**: Process inspection, editor launching, the calendar
//!   and event delivery are traits so the engine runs headless in tests.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use codeclock_core::{ChannelSink, ClockConfig, StorageConfig, TimerEngine};
//! use std::sync::Arc;
//!
//! let storage = StorageConfig::new()?;
//! let config = ClockConfig::load(&storage.config_file())?;
//! let (sink, mut events) = ChannelSink::new();
//! let engine = TimerEngine::from_config(storage, &config, Arc::new(sink));
//! engine.start_global(true);
//! engine.launch_project("/home/me/src/app")?;
//! ```

pub mod activity;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod format;
pub mod launcher;
pub mod rollup;
pub mod storage;
pub mod store;
pub mod types;

pub use activity::{ActivityDetector, ActivityMonitor, SystemActivityDetector};
pub use clock::{Clock, SystemClock};
pub use config::{ClockConfig, DetectionConfig, EditorConfig, PathMatch};
pub use engine::{EngineParts, TimerEngine};
pub use error::{ClockError, Result};
pub use events::{ChannelSink, EventSink, TimerEvent};
pub use format::format_duration;
pub use launcher::{locate_editor, EditorExit, EditorLauncher, ExitWatch, SystemEditorLauncher};
pub use rollup::{
    date_key, recent_window_seconds, recent_window_seconds_on, summarize, summarize_all,
    TimeSummary, ROLLING_WINDOW_DAYS,
};
pub use storage::StorageConfig;
pub use store::TimeStore;
pub use types::{DailyTimes, GlobalTimerRecord, ProjectRecords, ProjectTimerRecord};
