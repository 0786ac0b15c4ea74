//! Structured logging for codeclock using tracing.
//!
//! Logs to `<data_dir>/codeclock/logs/codeclock.{date}.log` with daily rotation,
//! keeping 7 files. `RUST_LOG` overrides the default filter and
//! `CODECLOCK_DEBUG_LOG=1` forces debug level.
//!
//! Stdout carries bridge events, so logs never go there. Falls back to stderr
//! when the file appender cannot be created.

use std::env;
use std::path::Path;

use fs_err as fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "codeclock=info,codeclock_core=info";

/// Installs the global subscriber. Keep the returned guard alive until exit
/// so buffered lines are flushed.
pub fn init(logs_dir: Option<&Path>) -> Option<WorkerGuard> {
    let appender = logs_dir.and_then(|dir| {
        let _ = fs::create_dir_all(dir);
        create_file_appender(dir).ok()
    });

    match appender {
        Some(file_appender) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::registry()
                .with(env_filter())
                .with(
                    fmt::layer()
                        .with_writer(non_blocking)
                        .with_timer(fmt::time::UtcTime::rfc_3339())
                        .with_ansi(false),
                )
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter())
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_timer(fmt::time::UtcTime::rfc_3339())
                        .with_ansi(true),
                )
                .init();
            None
        }
    }
}

fn env_filter() -> EnvFilter {
    if debug_forced(env::var("CODECLOCK_DEBUG_LOG").ok().as_deref()) {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

fn debug_forced(value: Option<&str>) -> bool {
    matches!(value, Some("1" | "true" | "TRUE" | "yes" | "YES"))
}

fn create_file_appender(
    logs_dir: &Path,
) -> Result<RollingFileAppender, tracing_appender::rolling::InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("codeclock")
        .filename_suffix("log")
        .max_log_files(7)
        .build(logs_dir)
}
