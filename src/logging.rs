//! Logging setup.
//!
//! Logs go to `/tmp/waymark/` (cleared on every start) and to stderr.
//! `WAYMARK_LOG` takes an `EnvFilter` directive, e.g. `WAYMARK_LOG=debug` or
//! `WAYMARK_LOG=waymark_lib::import=trace`. By default everything logs at
//! `info` except the import pipeline, which also logs staging and decoding
//! steps at `debug`.

use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_DIR: &str = "/tmp/waymark";
const LOG_ENV: &str = "WAYMARK_LOG";
const MAX_LOG_FILES: usize = 5;
const DEFAULT_DIRECTIVES: &str = "info,waymark_lib::import=debug";

/// Install the global subscriber: daily rolling file under [`LOG_DIR`] plus
/// stderr. Falls back to stderr only when the log directory is unusable.
pub fn init_logging() {
    let log_dir = log_dir();

    if log_dir.exists() {
        if let Err(e) = std::fs::remove_dir_all(&log_dir) {
            eprintln!("[logging] failed to clear old logs: {e}");
        }
    }
    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("[logging] failed to create log directory: {e}");
    }

    let file_appender = match RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("waymark")
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(&log_dir)
    {
        Ok(appender) => Some(appender),
        Err(e) => {
            eprintln!("[logging] failed to create file appender: {e}");
            None
        }
    };

    let filter = log_filter(std::env::var(LOG_ENV).ok().as_deref());
    let subscriber = tracing_subscriber::registry().with(filter);

    if let Some(appender) = file_appender {
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        // The writer thread must outlive every log call.
        std::mem::forget(guard);

        subscriber
            .with(
                fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true),
            )
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true),
            )
            .init();
    }

    tracing::info!(dir = LOG_DIR, "logging initialized");
}

/// Filter from a `WAYMARK_LOG` value. Unset, blank or invalid values use the defaults.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    match directives.map(str::trim).filter(|d| !d.is_empty()) {
        Some(d) => EnvFilter::try_new(d).unwrap_or_else(|e| {
            eprintln!("[logging] invalid {LOG_ENV} value {d:?}: {e}");
            EnvFilter::new(DEFAULT_DIRECTIVES)
        }),
        None => EnvFilter::new(DEFAULT_DIRECTIVES),
    }
}

pub fn log_dir() -> PathBuf {
    PathBuf::from(LOG_DIR)
}
