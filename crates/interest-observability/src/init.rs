// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Unified logging initialization
//!
//! Console output always goes to stderr so that binaries can stream records
//! on stdout. With the `file-logging` feature a JSON log is also written to a
//! timestamped run folder:
//! ```text
//! ./logs/
//!   └── run_20250101_120000/
//!       └── interestingness.log
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;

/// Options taken from the `[logging]` configuration section
#[derive(Debug, Clone)]
pub struct LoggingOptions {
    /// Level for crates without a debug flag (trace, debug, info, warn, error)
    pub default_level: String,
    /// Base directory for file logs; `None` disables file logging
    pub log_dir: Option<PathBuf>,
    /// Keep run folders for N days
    pub retention_days: u64,
    /// Keep the N most recent run folders
    pub retention_runs: usize,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            default_level: "info".to_string(),
            log_dir: None,
            retention_days: 30,
            retention_runs: 10,
        }
    }
}

/// Keeps file writers alive; logs are flushed when this is dropped
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guards: Vec<tracing_appender::non_blocking::WorkerGuard>,
    log_dir: Option<PathBuf>,
}

impl LoggingGuard {
    /// Run folder holding this process's log files, if file logging is active
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

/// Initialize logging with console output and optional file output
///
/// # Errors
///
/// Fails if the filter string is malformed, the log folder cannot be created,
/// or a global subscriber is already installed.
pub fn init_logging(debug_flags: &CrateDebugFlags, options: &LoggingOptions) -> Result<LoggingGuard> {
    let filter = debug_flags.to_filter_string(&options.default_level);
    let env_filter = EnvFilter::try_new(&filter)
        .with_context(|| format!("Invalid log filter '{}'", filter))?;

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_filter(env_filter)
        .boxed();
    layers.push(console_layer);

    #[cfg(feature = "file-logging")]
    let (file_guards, run_folder) = match &options.log_dir {
        Some(base_log_dir) => {
            let run_folder = base_log_dir.join(run_folder_name(chrono::Utc::now()));
            std::fs::create_dir_all(&run_folder).with_context(|| {
                format!("Failed to create log directory: {}", run_folder.display())
            })?;
            cleanup_old_logs(base_log_dir, options.retention_days, options.retention_runs)?;

            let appender = tracing_appender::rolling::daily(&run_folder, "interestingness.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .json()
                .with_filter(EnvFilter::try_new(&filter)?)
                .boxed();
            layers.push(file_layer);
            (vec![guard], Some(run_folder))
        }
        None => (Vec::new(), None),
    };

    Registry::default()
        .with(layers)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    #[cfg(not(feature = "file-logging"))]
    if let Some(dir) = &options.log_dir {
        tracing::warn!(
            "File logging to {} requested but this build lacks the file-logging feature",
            dir.display()
        );
    }

    Ok(LoggingGuard {
        #[cfg(feature = "file-logging")]
        _file_guards: file_guards,
        #[cfg(feature = "file-logging")]
        log_dir: run_folder,
        #[cfg(not(feature = "file-logging"))]
        log_dir: None,
    })
}

/// Initialize console-only logging at `default_level`
pub fn init_logging_default(debug_flags: &CrateDebugFlags) -> Result<LoggingGuard> {
    init_logging(debug_flags, &LoggingOptions::default())
}

#[cfg(feature = "file-logging")]
const RUN_FOLDER_FORMAT: &str = "%Y%m%d_%H%M%S";

#[cfg(feature = "file-logging")]
fn run_folder_name(now: chrono::DateTime<chrono::Utc>) -> String {
    format!("run_{}", now.format(RUN_FOLDER_FORMAT))
}

/// Remove run folders older than `retention_days`, then keep at most `retention_runs`
#[cfg(feature = "file-logging")]
fn cleanup_old_logs(base_log_dir: &Path, retention_days: u64, retention_runs: usize) -> Result<()> {
    use chrono::{DateTime, NaiveDateTime, Utc};

    if !base_log_dir.exists() {
        return Ok(());
    }

    let cutoff_date = Utc::now() - chrono::Duration::days(retention_days as i64);

    let mut runs: Vec<(PathBuf, DateTime<Utc>)> = Vec::new();
    for entry in std::fs::read_dir(base_log_dir)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let stamp = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix("run_"))
            .and_then(|s| NaiveDateTime::parse_from_str(s, RUN_FOLDER_FORMAT).ok());
        if let Some(stamp) = stamp {
            runs.push((path, stamp.and_utc()));
        }
    }

    // Oldest first
    runs.sort_by_key(|(_, dt)| *dt);

    let (expired, kept): (Vec<_>, Vec<_>) = runs.into_iter().partition(|(_, dt)| *dt < cutoff_date);
    let excess = kept.len().saturating_sub(retention_runs);

    for (path, _) in expired.iter().chain(kept.iter().take(excess)) {
        if let Err(e) = std::fs::remove_dir_all(path) {
            eprintln!("Warning: Failed to remove old log directory {}: {}", path.display(), e);
        }
    }

    Ok(())
}
