//! Process-wide audit logging.
//!
//! One durable sink and one live sink: a daily-rolling audit file under
//! the configured logs directory, and stderr for diagnostics. Rotated
//! files older than the retention window are pruned at init. Initialize
//! once at startup and hold the returned guard for the process lifetime
//! so buffered audit lines are flushed on shutdown.

use std::fs;
use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime};

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::Settings;

/// File name prefix for the rolling audit log.
pub const AUDIT_LOG_PREFIX: &str = "audit.log";

/// Errors from logging initialization.
#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Failed to create log directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to initialize logging: {0}")]
    Init(String),
}

/// Keeps the non-blocking audit writer alive.
///
/// Dropping the guard flushes and stops the background writer thread.
pub struct AuditGuard {
    _worker: WorkerGuard,
}

/// Initialize the global logging sinks.
///
/// Fails if a global subscriber is already installed.
pub fn init(settings: &Settings) -> Result<AuditGuard, LoggingError> {
    let log_dir = &settings.paths.logs_dir;
    fs::create_dir_all(log_dir).map_err(|source| LoggingError::CreateDir {
        path: log_dir.display().to_string(),
        source,
    })?;

    prune_old_logs(log_dir, settings.logging.retention_days);

    let appender = tracing_appender::rolling::daily(log_dir, AUDIT_LOG_PREFIX);
    let (file_writer, worker) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.logging.default_filter.as_str()));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    Ok(AuditGuard { _worker: worker })
}

/// Remove rotated audit files older than the retention window.
///
/// Best-effort: unreadable entries are skipped, never fatal.
pub fn prune_old_logs(log_dir: &Path, retention_days: u32) {
    let cutoff = Duration::from_secs(u64::from(retention_days) * 24 * 60 * 60);
    let now = SystemTime::now();

    let entries = match fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(_) => return,
    };

    for entry in entries.flatten() {
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(AUDIT_LOG_PREFIX) {
            continue;
        }
        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(_) => continue,
        };
        let age = match now.duration_since(modified) {
            Ok(age) => age,
            Err(_) => continue,
        };
        if age > cutoff {
            if fs::remove_file(entry.path()).is_ok() {
                tracing::debug!("pruned expired audit log {}", entry.path().display());
            }
        }
    }
}
