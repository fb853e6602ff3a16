//! Shared logging utilities for consistent tracing across all processes
//!
//! Every process of a scheduler group (client, monitor, daemon head, workers)
//! logs through the same subscriber configuration. Events emitted with the
//! `process_*` macros carry the role of the emitting process, which is what
//! makes interleaved output from forked children readable.

use chrono::{DateTime, Utc};
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tracing::{error, info};

use crate::types::ProcessRole;

/// Default filter when `RUST_LOG` is not set
fn level_filter(base_level: &str) -> String {
    format!("scheduler={base_level},shared={base_level}")
}

/// Initialize tracing with an optional log level and optional log file.
///
/// A daemon that detaches its standard streams can only be observed through
/// the log file, so the file (when given) replaces stderr entirely.
pub fn init_tracing_with_level(log_level: Option<&str>, log_file: Option<&Path>) -> io::Result<()> {
    use tracing_subscriber::{EnvFilter, fmt};

    let base_level = log_level.unwrap_or("info");
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_filter(base_level)));

    let builder = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact();

    // A second init (tests, re-entry after fork) keeps the first subscriber
    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let _ = builder.with_ansi(false).with_writer(Mutex::new(file)).try_init();
        }
        None => {
            let _ = builder.with_writer(io::stderr).try_init();
        }
    }
    Ok(())
}

/// Get formatted timestamp for consistent logging
pub fn format_timestamp() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.format("%H:%M:%S%.3f").to_string()
}

/// Macro for process-aware info logging
#[macro_export]
macro_rules! process_info {
    ($role:expr, $($arg:tt)*) => {
        tracing::info!(
            process = %$role,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for process-aware warning logging
#[macro_export]
macro_rules! process_warn {
    ($role:expr, $($arg:tt)*) => {
        tracing::warn!(
            process = %$role,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for process-aware error logging
#[macro_export]
macro_rules! process_error {
    ($role:expr, $($arg:tt)*) => {
        tracing::error!(
            process = %$role,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for process-aware debug logging
#[macro_export]
macro_rules! process_debug {
    ($role:expr, $($arg:tt)*) => {
        tracing::debug!(
            process = %$role,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Contextual logging helper for startup messages
pub fn log_startup(role: &ProcessRole, details: &str) {
    info!(
        process = %role,
        pid = std::process::id(),
        timestamp = format_timestamp(),
        "Starting {}",
        details
    );
}

/// Contextual logging helper for shutdown messages
pub fn log_shutdown(role: &ProcessRole, reason: &str) {
    info!(
        process = %role,
        pid = std::process::id(),
        timestamp = format_timestamp(),
        "Shutting down: {}",
        reason
    );
}

/// Contextual logging helper for error conditions
pub fn log_error(role: &ProcessRole, context: &str, error: &dyn std::fmt::Display) {
    error!(
        process = %role,
        timestamp = format_timestamp(),
        error = %error,
        "{} failed: {}",
        context,
        error
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_filter_covers_both_crates() {
        let filter = level_filter("debug");
        assert!(filter.contains("scheduler=debug"));
        assert!(filter.contains("shared=debug"));
    }

    #[test]
    fn test_format_timestamp_shape() {
        let stamp = format_timestamp();
        // HH:MM:SS.mmm
        assert_eq!(stamp.len(), 12);
        assert_eq!(&stamp[2..3], ":");
        assert_eq!(&stamp[8..9], ".");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_tracing_with_level(None, None).unwrap();
        init_tracing_with_level(Some("debug"), None).unwrap();
        process_info!(ProcessRole::current(), "logging initialised");
    }
}
