//! Scheduler-specific error types

use shared::SharedError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Command channel initialisation failed at {path}: {source}")]
    ChannelInit {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to fork {context}: {errno}")]
    ForkFailed { context: String, errno: nix::errno::Errno },

    #[error("Failed to start a new session: {errno}")]
    SessionFailed { errno: nix::errno::Errno },

    #[error("Signal operation failed: {operation}: {errno}")]
    SignalError { operation: String, errno: nix::errno::Errno },

    #[error("Failed to detach from the terminal: {message}")]
    DetachFailed { message: String },

    #[error("Configuration error: {field}")]
    ConfigurationError { field: String },

    #[error("Invalid task '{alias}': {reason}")]
    InvalidTask { alias: String, reason: String },

    #[error("Timed out after {seconds}s waiting for {action}")]
    ReplyTimeout { action: String, seconds: u64 },

    #[error("Shared component error: {0}")]
    SharedError(#[from] SharedError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl SchedulerError {
    pub fn config(field: impl Into<String>) -> Self {
        SchedulerError::ConfigurationError { field: field.into() }
    }

    pub fn invalid_task(alias: impl Into<String>, reason: impl Into<String>) -> Self {
        SchedulerError::InvalidTask {
            alias: alias.into(),
            reason: reason.into(),
        }
    }

    pub fn fork(context: impl Into<String>, errno: nix::errno::Errno) -> Self {
        SchedulerError::ForkFailed {
            context: context.into(),
            errno,
        }
    }

    pub fn signal(operation: impl Into<String>, errno: nix::errno::Errno) -> Self {
        SchedulerError::SignalError {
            operation: operation.into(),
            errno,
        }
    }
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
