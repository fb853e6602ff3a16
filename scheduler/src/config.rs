//! Runtime configuration and the JSON task file format

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;

use shared::{ProcessRole, process_warn};

use crate::catalog::{TaskCatalog, TaskDefinition, TaskOutcome, TaskTarget};
use crate::error::{SchedulerError, SchedulerResult};
use crate::signals::SignalDispatch;

/// Default process-title prefix and channel key
pub const DEFAULT_PREFIX: &str = "scheduler";

/// Default number of one-second iterations the monitor waits for reports
pub const DEFAULT_REPORT_WAIT_SECS: u64 = 10;

/// Settings shared by every process of one scheduler group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Prefix of worker process titles (`{prefix}_{alias}`)
    pub prefix: String,
    /// Identity of the command channel; defaults to the prefix
    pub ipc_key: Option<String>,
    /// Detach into the background before allocating workers
    pub daemon: bool,
    /// Change the daemon's working directory to `/`
    pub chdir_root: bool,
    /// Point the daemon's stdin/stdout/stderr at `/dev/null`
    pub close_std_streams: bool,
    /// Let signals interrupt waits instead of pumping them once per quantum
    pub async_signals: bool,
    /// How long the monitor waits for the startup report
    pub report_wait_secs: u64,
    pub log_file: Option<PathBuf>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            ipc_key: None,
            daemon: false,
            chdir_root: true,
            close_std_streams: true,
            async_signals: false,
            report_wait_secs: DEFAULT_REPORT_WAIT_SECS,
            log_file: None,
        }
    }
}

impl SchedulerConfig {
    pub fn channel_key(&self) -> &str {
        self.ipc_key.as_deref().unwrap_or(&self.prefix)
    }

    pub fn signal_dispatch(&self) -> SignalDispatch {
        if self.async_signals {
            SignalDispatch::Asynchronous
        } else {
            SignalDispatch::Synchronous
        }
    }

    pub fn validate(&self) -> SchedulerResult<()> {
        if self.prefix.trim().is_empty() {
            return Err(SchedulerError::config("prefix must not be empty"));
        }
        if self.channel_key().trim().is_empty() {
            return Err(SchedulerError::config("ipc_key must not be empty"));
        }
        if self.report_wait_secs == 0 {
            return Err(SchedulerError::config("report_wait_secs must be at least 1"));
        }
        Ok(())
    }
}

/// One entry of a task file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskFileEntry {
    pub alias: String,
    /// Seconds between invocations
    pub interval: u64,
    #[serde(default = "default_workers")]
    pub workers: u32,
    /// Shell command run through `sh -c` at every firing
    pub command: String,
}

fn default_workers() -> u32 {
    1
}

/// Load a JSON task file into a catalog of shell-command tasks
pub fn load_task_file(path: &Path) -> SchedulerResult<TaskCatalog> {
    let content = std::fs::read_to_string(path)?;
    let entries: Vec<TaskFileEntry> = serde_json::from_str(&content)?;
    catalog_from_entries(entries)
}

pub fn catalog_from_entries(entries: Vec<TaskFileEntry>) -> SchedulerResult<TaskCatalog> {
    let mut catalog = TaskCatalog::new();
    for entry in entries {
        if entry.command.trim().is_empty() {
            return Err(SchedulerError::invalid_task(entry.alias, "command must not be empty"));
        }
        let command = entry.command;
        let target = TaskTarget::function(move || run_shell(&command));
        catalog.add(TaskDefinition::new(entry.alias, entry.interval, entry.workers, target)?)?;
    }
    Ok(catalog)
}

/// Run one shell command to completion.
///
/// Failing to spawn is an error (and ends the worker); a non-zero exit is only
/// reported, the next firing still happens.
fn run_shell(command: &str) -> TaskOutcome {
    let status = Command::new("sh").arg("-c").arg(command).status()?;
    if !status.success() {
        process_warn!(ProcessRole::current(), "Command '{}' exited with {}", command, status);
    }
    Ok(())
}
