//! Worker bookkeeping types
//!
//! One `ProcessRecord` exists per forked worker. Records are owned and mutated
//! only by the supervisor; everyone else sees copies carried in reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Interval, TaskName};

/// Lifecycle of a worker as observed by the supervisor
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Active,
    Stopped,
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordStatus::Active => write!(f, "active"),
            RecordStatus::Stopped => write!(f, "stopped"),
        }
    }
}

/// Supervisor's entry for one forked worker
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProcessRecord {
    pub pid: i32,
    #[serde(rename = "ppid")]
    pub parent_pid: i32,
    pub task_name: TaskName,
    #[serde(rename = "started")]
    pub started_at: DateTime<Utc>,
    #[serde(rename = "timer")]
    pub interval: Interval,
    status: RecordStatus,
}

impl ProcessRecord {
    /// New record for a freshly forked worker; always starts `Active`
    pub fn new(pid: i32, parent_pid: i32, task_name: TaskName, interval: Interval) -> Self {
        Self {
            pid,
            parent_pid,
            task_name,
            started_at: Utc::now(),
            interval,
            status: RecordStatus::Active,
        }
    }

    pub fn status(&self) -> RecordStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == RecordStatus::Active
    }

    /// Active -> Stopped. A stopped record is never revived.
    ///
    /// Returns true only on the call that performed the transition.
    pub fn mark_stopped(&mut self) -> bool {
        let was_active = self.is_active();
        self.status = RecordStatus::Stopped;
        was_active
    }
}
