//! Core shared types and identifiers

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;

use crate::errors::SharedError;

/// Role of the current OS process - set once per fork branch
static PROCESS_ROLE: RwLock<ProcessRole> = RwLock::new(ProcessRole::Client);

/// Process role for any participant in a scheduler process group
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessRole {
    /// A short-lived control process (status/stop requests)
    Client,
    /// The original process after daemonization, waiting for the startup report
    Monitor,
    /// The detached supervisor owning the worker table
    Daemon,
    /// A forked worker running one task
    Worker(TaskName),
}

impl ProcessRole {
    /// Record the role of the current process.
    ///
    /// Forked children inherit the parent's value, so every fork branch must
    /// call this before logging anything.
    pub fn set(role: ProcessRole) {
        match PROCESS_ROLE.write() {
            Ok(mut current) => *current = role,
            Err(poisoned) => *poisoned.into_inner() = role,
        }
    }

    /// Get the role of the current process
    pub fn current() -> ProcessRole {
        match PROCESS_ROLE.read() {
            Ok(current) => current.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl fmt::Display for ProcessRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessRole::Client => write!(f, "client"),
            ProcessRole::Monitor => write!(f, "monitor"),
            ProcessRole::Daemon => write!(f, "daemon"),
            ProcessRole::Worker(name) => write!(f, "worker:{name}"),
        }
    }
}

/// Derived task name, `{prefix}_{alias}`, used as the worker process title
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskName(String);

impl TaskName {
    pub fn new(prefix: &str, alias: &str) -> Self {
        Self(format!("{prefix}_{alias}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Time between two invocations of a task, in whole seconds.
///
/// Reported on the wire and in tables as `"<n>s"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Interval(u64);

impl Interval {
    pub fn from_secs(secs: u64) -> Result<Self, SharedError> {
        if secs == 0 {
            return Err(SharedError::InvalidInterval {
                input: secs.to_string(),
            });
        }
        Ok(Self(secs))
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Seconds clamped into the range accepted by `alarm(2)`
    pub fn alarm_secs(&self) -> u32 {
        u32::try_from(self.0).unwrap_or(u32::MAX)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

impl FromStr for Interval {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().strip_suffix('s').unwrap_or(s.trim());
        let secs = digits.parse::<u64>().map_err(|_| SharedError::InvalidInterval {
            input: s.to_string(),
        })?;
        Self::from_secs(secs).map_err(|_| SharedError::InvalidInterval {
            input: s.to_string(),
        })
    }
}

impl Serialize for Interval {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Interval {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
