//! Process-based periodic task scheduler
//!
//! Forks one OS process per task worker, drives each with a repeating alarm,
//! optionally detaches the group into a daemon, and exposes a file-backed
//! command channel for status and stop requests.

#[cfg(not(unix))]
compile_error!("the scheduler relies on fork, signals and flock and only builds on unix");

pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod services;
pub mod signals;
pub mod supervisor;
pub mod timer;
pub mod traits;

// Re-export commonly used types
pub use catalog::{DispatchMode, TaskCatalog, TaskDefinition, TaskOutcome, TaskTarget};
pub use config::SchedulerConfig;
pub use error::{SchedulerError, SchedulerResult};
pub use supervisor::{SuperviseStep, Supervisor, SupervisorState};
pub use traits::{CommandQueue, ProcessControl, ReportSink};
