//! Shared types for the periodic-task scheduler
//!
//! Contains the data model and wire format shared by every process of a
//! scheduler group: the supervising daemon, its workers, the monitor left
//! behind by daemonization and any control client.

pub mod errors;
pub mod logging;
pub mod messages;
pub mod types;

pub use errors::*;
pub use types::*;

pub use messages::{ControlAction, ControlMessage, ControlPayload, ProcessRecord, RecordStatus};
