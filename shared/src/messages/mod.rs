//! Message types for the scheduler process group
//!
//! - `control`: Control-plane messages carried by the command channel
//! - `process`: Worker bookkeeping carried inside reports

pub mod control;
pub mod process;

pub use control::{decode_entries, encode_entries, ControlAction, ControlMessage, ControlPayload};

pub use process::{ProcessRecord, RecordStatus};
