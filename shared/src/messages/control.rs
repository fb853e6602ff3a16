//! Control-plane messages exchanged over the command channel
//!
//! The channel backing store is a JSON array of these messages. Every message
//! is an object tagged by `"action"`:
//!
//! ```json
//! [
//!   {"action": "allocate", "startList": [...], "time": "2024-01-01T12:00:00Z"},
//!   {"action": "stop", "force": false, "time": "2024-01-01T12:00:03Z"}
//! ]
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::errors::{SharedError, SharedResult};
use crate::messages::process::ProcessRecord;

/// Action discriminant of a control message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlAction {
    /// Daemon -> monitor: workers have been forked
    Allocate,
    /// Client -> daemon: please report worker status
    Status,
    /// Daemon -> client: refreshed worker status
    StatusReply,
    /// Client -> daemon: stop the process group
    Stop,
}

impl ControlAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlAction::Allocate => "allocate",
            ControlAction::Status => "status",
            ControlAction::StatusReply => "statusReply",
            ControlAction::Stop => "stop",
        }
    }
}

impl fmt::Display for ControlAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action-dependent body of a control message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ControlPayload {
    Allocate {
        #[serde(rename = "startList")]
        start_list: Vec<ProcessRecord>,
    },
    Status,
    StatusReply {
        #[serde(rename = "startList")]
        start_list: Vec<ProcessRecord>,
    },
    Stop {
        #[serde(default)]
        force: bool,
    },
}

/// Unit exchanged over the command channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlMessage {
    #[serde(flatten)]
    pub payload: ControlPayload,
    /// Stamped by `send`; absent on messages that were only pushed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
}

impl ControlMessage {
    pub fn new(payload: ControlPayload) -> Self {
        Self { payload, time: None }
    }

    pub fn allocate(start_list: Vec<ProcessRecord>) -> Self {
        Self::new(ControlPayload::Allocate { start_list })
    }

    pub fn status() -> Self {
        Self::new(ControlPayload::Status)
    }

    pub fn status_reply(start_list: Vec<ProcessRecord>) -> Self {
        Self::new(ControlPayload::StatusReply { start_list })
    }

    pub fn stop(force: bool) -> Self {
        Self::new(ControlPayload::Stop { force })
    }

    pub fn action(&self) -> ControlAction {
        match self.payload {
            ControlPayload::Allocate { .. } => ControlAction::Allocate,
            ControlPayload::Status => ControlAction::Status,
            ControlPayload::StatusReply { .. } => ControlAction::StatusReply,
            ControlPayload::Stop { .. } => ControlAction::Stop,
        }
    }

    /// Stamp the message with the current time
    pub fn stamped(mut self) -> Self {
        self.time = Some(Utc::now());
        self
    }

    /// Worker table carried by `allocate` and `statusReply` reports
    pub fn start_list(&self) -> Option<&[ProcessRecord]> {
        match &self.payload {
            ControlPayload::Allocate { start_list } | ControlPayload::StatusReply { start_list } => {
                Some(start_list)
            }
            _ => None,
        }
    }
}

/// Split a backing-store document into its entries, one per pending message.
///
/// Only a document that is not a JSON array fails as a whole; entries are
/// decoded individually with `ControlMessage::from_entry`.
pub fn decode_entries(content: &str) -> SharedResult<Vec<Value>> {
    serde_json::from_str(content).map_err(|e| SharedError::DeserializationError {
        message: e.to_string(),
    })
}

/// Encode a whole backing-store document
pub fn encode_entries(entries: &[Value]) -> SharedResult<String> {
    serde_json::to_string(entries).map_err(|e| SharedError::SerializationError {
        message: e.to_string(),
    })
}

impl ControlMessage {
    /// Decode one store entry. Unknown actions and malformed entries are protocol errors.
    pub fn from_entry(entry: &Value) -> SharedResult<Self> {
        Self::deserialize(entry).map_err(|e| SharedError::ProtocolError {
            message: format!("undecodable channel entry {entry}: {e}"),
        })
    }

    pub fn to_entry(&self) -> SharedResult<Value> {
        serde_json::to_value(self).map_err(|e| SharedError::SerializationError {
            message: e.to_string(),
        })
    }
}
