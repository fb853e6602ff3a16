//! File-backed command channel
//!
//! One JSON document per channel key, holding the ordered array of pending
//! control messages. Every operation holds an exclusive `flock` on a sibling
//! `.lock` file for its whole read-modify-write cycle, so concurrent senders
//! and receivers in different processes cannot lose each other's updates.
//! Rewrites go to a `.tmp` sibling that is renamed over the document, so a
//! failed write leaves the previous content in place.
//!
//! Entries are decoded one at a time. An entry this build cannot decode stays
//! in the store untouched instead of invalidating its neighbours.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use nix::fcntl::{Flock, FlockArg};
use serde_json::Value;

use shared::messages::{decode_entries, encode_entries};
use shared::{ControlAction, ControlMessage, ProcessRole, process_debug, process_warn};

use crate::error::{SchedulerError, SchedulerResult};
use crate::traits::CommandQueue;

/// Real command channel implementation
#[derive(Debug, Clone)]
pub struct FileChannel {
    path: PathBuf,
}

impl FileChannel {
    /// Open (creating if needed) the channel for `key` in the temp directory
    pub fn open(key: &str) -> SchedulerResult<Self> {
        Self::open_at(Self::path_for_key(key))
    }

    /// Open (creating if needed) a channel backed by `path`.
    ///
    /// Creation is exclusive: exactly one opener seeds the store with `[]`.
    /// Failing to create or seed the store is fatal.
    pub fn open_at(path: impl Into<PathBuf>) -> SchedulerResult<Self> {
        let channel = Self { path: path.into() };
        match OpenOptions::new().write(true).create_new(true).open(&channel.path) {
            Ok(_) => {
                channel.seed().map_err(|source| SchedulerError::ChannelInit {
                    path: channel.path.clone(),
                    source,
                })?;
                process_debug!(ProcessRole::current(), "Created command channel {}", channel.path.display());
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(source) => {
                return Err(SchedulerError::ChannelInit {
                    path: channel.path,
                    source,
                });
            }
        }
        Ok(channel)
    }

    /// Backing file used for `key`
    pub fn path_for_key(key: &str) -> PathBuf {
        let sanitized: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        std::env::temp_dir().join(format!("{sanitized}.queue.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    }

    fn seed(&self) -> io::Result<()> {
        let _lock = self.lock()?;
        // Someone may have pushed between our create and our lock
        if fs::metadata(&self.path)?.len() == 0 {
            self.store("[]")?;
        }
        Ok(())
    }

    fn lock(&self) -> io::Result<Flock<File>> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.sibling(".lock"))?;
        Flock::lock(file, FlockArg::LockExclusive).map_err(|(_, errno)| io::Error::from(errno))
    }

    /// Missing, empty or non-array content reads as an empty sequence
    fn read_locked(&self) -> Vec<Value> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                process_warn!(ProcessRole::current(), "Command channel unreadable, treating as empty: {}", e);
                return Vec::new();
            }
        };
        if content.trim().is_empty() {
            return Vec::new();
        }
        decode_entries(&content).unwrap_or_else(|e| {
            process_warn!(ProcessRole::current(), "Command channel corrupt, treating as empty: {}", e);
            Vec::new()
        })
    }

    /// Replace the document; the old content survives until the rename
    fn store(&self, content: &str) -> io::Result<()> {
        let staging = self.sibling(".tmp");
        let mut file = File::create(&staging)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        fs::rename(&staging, &self.path)
    }

    fn write_locked(&self, entries: &[Value]) -> SchedulerResult<()> {
        self.store(&encode_entries(entries)?)?;
        Ok(())
    }

    /// Decode one entry, warning about entries this build does not understand
    fn decode(entry: &Value) -> Option<ControlMessage> {
        match ControlMessage::from_entry(entry) {
            Ok(message) => Some(message),
            Err(e) => {
                process_warn!(ProcessRole::current(), "Skipping channel entry: {}", e);
                None
            }
        }
    }

    fn append(&self, message: &ControlMessage) -> SchedulerResult<()> {
        let entry = message.to_entry()?;
        let _lock = self.lock()?;
        let mut entries = self.read_locked();
        entries.push(entry);
        self.write_locked(&entries)
    }

    /// Remove and return the first decodable entry carrying `expected`.
    /// The store is only rewritten when something was taken.
    fn take_first(&self, expected: ControlAction) -> SchedulerResult<Option<ControlMessage>> {
        let _lock = self.lock()?;
        let mut entries = self.read_locked();
        let found = entries.iter().enumerate().find_map(|(index, entry)| {
            ControlMessage::from_entry(entry)
                .ok()
                .filter(|m| m.action() == expected)
                .map(|m| (index, m))
        });
        let Some((index, message)) = found else {
            return Ok(None);
        };
        entries.remove(index);
        self.write_locked(&entries)?;
        Ok(Some(message))
    }

    fn replace(&self, messages: &[ControlMessage]) -> SchedulerResult<()> {
        let entries = messages
            .iter()
            .map(ControlMessage::to_entry)
            .collect::<Result<Vec<_>, _>>()?;
        let _lock = self.lock()?;
        self.write_locked(&entries)
    }
}

impl CommandQueue for FileChannel {
    fn get(&self) -> Vec<ControlMessage> {
        match self.lock() {
            Ok(_lock) => self.read_locked().iter().filter_map(Self::decode).collect(),
            Err(e) => {
                process_warn!(ProcessRole::current(), "Command channel unavailable: {}", e);
                Vec::new()
            }
        }
    }

    fn set(&self, messages: Vec<ControlMessage>) {
        if let Err(e) = self.replace(&messages) {
            process_warn!(ProcessRole::current(), "Dropped command channel rewrite: {}", e);
        }
    }

    fn push(&self, message: ControlMessage) {
        if let Err(e) = self.append(&message) {
            process_warn!(ProcessRole::current(), "Dropped '{}' message: {}", message.action(), e);
        }
    }

    fn receive(&self, expected: ControlAction) -> Option<ControlMessage> {
        match self.take_first(expected) {
            Ok(message) => message,
            Err(e) => {
                process_warn!(ProcessRole::current(), "Failed to poll for '{}': {}", expected, e);
                None
            }
        }
    }
}
