//! Service-specific tests
//!
//! Each service has its own test file. Channel tests run against files in a
//! private temp directory, never the shared per-key path.

mod channel;

pub mod common {
    use shared::{Interval, ProcessRecord, TaskName};
    use tempfile::TempDir;

    use crate::services::FileChannel;

    /// Channel backed by a fresh temp directory; keep the guard alive
    pub fn temp_channel() -> (TempDir, FileChannel) {
        let dir = TempDir::new().expect("temp dir");
        let channel = FileChannel::open_at(dir.path().join("test.queue.json")).expect("channel");
        (dir, channel)
    }

    pub fn test_record(pid: i32, alias: &str) -> ProcessRecord {
        ProcessRecord::new(pid, 1, TaskName::new("test", alias), Interval::from_secs(5).unwrap())
    }
}
