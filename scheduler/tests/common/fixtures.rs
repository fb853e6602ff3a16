//! Test fixtures and data for scheduler tests

use scheduler::SchedulerConfig;
use shared::{Interval, ProcessRecord, TaskName};

/// Standard test data and fixtures
pub struct TestFixtures;

impl TestFixtures {
    pub const PREFIX: &'static str = "test";

    /// Pid the mocked daemon head reports for itself
    pub const HEAD_PID: i32 = 4000;

    /// First pid handed out by mocked forks
    pub const FIRST_WORKER_PID: i32 = 4001;

    /// Configuration with a one-second monitor wait
    pub fn config() -> SchedulerConfig {
        SchedulerConfig {
            prefix: Self::PREFIX.to_string(),
            report_wait_secs: 1,
            ..SchedulerConfig::default()
        }
    }

    pub fn daemon_config() -> SchedulerConfig {
        SchedulerConfig {
            daemon: true,
            ..Self::config()
        }
    }

    pub fn record(pid: i32, alias: &str, interval_secs: u64) -> ProcessRecord {
        ProcessRecord::new(
            pid,
            Self::HEAD_PID,
            TaskName::new(Self::PREFIX, alias),
            Interval::from_secs(interval_secs).unwrap(),
        )
    }
}
