//! Test helpers and builder patterns for supervisor tests
//!
//! Every mock is configured with closures rather than stacked expectations so
//! the outcome never depends on expectation matching order.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use nix::errno::Errno;
use nix::unistd::Pid;

use scheduler::traits::{ForkOutcome, MockCommandQueue, MockProcessControl, MockReportSink};
use scheduler::{SchedulerConfig, SchedulerError, Supervisor, TaskCatalog};
use shared::{ControlAction, ControlMessage};

use super::fixtures::TestFixtures;

pub type TestSupervisor = Supervisor<MockCommandQueue, MockProcessControl, MockReportSink>;

/// Builder for supervisors wired to mocks
pub struct SupervisorBuilder {
    config: SchedulerConfig,
    catalog: TaskCatalog,
    queue: MockCommandQueue,
    process: MockProcessControl,
    sink: MockReportSink,
}

impl SupervisorBuilder {
    pub fn new() -> Self {
        Self {
            config: TestFixtures::config(),
            catalog: TaskCatalog::new(),
            queue: MockCommandQueue::new(),
            process: MockProcessControl::new(),
            sink: MockReportSink::new(),
        }
    }

    /// Add a no-op task
    pub fn with_task(mut self, alias: &str, interval_secs: u64, workers: u32) -> Self {
        self.catalog
            .add_function(alias, interval_secs, workers, || Ok(()))
            .expect("valid test task");
        self
    }

    pub fn with_config<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut SchedulerConfig),
    {
        setup(&mut self.config);
        self
    }

    pub fn with_queue<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut MockCommandQueue),
    {
        setup(&mut self.queue);
        self
    }

    pub fn with_process<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut MockProcessControl),
    {
        setup(&mut self.process);
        self
    }

    pub fn with_sink<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut MockReportSink),
    {
        setup(&mut self.sink);
        self
    }

    pub fn build(self) -> TestSupervisor {
        Supervisor::new(self.config, self.catalog, self.queue, self.process, self.sink)
    }
}

/// Common mock setups
pub struct TestHelpers;

impl TestHelpers {
    /// Every fork lands in the parent with sequential child pids; nothing is reaped
    pub fn parent_forks(process: &mut MockProcessControl, count: usize) {
        let next = AtomicI32::new(TestFixtures::FIRST_WORKER_PID);
        process.expect_fork().times(count).returning(move || {
            Ok(ForkOutcome::Parent {
                child: Pid::from_raw(next.fetch_add(1, Ordering::SeqCst)),
            })
        });
        Self::head_identity(process);
        process.expect_reap_any().returning(|| None);
    }

    pub fn head_identity(process: &mut MockProcessControl) {
        process
            .expect_current_pid()
            .returning(|| Pid::from_raw(TestFixtures::HEAD_PID));
    }

    /// Fork succeeds `successes` times, then fails
    pub fn failing_fork_after(process: &mut MockProcessControl, successes: i32) {
        let calls = AtomicI32::new(0);
        process.expect_fork().returning(move || {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            if call < successes {
                Ok(ForkOutcome::Parent {
                    child: Pid::from_raw(TestFixtures::FIRST_WORKER_PID + call),
                })
            } else {
                Err(SchedulerError::fork("child process", Errno::EAGAIN))
            }
        });
    }

    /// Channel with no pending messages
    pub fn empty_queue(queue: &mut MockCommandQueue) {
        queue.expect_receive().returning(|_| None);
    }

    /// Channel holding exactly one `message`, delivered to the matching receive
    pub fn queue_with(queue: &mut MockCommandQueue, message: ControlMessage) {
        let delivered = Arc::new(AtomicBool::new(false));
        let action = message.action();
        queue.expect_receive().returning(move |expected: ControlAction| {
            if expected == action && !delivered.swap(true, Ordering::SeqCst) {
                Some(message.clone())
            } else {
                None
            }
        });
    }
}
