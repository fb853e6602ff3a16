//! Trait definitions with mockall annotations for testing
//!
//! The supervisor talks to the outside world only through these seams: the
//! command channel, the OS process facilities and the report presenter.
//! Production implementations live in `services`.

use nix::sys::signal::Signal;
use nix::unistd::Pid;

use shared::{ControlAction, ControlMessage, ProcessRecord};

use crate::error::SchedulerResult;

/// Which side of a fork the caller ended up on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForkOutcome {
    Parent { child: Pid },
    Child,
}

/// Result of a non-blocking wait on one child
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReapState {
    Running,
    /// Exited, killed, or no longer waitable by us
    Gone,
}

/// Polling message queue shared by the processes of one scheduler group
///
/// Delivery is loosely ordered: `receive` takes the oldest message of the
/// requested action and leaves everything else where it was.
#[mockall::automock]
pub trait CommandQueue {
    /// Whole pending sequence, oldest first. Unreadable stores read as empty.
    fn get(&self) -> Vec<ControlMessage>;

    /// Replace the whole pending sequence
    fn set(&self, messages: Vec<ControlMessage>);

    /// Append a message. Fire-and-forget: a failed write is not reported.
    fn push(&self, message: ControlMessage);

    /// Stamp a message with the current time and push it
    fn send(&self, message: ControlMessage) {
        self.push(message.stamped());
    }

    /// Remove and return the oldest message whose action is `expected`
    fn receive(&self, expected: ControlAction) -> Option<ControlMessage>;
}

/// OS process facilities used by the supervisor
#[mockall::automock]
pub trait ProcessControl {
    /// Fork the calling process
    fn fork(&self) -> SchedulerResult<ForkOutcome>;

    /// Start a new session, detaching from the controlling terminal
    fn new_session(&self) -> SchedulerResult<()>;

    /// Change the working directory to the filesystem root
    fn chdir_root(&self) -> SchedulerResult<()>;

    /// Point stdin, stdout and stderr at the null device
    fn detach_std_streams(&self) -> SchedulerResult<()>;

    /// Non-blocking wait on one child
    fn try_reap(&self, pid: Pid) -> ReapState;

    /// Non-blocking wait on any child; returns the pid that was collected
    fn reap_any(&self) -> Option<Pid>;

    /// Send `signal` to every process in the caller's process group
    fn signal_group(&self, signal: Signal) -> SchedulerResult<()>;

    fn current_pid(&self) -> Pid;
}

/// Consumer of worker tables carried by `allocate` and `statusReply` reports
#[mockall::automock]
pub trait ReportSink {
    fn present(&self, action: ControlAction, records: &[ProcessRecord]);
}
