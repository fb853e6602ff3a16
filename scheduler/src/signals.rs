//! Signal plumbing shared by workers and the daemon head
//!
//! Handlers only do async-signal-safe work: re-arm the alarm and raise a
//! pending flag. The actual reaction (invoking a task, tearing down the
//! process group) happens in the owner's loop when it pumps the flags.

use std::ffi::c_int;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal, sigaction, sigprocmask};
use nix::unistd::alarm;

use shared::Interval;

use crate::error::{SchedulerError, SchedulerResult};

static ALARM_PENDING: AtomicBool = AtomicBool::new(false);
static ALARM_INTERVAL: AtomicU32 = AtomicU32::new(0);
static TERMINATE_PENDING: AtomicBool = AtomicBool::new(false);

/// How pending signals reach their handlers' owners
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalDispatch {
    /// Waits are not interrupted; pending signals are pumped after each wait
    Synchronous,
    /// A delivered signal cuts the current wait short and is pumped at once
    Asynchronous,
}

/// Poll period of a synchronous worker
const SYNC_WORKER_QUANTUM: Duration = Duration::from_secs(1);

impl SignalDispatch {
    /// Block until an alarm firing is pending. Returns at once when one
    /// already is, e.g. because it landed while the target was running.
    pub fn await_firing(&self) -> SchedulerResult<()> {
        match self {
            SignalDispatch::Synchronous => {
                if !ALARM_PENDING.load(Ordering::SeqCst) {
                    std::thread::sleep(SYNC_WORKER_QUANTUM);
                }
                Ok(())
            }
            SignalDispatch::Asynchronous => wait_for_alarm(),
        }
    }

    /// Suspend the calling process for at most `quantum`
    pub fn suspend(&self, quantum: Duration) {
        match self {
            // std's sleep resumes after EINTR, so signals queue up for the pump
            SignalDispatch::Synchronous => std::thread::sleep(quantum),
            SignalDispatch::Asynchronous => {
                let secs = u32::try_from(quantum.as_secs()).unwrap_or(u32::MAX).max(1);
                let _ = nix::unistd::sleep(secs);
            }
        }
    }
}

/// Sleep until SIGALRM has been handled.
///
/// SIGALRM is blocked while the flag is checked and only unblocked inside
/// `sigsuspend`, so a firing between the check and the wait is not lost.
fn wait_for_alarm() -> SchedulerResult<()> {
    let alarm_only = {
        let mut set = SigSet::empty();
        set.add(Signal::SIGALRM);
        set
    };
    let mut previous = SigSet::empty();
    sigprocmask(SigmaskHow::SIG_BLOCK, Some(&alarm_only), Some(&mut previous))
        .map_err(|e| SchedulerError::signal("block SIGALRM", e))?;

    let mut wait_mask = previous;
    wait_mask.remove(Signal::SIGALRM);
    while !ALARM_PENDING.load(Ordering::SeqCst) {
        // Always returns -1/EINTR once a handler has run
        unsafe { libc::sigsuspend(wait_mask.as_ref()) };
    }

    sigprocmask(SigmaskHow::SIG_SETMASK, Some(&previous), None)
        .map_err(|e| SchedulerError::signal("restore signal mask", e))
}

extern "C" fn on_alarm(_signal: c_int) {
    // Next firing is scheduled before the current one is handled
    let secs = ALARM_INTERVAL.load(Ordering::SeqCst);
    if secs > 0 {
        alarm::set(secs);
    }
    ALARM_PENDING.store(true, Ordering::SeqCst);
}

extern "C" fn on_terminate(_signal: c_int) {
    TERMINATE_PENDING.store(true, Ordering::SeqCst);
}

fn install(signal: Signal, handler: SigHandler) -> SchedulerResult<()> {
    // No SA_RESTART: an asynchronous wait must return when the signal lands
    let action = SigAction::new(handler, SaFlags::empty(), SigSet::empty());
    unsafe { sigaction(signal, &action) }
        .map(|_| ())
        .map_err(|e| SchedulerError::signal(format!("install {signal} handler"), e))
}

/// Install the repeating-alarm handler for `interval`
pub fn install_alarm_handler(interval: Interval) -> SchedulerResult<()> {
    ALARM_INTERVAL.store(interval.alarm_secs(), Ordering::SeqCst);
    install(Signal::SIGALRM, SigHandler::Handler(on_alarm))
}

/// Schedule the next alarm firing
pub fn arm_alarm(interval: Interval) {
    alarm::set(interval.alarm_secs());
}

/// Stop the repeating alarm
pub fn disarm_alarm() {
    ALARM_INTERVAL.store(0, Ordering::SeqCst);
    alarm::cancel();
}

pub fn install_terminate_handler() -> SchedulerResult<()> {
    install(Signal::SIGTERM, SigHandler::Handler(on_terminate))
}

/// Ignore SIGTERM from now on; used right before signalling our own group
pub fn ignore_terminate() -> SchedulerResult<()> {
    install(Signal::SIGTERM, SigHandler::SigIgn)
}

/// Consume a pending alarm firing
pub fn take_alarm() -> bool {
    ALARM_PENDING.swap(false, Ordering::SeqCst)
}

/// Consume a pending termination request
pub fn take_terminate() -> bool {
    TERMINATE_PENDING.swap(false, Ordering::SeqCst)
}

/// Serialises tests that raise real signals; the pending flags are process-wide
#[cfg(test)]
pub(crate) static SIGNAL_TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
