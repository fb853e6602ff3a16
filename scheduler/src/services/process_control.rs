//! Process control backed by `nix`
//!
//! fork/setsid/waitpid/kill wrappers for the supervisor. The process must be
//! single-threaded when `fork` is called: the scheduler never starts threads.

use std::fs::OpenOptions;
use std::os::fd::AsRawFd;

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::{self, ForkResult, Pid};

use shared::{ProcessRole, process_debug};

use crate::error::{SchedulerError, SchedulerResult};
use crate::traits::{ForkOutcome, ProcessControl, ReapState};

/// Real process control implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct NixProcessControl;

impl NixProcessControl {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessControl for NixProcessControl {
    fn fork(&self) -> SchedulerResult<ForkOutcome> {
        match unsafe { unistd::fork() } {
            Ok(ForkResult::Parent { child }) => Ok(ForkOutcome::Parent { child }),
            Ok(ForkResult::Child) => Ok(ForkOutcome::Child),
            Err(errno) => Err(SchedulerError::fork("child process", errno)),
        }
    }

    fn new_session(&self) -> SchedulerResult<()> {
        let sid = unistd::setsid().map_err(|errno| SchedulerError::SessionFailed { errno })?;
        process_debug!(ProcessRole::current(), "Started session {}", sid);
        Ok(())
    }

    fn chdir_root(&self) -> SchedulerResult<()> {
        unistd::chdir("/").map_err(|errno| SchedulerError::DetachFailed {
            message: format!("chdir to / failed: {errno}"),
        })
    }

    fn detach_std_streams(&self) -> SchedulerResult<()> {
        let null = OpenOptions::new()
            .read(true)
            .write(true)
            .open("/dev/null")
            .map_err(|e| SchedulerError::DetachFailed {
                message: format!("open /dev/null failed: {e}"),
            })?;
        for fd in 0..=2 {
            unistd::dup2(null.as_raw_fd(), fd).map_err(|errno| SchedulerError::DetachFailed {
                message: format!("redirecting fd {fd} failed: {errno}"),
            })?;
        }
        Ok(())
    }

    fn try_reap(&self, pid: Pid) -> ReapState {
        match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => ReapState::Running,
            // Exited, signalled, or ECHILD because it was already collected
            Ok(_) | Err(_) => ReapState::Gone,
        }
    }

    fn reap_any(&self) -> Option<Pid> {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) | Err(_) => None,
            Ok(status) => status.pid(),
        }
    }

    fn signal_group(&self, signal: Signal) -> SchedulerResult<()> {
        // pid 0 addresses every process in the caller's group
        match signal::kill(Pid::from_raw(0), signal) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(errno) => Err(SchedulerError::signal(format!("send {signal} to process group"), errno)),
        }
    }

    fn current_pid(&self) -> Pid {
        unistd::getpid()
    }
}

/// Set the OS-visible name of the calling process. Best effort.
pub fn set_process_title(title: &str) {
    #[cfg(target_os = "linux")]
    {
        if let Ok(name) = std::ffi::CString::new(title) {
            let _ = nix::sys::prctl::set_name(&name);
        }
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = title;
    }
}
