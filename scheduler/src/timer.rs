//! Worker process body: invoke one task target on a repeating alarm
//!
//! A worker never returns to the supervisor's code. It arms SIGALRM for its
//! interval, waits for a firing, and runs the target once per pumped firing.
//! A firing that lands while the target runs is handled as soon as it returns.
//! A target error or a failure to install the handler ends the process.

use shared::{Interval, ProcessRole, TaskName, process_debug, process_error, process_info};

use crate::catalog::{TaskOutcome, TaskTarget};
use crate::services::set_process_title;
use crate::signals::{self, SignalDispatch};

/// Exit status of a worker whose target failed
pub const WORKER_FAILURE_EXIT: i32 = 1;

pub struct WorkerTimer {
    task_name: TaskName,
    interval: Interval,
    target: TaskTarget,
    dispatch: SignalDispatch,
}

impl WorkerTimer {
    pub fn new(task_name: TaskName, interval: Interval, target: TaskTarget, dispatch: SignalDispatch) -> Self {
        Self {
            task_name,
            interval,
            target,
            dispatch,
        }
    }

    /// Take over the calling (freshly forked) process for good
    pub fn run(self) -> ! {
        let role = ProcessRole::Worker(self.task_name.clone());
        ProcessRole::set(role.clone());
        set_process_title(self.task_name.as_str());

        if let Err(e) = signals::install_alarm_handler(self.interval) {
            process_error!(role, "Cannot install alarm handler: {}", e);
            std::process::exit(WORKER_FAILURE_EXIT);
        }
        signals::arm_alarm(self.interval);
        process_info!(
            role,
            "Worker started, firing every {} ({:?} dispatch)",
            self.interval,
            self.dispatch
        );

        loop {
            if let Err(e) = self.step() {
                process_error!(role, "Task failed, worker exiting: {:#}", e);
                signals::disarm_alarm();
                std::process::exit(WORKER_FAILURE_EXIT);
            }
        }
    }

    /// One loop iteration: wait for a firing, then pump it
    pub fn step(&self) -> TaskOutcome {
        self.dispatch.await_firing()?;
        self.pump()
    }

    /// Run the target once if an alarm firing is pending
    pub fn pump(&self) -> TaskOutcome {
        if signals::take_alarm() {
            process_debug!(ProcessRole::current(), "Alarm fired for {}", self.task_name);
            self.target.invoke()?;
        }
        Ok(())
    }
}
