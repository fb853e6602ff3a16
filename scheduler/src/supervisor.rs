//! Process supervisor
//!
//! Owns the lifecycle of one scheduler group:
//!
//! ```text
//! Starting -> (Daemonizing) -> Allocating -> Supervising
//! ```
//!
//! In daemon mode the original process forks once; the parent becomes the
//! monitor, which drains startup reports for a bounded time and returns. The
//! child starts a new session and carries on as the daemon head. The head (or
//! the foreground process) forks one worker per task slot and then services
//! control requests from the command channel until it is terminated.

use std::time::Duration;

use nix::sys::signal::Signal;
use nix::unistd::Pid;

use shared::{
    ControlAction, ControlMessage, ControlPayload, ProcessRecord, ProcessRole, logging, process_debug, process_info,
    process_warn,
};

use crate::catalog::TaskCatalog;
use crate::config::SchedulerConfig;
use crate::error::SchedulerResult;
use crate::signals;
use crate::timer::WorkerTimer;
use crate::traits::{CommandQueue, ForkOutcome, ProcessControl, ReapState, ReportSink};

/// Length of one supervising or monitoring iteration
pub const SUPERVISE_TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Starting,
    Daemonizing,
    Allocating,
    Supervising,
}

/// Outcome of one control-loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuperviseStep {
    Continue,
    /// A termination signal was handled; the group has been told to stop
    Terminated,
}

pub struct Supervisor<Q, P, R>
where
    Q: CommandQueue,
    P: ProcessControl,
    R: ReportSink,
{
    config: SchedulerConfig,
    catalog: TaskCatalog,

    /// Injected services
    queue: Q,
    process: P,
    sink: R,

    /// One record per forked worker, in fork order
    records: Vec<ProcessRecord>,
    state: SupervisorState,
}

impl<Q, P, R> Supervisor<Q, P, R>
where
    Q: CommandQueue,
    P: ProcessControl,
    R: ReportSink,
{
    pub fn new(config: SchedulerConfig, catalog: TaskCatalog, queue: Q, process: P, sink: R) -> Self {
        Self {
            config,
            catalog,
            queue,
            process,
            sink,
            records: Vec::new(),
            state: SupervisorState::Starting,
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    pub fn records(&self) -> &[ProcessRecord] {
        &self.records
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Run the group.
    ///
    /// Returns `Ok(())` only in the monitor branch of a daemonized start. The
    /// daemon head (or the foreground process) supervises until terminated
    /// and never comes back.
    pub fn start(&mut self) -> SchedulerResult<()> {
        if self.config.daemon && self.daemonize()? == DaemonBranch::Monitor {
            return Ok(());
        }
        self.allocate()?;
        self.supervise()
    }

    fn daemonize(&mut self) -> SchedulerResult<DaemonBranch> {
        self.state = SupervisorState::Daemonizing;
        match self.process.fork()? {
            ForkOutcome::Parent { child } => {
                ProcessRole::set(ProcessRole::Monitor);
                process_info!(ProcessRole::Monitor, "Daemon head started as pid {}", child);
                self.wait_for_reports();
                Ok(DaemonBranch::Monitor)
            }
            ForkOutcome::Child => {
                ProcessRole::set(ProcessRole::Daemon);
                self.process.new_session()?;
                if self.config.chdir_root {
                    self.process.chdir_root()?;
                }
                if self.config.close_std_streams {
                    self.process.detach_std_streams()?;
                }
                logging::log_startup(&ProcessRole::Daemon, "detached from terminal");
                Ok(DaemonBranch::Head)
            }
        }
    }

    /// Fork one worker per task slot.
    ///
    /// Worker branches turn into `WorkerTimer`s and never return here. A fork
    /// failure aborts allocation of the remaining slots.
    pub fn allocate(&mut self) -> SchedulerResult<()> {
        self.state = SupervisorState::Allocating;
        let dispatch = self.config.signal_dispatch();
        let tasks = self.catalog.tasks().to_vec();

        for task in &tasks {
            let name = task.task_name(&self.config.prefix);
            for slot in 0..task.workers {
                match self.process.fork()? {
                    ForkOutcome::Child => {
                        WorkerTimer::new(name.clone(), task.interval, task.target.clone(), dispatch).run()
                    }
                    ForkOutcome::Parent { child } => {
                        let parent = self.process.current_pid();
                        self.records
                            .push(ProcessRecord::new(child.as_raw(), parent.as_raw(), name.clone(), task.interval));
                        process_debug!(ProcessRole::current(), "Forked {} slot {} as pid {}", name, slot, child);
                        self.reap_exited();
                    }
                }
            }
        }

        process_info!(
            ProcessRole::current(),
            "Allocated {} workers for {} tasks",
            self.records.len(),
            tasks.len()
        );
        Ok(())
    }

    /// Collect one already-exited child without blocking
    fn reap_exited(&mut self) {
        if let Some(pid) = self.process.reap_any() {
            self.mark_stopped(pid);
        }
    }

    fn mark_stopped(&mut self, pid: Pid) {
        if let Some(record) = self.records.iter_mut().find(|r| r.pid == pid.as_raw()) {
            if record.mark_stopped() {
                process_warn!(ProcessRole::current(), "Worker {} (pid {}) has exited", record.task_name, pid);
            }
        }
    }

    /// Publish the worker table for the monitor.
    ///
    /// Allocation reports left on the channel by earlier runs are dropped
    /// first. A foreground start has no monitor, so nothing is sent and
    /// `false` is returned.
    pub fn report_allocation(&self) -> bool {
        let mut stale = 0;
        while self.queue.receive(ControlAction::Allocate).is_some() {
            stale += 1;
        }
        if stale > 0 {
            process_debug!(ProcessRole::current(), "Dropped {} stale allocation reports", stale);
        }
        if !self.config.daemon {
            return false;
        }
        self.queue.send(ControlMessage::allocate(self.records.clone()));
        true
    }

    /// Report the allocation, then service control requests forever
    pub fn supervise(&mut self) -> ! {
        self.state = SupervisorState::Supervising;
        self.report_allocation();

        if let Err(e) = signals::install_terminate_handler() {
            logging::log_error(&ProcessRole::current(), "installing termination handler", &e);
        }

        let dispatch = self.config.signal_dispatch();
        loop {
            dispatch.suspend(SUPERVISE_TICK);
            match self.supervise_once() {
                Ok(SuperviseStep::Continue) => {}
                Ok(SuperviseStep::Terminated) => {
                    logging::log_shutdown(&ProcessRole::current(), "termination requested");
                    std::process::exit(0);
                }
                Err(e) => logging::log_error(&ProcessRole::current(), "supervising", &e),
            }
        }
    }

    /// One control-loop iteration: status request, stop request, signal pump
    pub fn supervise_once(&mut self) -> SchedulerResult<SuperviseStep> {
        if self.take_command(ControlAction::Status).is_some() {
            self.process_status();
            process_debug!(ProcessRole::current(), "Answering status request");
            self.queue.send(ControlMessage::status_reply(self.records.clone()));
        }

        if let Some(stop) = self.take_command(ControlAction::Stop) {
            let force = matches!(stop.payload, ControlPayload::Stop { force: true });
            let signal = if force { Signal::SIGKILL } else { Signal::SIGTERM };
            process_info!(ProcessRole::current(), "Stop requested, sending {} to the group", signal);
            self.process.signal_group(signal)?;
        }

        if signals::take_terminate() {
            // Our own group signal must not re-enter this path
            signals::ignore_terminate()?;
            self.process.signal_group(Signal::SIGTERM)?;
            return Ok(SuperviseStep::Terminated);
        }

        Ok(SuperviseStep::Continue)
    }

    /// Refresh every active record with a non-blocking wait on its pid
    pub fn process_status(&mut self) {
        let gone: Vec<Pid> = self
            .records
            .iter()
            .filter(|r| r.is_active())
            .map(|r| Pid::from_raw(r.pid))
            .filter(|pid| self.process.try_reap(*pid) == ReapState::Gone)
            .collect();
        for pid in gone {
            self.mark_stopped(pid);
        }
    }

    /// Receive one `expected` message, if any.
    ///
    /// A message of another action is pushed back unchanged for whichever
    /// poller is waiting on it.
    pub fn take_command(&self, expected: ControlAction) -> Option<ControlMessage> {
        let message = self.queue.receive(expected)?;
        if message.action() != expected {
            self.queue.push(message);
            return None;
        }
        Some(message)
    }

    /// Monitor loop: present startup and status reports for a bounded time.
    ///
    /// Returns how many reports were presented. Receiving nothing is not an error.
    pub fn wait_for_reports(&mut self) -> usize {
        let mut presented = 0;
        for _ in 0..self.config.report_wait_secs {
            std::thread::sleep(SUPERVISE_TICK);
            for action in [ControlAction::Allocate, ControlAction::StatusReply] {
                if let Some(report) = self.take_command(action) {
                    self.sink.present(action, report.start_list().unwrap_or_default());
                    presented += 1;
                }
            }
        }
        if presented == 0 {
            process_warn!(ProcessRole::current(), "No report from the daemon head");
        }
        presented
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DaemonBranch {
    Monitor,
    Head,
}
