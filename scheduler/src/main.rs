//! Main entry point for the scheduler binary
//!
//! Wires the real service implementations into the supervisor and provides
//! the `status` and `stop` control commands.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};

use scheduler::config::{DEFAULT_PREFIX, DEFAULT_REPORT_WAIT_SECS, load_task_file};
use scheduler::services::{FileChannel, NixProcessControl, TablePresenter};
use scheduler::{ReportSink, SchedulerConfig, SchedulerError, Supervisor, client};
use shared::{ControlAction, ProcessRole, logging, process_debug, process_info};

/// Process-based periodic task scheduler
#[derive(Parser)]
#[command(name = "scheduler")]
#[command(about = "Runs periodic tasks in forked worker processes")]
pub struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Process title prefix; worker titles are `<prefix>_<alias>`
    #[arg(long, default_value = DEFAULT_PREFIX, global = true)]
    pub prefix: String,

    /// Command channel key (defaults to the prefix)
    #[arg(long, global = true)]
    pub ipc_key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Fork the workers described by a task file and supervise them
    Start {
        /// JSON task file: [{"alias", "interval", "workers", "command"}]
        #[arg(long)]
        tasks: PathBuf,

        /// Detach into the background
        #[arg(long)]
        daemon: bool,

        /// Keep the current working directory when daemonizing
        #[arg(long)]
        no_chdir: bool,

        /// Keep stdin/stdout/stderr attached when daemonizing
        #[arg(long)]
        keep_streams: bool,

        /// Let signals interrupt waits instead of pumping them every second
        #[arg(long)]
        async_signals: bool,

        /// Seconds the foreground process waits for the startup report
        #[arg(long, default_value_t = DEFAULT_REPORT_WAIT_SECS)]
        report_wait: u64,
    },
    /// Ask a running daemon for its worker table
    Status {
        /// Seconds to wait for the reply
        #[arg(long, default_value_t = 5)]
        timeout: u64,
    },
    /// Ask a running daemon to terminate its process group
    Stop {
        /// Kill instead of terminating gracefully
        #[arg(long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    ProcessRole::set(match args.command {
        Command::Start { .. } => ProcessRole::Daemon,
        _ => ProcessRole::Client,
    });
    logging::init_tracing_with_level(Some(&args.log_level), args.log_file.as_deref())
        .context("initialising logging")?;

    let result = run(args);
    if let Err(e) = &result {
        logging::log_error(&ProcessRole::current(), "scheduler", e);
    }
    result
}

fn run(args: Args) -> anyhow::Result<()> {
    let mut config = SchedulerConfig {
        prefix: args.prefix,
        ipc_key: args.ipc_key,
        log_file: args.log_file,
        ..SchedulerConfig::default()
    };

    match args.command {
        Command::Start {
            tasks,
            daemon,
            no_chdir,
            keep_streams,
            async_signals,
            report_wait,
        } => {
            config.daemon = daemon;
            config.chdir_root = !no_chdir;
            config.close_std_streams = !keep_streams;
            config.async_signals = async_signals;
            config.report_wait_secs = report_wait;
            config.validate()?;

            let catalog =
                load_task_file(&tasks).with_context(|| format!("loading task file {}", tasks.display()))?;
            if catalog.is_empty() {
                return Err(SchedulerError::config("task file defines no tasks").into());
            }
            logging::log_startup(
                &ProcessRole::current(),
                &format!("{} tasks, {} workers", catalog.tasks().len(), catalog.worker_total()),
            );

            let channel = FileChannel::open(config.channel_key())?;
            process_debug!(ProcessRole::current(), "Command channel at {}", channel.path().display());

            let mut supervisor =
                Supervisor::new(config, catalog, channel, NixProcessControl::new(), TablePresenter::new());
            supervisor.start()?;
            logging::log_shutdown(&ProcessRole::current(), "monitor wait finished");
        }
        Command::Status { timeout } => {
            config.validate()?;
            let channel = FileChannel::open(config.channel_key())?;
            let records = client::request_status(&channel, Duration::from_secs(timeout))?;
            TablePresenter::new().present(ControlAction::StatusReply, &records);
        }
        Command::Stop { force } => {
            config.validate()?;
            let channel = FileChannel::open(config.channel_key())?;
            client::request_stop(&channel, force);
            process_info!(ProcessRole::current(), "Stop request sent (force: {})", force);
        }
    }

    Ok(())
}
