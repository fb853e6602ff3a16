//! Task catalog: the definitions the supervisor allocates workers for
//!
//! A task's target is resolved into a callable once, when the definition is
//! built. Workers only ever call `TaskTarget::invoke`.

use std::fmt;
use std::sync::Arc;

use shared::{Interval, TaskName};

use crate::error::{SchedulerError, SchedulerResult};

/// Result of one task invocation. An `Err` terminates the worker.
pub type TaskOutcome = anyhow::Result<()>;

/// Invocation convention of a task target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Plain function or closure
    FreeFunction,
    /// Associated function of a type, no instance
    StaticMethod,
    /// Method called on a freshly constructed instance at every firing
    InstanceMethod,
}

/// Callable a worker runs on every alarm firing
#[derive(Clone)]
pub enum TaskTarget {
    Function(Arc<dyn Fn() -> TaskOutcome + Send + Sync>),
    StaticMethod {
        owner: String,
        method: fn() -> TaskOutcome,
    },
    InstanceMethod {
        owner: String,
        invoke: Arc<dyn Fn() -> TaskOutcome + Send + Sync>,
    },
}

impl TaskTarget {
    pub fn function<F>(f: F) -> Self
    where
        F: Fn() -> TaskOutcome + Send + Sync + 'static,
    {
        TaskTarget::Function(Arc::new(f))
    }

    pub fn static_method(owner: impl Into<String>, method: fn() -> TaskOutcome) -> Self {
        TaskTarget::StaticMethod {
            owner: owner.into(),
            method,
        }
    }

    /// Target that builds a new `T` and calls `method` on it at every firing
    pub fn instance_method<T>(owner: impl Into<String>, method: fn(&mut T) -> TaskOutcome) -> Self
    where
        T: Default + 'static,
    {
        TaskTarget::InstanceMethod {
            owner: owner.into(),
            invoke: Arc::new(move || {
                let mut instance = T::default();
                method(&mut instance)
            }),
        }
    }

    pub fn dispatch_mode(&self) -> DispatchMode {
        match self {
            TaskTarget::Function(_) => DispatchMode::FreeFunction,
            TaskTarget::StaticMethod { .. } => DispatchMode::StaticMethod,
            TaskTarget::InstanceMethod { .. } => DispatchMode::InstanceMethod,
        }
    }

    pub fn invoke(&self) -> TaskOutcome {
        match self {
            TaskTarget::Function(f) => f(),
            TaskTarget::StaticMethod { method, .. } => method(),
            TaskTarget::InstanceMethod { invoke, .. } => invoke(),
        }
    }
}

impl fmt::Debug for TaskTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskTarget::Function(_) => f.write_str("Function(..)"),
            TaskTarget::StaticMethod { owner, .. } => write!(f, "StaticMethod({owner})"),
            TaskTarget::InstanceMethod { owner, .. } => write!(f, "InstanceMethod({owner})"),
        }
    }
}

/// One periodic task: `workers` identical processes, each firing every `interval`
#[derive(Debug, Clone)]
pub struct TaskDefinition {
    pub alias: String,
    pub interval: Interval,
    pub workers: u32,
    pub target: TaskTarget,
}

impl TaskDefinition {
    pub fn new(
        alias: impl Into<String>,
        interval_secs: u64,
        workers: u32,
        target: TaskTarget,
    ) -> SchedulerResult<Self> {
        let alias = alias.into();
        if alias.trim().is_empty() {
            return Err(SchedulerError::invalid_task(alias, "alias must not be empty"));
        }
        let interval = Interval::from_secs(interval_secs)
            .map_err(|_| SchedulerError::invalid_task(&alias, "interval must be at least 1 second"))?;
        if workers == 0 {
            return Err(SchedulerError::invalid_task(alias, "worker count must be at least 1"));
        }
        Ok(Self {
            alias,
            interval,
            workers,
            target,
        })
    }

    pub fn dispatch_mode(&self) -> DispatchMode {
        self.target.dispatch_mode()
    }

    pub fn task_name(&self, prefix: &str) -> TaskName {
        TaskName::new(prefix, &self.alias)
    }
}

/// Ordered list of task definitions, aliases unique
#[derive(Debug, Clone, Default)]
pub struct TaskCatalog {
    tasks: Vec<TaskDefinition>,
}

impl TaskCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, task: TaskDefinition) -> SchedulerResult<&mut Self> {
        if self.tasks.iter().any(|t| t.alias == task.alias) {
            return Err(SchedulerError::invalid_task(task.alias, "alias is already registered"));
        }
        self.tasks.push(task);
        Ok(self)
    }

    /// Register a plain function or closure
    pub fn add_function<F>(
        &mut self,
        alias: &str,
        interval_secs: u64,
        workers: u32,
        f: F,
    ) -> SchedulerResult<&mut Self>
    where
        F: Fn() -> TaskOutcome + Send + Sync + 'static,
    {
        self.add(TaskDefinition::new(alias, interval_secs, workers, TaskTarget::function(f))?)
    }

    pub fn tasks(&self) -> &[TaskDefinition] {
        &self.tasks
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Total number of worker processes the catalog asks for
    pub fn worker_total(&self) -> u32 {
        self.tasks.iter().map(|t| t.workers).sum()
    }
}
