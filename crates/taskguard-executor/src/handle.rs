use crate::panic::PanicReport;
use std::fmt;
use std::time::{Duration, Instant};
use taskguard_core::GuardError;
use tokio::task::JoinHandle;

/// Identifier of a task spawned by a [`SafeExecutor`](crate::SafeExecutor).
///
/// Ids increase monotonically per executor and display as `task-<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TaskId(pub(crate) u64);

impl TaskId {
    /// Returns the numeric part of the id.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// How a task was spawned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum TaskKind {
    /// [`SafeExecutor::spawn`](crate::SafeExecutor::spawn)
    Plain,
    /// [`SafeExecutor::spawn_with_token`](crate::SafeExecutor::spawn_with_token)
    Cancellable,
    /// [`SafeExecutor::spawn_with_timeout`](crate::SafeExecutor::spawn_with_timeout)
    Deadline,
    /// [`SafeExecutor::spawn_with_delay`](crate::SafeExecutor::spawn_with_delay)
    Delayed,
    /// The supervising loop behind an [`IntervalHandle`](crate::IntervalHandle).
    IntervalSupervisor,
    /// One run of an interval body.
    IntervalTick,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskKind::Plain => "plain",
            TaskKind::Cancellable => "cancellable",
            TaskKind::Deadline => "deadline",
            TaskKind::Delayed => "delayed",
            TaskKind::IntervalSupervisor => "interval_supervisor",
            TaskKind::IntervalTick => "interval_tick",
        };
        f.write_str(s)
    }
}

/// A task that is currently running.
#[derive(Debug, Clone)]
pub struct ActiveTask {
    /// Task id.
    pub id: TaskId,
    /// How the task was spawned.
    pub kind: TaskKind,
    /// When the task was spawned.
    pub started_at: Instant,
}

impl ActiveTask {
    /// Time since the task was spawned.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Why a task produced no value.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TaskError {
    /// The task panicked. The panic was contained and reported.
    #[error("{} panicked: {}", .0.task_id, .0.message)]
    Panicked(PanicReport),

    /// The task's token was cancelled before the task started.
    #[error("{0} skipped: cancelled before start")]
    Skipped(TaskId),

    /// The task was aborted or its runtime shut down before it finished.
    #[error("{0} was aborted")]
    Aborted(TaskId),
}

impl TaskError {
    /// Returns the id of the task this error belongs to.
    pub fn task_id(&self) -> TaskId {
        match self {
            TaskError::Panicked(report) => report.task_id,
            TaskError::Skipped(id) | TaskError::Aborted(id) => *id,
        }
    }

    /// Returns `true` if the task panicked.
    pub fn is_panic(&self) -> bool {
        matches!(self, TaskError::Panicked(_))
    }

    /// Returns `true` if the task was skipped before it started.
    pub fn is_skipped(&self) -> bool {
        matches!(self, TaskError::Skipped(_))
    }
}

impl<E> From<TaskError> for GuardError<E> {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::Panicked(report) => GuardError::Panicked {
                message: report.message,
            },
            TaskError::Skipped(_) | TaskError::Aborted(_) => GuardError::Stopped {
                component: "executor",
            },
        }
    }
}

/// Owned handle to a protected task.
///
/// Dropping the handle detaches the task; it keeps running.
#[derive(Debug)]
pub struct TaskHandle<T> {
    pub(crate) id: TaskId,
    pub(crate) inner: JoinHandle<Result<T, TaskError>>,
}

impl<T> TaskHandle<T> {
    /// Returns the task id.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Returns `true` once the task has finished.
    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    /// Aborts the task at its next suspension point.
    pub fn abort(&self) {
        self.inner.abort();
    }

    /// Waits for the task and returns its output.
    pub async fn join(self) -> Result<T, TaskError> {
        match self.inner.await {
            Ok(result) => result,
            // A panic escaping here came from the recovery handler, which is
            // not protected.
            Err(_) => Err(TaskError::Aborted(self.id)),
        }
    }
}
