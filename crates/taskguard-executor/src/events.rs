use crate::handle::TaskId;
use std::time::{Duration, Instant};
use taskguard_core::TaskEvent;

/// Events emitted by a [`SafeExecutor`](crate::SafeExecutor).
#[derive(Debug, Clone)]
pub enum ExecutorEvent {
    /// A task was handed to the runtime.
    TaskSpawned {
        executor: String,
        timestamp: Instant,
        task: TaskId,
    },
    /// A task finished without panicking.
    TaskCompleted {
        executor: String,
        timestamp: Instant,
        task: TaskId,
        duration: Duration,
    },
    /// A task panicked and the panic was contained.
    TaskPanicked {
        executor: String,
        timestamp: Instant,
        task: TaskId,
        message: String,
    },
    /// A cancellable task was skipped because its token was already cancelled.
    TaskSkipped {
        executor: String,
        timestamp: Instant,
        task: TaskId,
    },
    /// An interval tick was dropped because too many runs were still in flight.
    IntervalTickSkipped {
        executor: String,
        timestamp: Instant,
        supervisor: TaskId,
        in_flight: usize,
    },
}

impl TaskEvent for ExecutorEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ExecutorEvent::TaskSpawned { .. } => "task_spawned",
            ExecutorEvent::TaskCompleted { .. } => "task_completed",
            ExecutorEvent::TaskPanicked { .. } => "task_panicked",
            ExecutorEvent::TaskSkipped { .. } => "task_skipped",
            ExecutorEvent::IntervalTickSkipped { .. } => "interval_tick_skipped",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            ExecutorEvent::TaskSpawned { timestamp, .. }
            | ExecutorEvent::TaskCompleted { timestamp, .. }
            | ExecutorEvent::TaskPanicked { timestamp, .. }
            | ExecutorEvent::TaskSkipped { timestamp, .. }
            | ExecutorEvent::IntervalTickSkipped { timestamp, .. } => *timestamp,
        }
    }

    fn source_name(&self) -> &str {
        match self {
            ExecutorEvent::TaskSpawned { executor, .. }
            | ExecutorEvent::TaskCompleted { executor, .. }
            | ExecutorEvent::TaskPanicked { executor, .. }
            | ExecutorEvent::TaskSkipped { executor, .. }
            | ExecutorEvent::IntervalTickSkipped { executor, .. } => executor,
        }
    }
}
