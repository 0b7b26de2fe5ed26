use crate::handle::TaskId;
use std::time::SystemTime;

/// Counters kept by a [`SafeExecutor`](crate::SafeExecutor).
///
/// `completed_count + panic_count <= total_spawned` holds at every
/// observation, with equality once every spawned task has finished.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ExecutionStats {
    /// Tasks spawned since creation or the last reset.
    pub total_spawned: u64,
    /// Tasks currently running.
    pub active_count: u64,
    /// Tasks that finished without panicking, including skipped ones.
    pub completed_count: u64,
    /// Tasks that panicked.
    pub panic_count: u64,
    /// When the most recent panic was caught.
    pub last_panic_time: Option<SystemTime>,
    /// Which task panicked most recently.
    pub last_panic_task: Option<TaskId>,
}

impl ExecutionStats {
    pub(crate) fn record_spawn(&mut self) {
        self.total_spawned += 1;
        self.active_count += 1;
    }

    pub(crate) fn record_completion(&mut self) {
        self.active_count = self.active_count.saturating_sub(1);
        self.completed_count += 1;
    }

    pub(crate) fn record_panic(&mut self, task: TaskId, at: SystemTime) {
        self.active_count = self.active_count.saturating_sub(1);
        self.panic_count += 1;
        self.last_panic_time = Some(at);
        self.last_panic_task = Some(task);
    }

    /// Zeroes the counters while keeping tasks that are still running, so
    /// they can finish without breaking the invariant.
    pub(crate) fn reset(&mut self) {
        *self = ExecutionStats {
            total_spawned: self.active_count,
            active_count: self.active_count,
            ..Default::default()
        };
    }

    /// Tasks that have finished, one way or another.
    pub fn finished(&self) -> u64 {
        self.completed_count + self.panic_count
    }
}
