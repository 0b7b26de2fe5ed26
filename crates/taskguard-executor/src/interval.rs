use crate::handle::TaskId;
use tokio_util::sync::CancellationToken;

/// Controls an interval started with
/// [`SafeExecutor::spawn_with_interval`](crate::SafeExecutor::spawn_with_interval).
///
/// Clones control the same interval.
#[derive(Debug, Clone)]
pub struct IntervalHandle {
    token: CancellationToken,
    supervisor: TaskId,
}

impl IntervalHandle {
    pub(crate) fn new(token: CancellationToken, supervisor: TaskId) -> Self {
        Self { token, supervisor }
    }

    /// Stops scheduling new runs. Runs already in flight finish normally.
    /// Calling `stop` more than once has no further effect.
    pub fn stop(&self) {
        self.token.cancel();
    }

    /// Returns `true` once [`stop`](Self::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Id of the supervising task.
    pub fn supervisor_id(&self) -> TaskId {
        self.supervisor
    }
}
