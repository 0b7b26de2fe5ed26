//! Error types for the worker pool.

use taskguard_core::GuardError;

/// Reasons a job was not accepted by a [`Pool`](crate::Pool).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// The job queue is full.
    #[error("pool is full: queue capacity ({capacity}) reached")]
    PoolFull {
        /// Size of the job queue.
        capacity: usize,
    },
    /// The pool is stopping or stopped.
    #[error("pool is stopped")]
    Stopped,
}

impl PoolError {
    /// Returns `true` if the queue was full.
    pub fn is_full(&self) -> bool {
        matches!(self, PoolError::PoolFull { .. })
    }

    /// Returns `true` if the pool no longer accepts work.
    pub fn is_stopped(&self) -> bool {
        matches!(self, PoolError::Stopped)
    }
}

impl<E> From<PoolError> for GuardError<E> {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::PoolFull { capacity } => GuardError::PoolFull { capacity },
            PoolError::Stopped => GuardError::Stopped { component: "pool" },
        }
    }
}
