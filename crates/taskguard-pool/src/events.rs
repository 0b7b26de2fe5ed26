//! Event types for the worker pool.

use std::time::{Duration, Instant};
use taskguard_core::TaskEvent;

/// Events emitted by a [`Pool`](crate::Pool).
#[derive(Debug, Clone)]
pub enum PoolEvent {
    /// A job was accepted into the queue.
    JobSubmitted {
        /// Name of the pool.
        pool_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Id of the job.
        job_id: String,
    },
    /// A job was turned away.
    JobRejected {
        /// Name of the pool.
        pool_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Id of the job.
        job_id: String,
        /// `"full"` or `"stopped"`.
        reason: &'static str,
    },
    /// A job returned `Ok`.
    JobCompleted {
        /// Name of the pool.
        pool_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Id of the job.
        job_id: String,
        /// How long the job ran.
        duration: Duration,
        /// Whether the job ran past its deadline.
        timed_out: bool,
    },
    /// A job returned an error, panicked or could not be started.
    JobFailed {
        /// Name of the pool.
        pool_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Id of the job.
        job_id: String,
        /// How long the job ran.
        duration: Duration,
        /// Whether the job ran past its deadline.
        timed_out: bool,
        /// Rendered error.
        error: String,
    },
    /// A job has been running longer than the worker timeout.
    WorkerStalled {
        /// Name of the pool.
        pool_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Id of the job.
        job_id: String,
        /// Configured worker timeout.
        worker_timeout: Duration,
    },
}

impl TaskEvent for PoolEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PoolEvent::JobSubmitted { .. } => "job_submitted",
            PoolEvent::JobRejected { .. } => "job_rejected",
            PoolEvent::JobCompleted { .. } => "job_completed",
            PoolEvent::JobFailed { .. } => "job_failed",
            PoolEvent::WorkerStalled { .. } => "worker_stalled",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            PoolEvent::JobSubmitted { timestamp, .. }
            | PoolEvent::JobRejected { timestamp, .. }
            | PoolEvent::JobCompleted { timestamp, .. }
            | PoolEvent::JobFailed { timestamp, .. }
            | PoolEvent::WorkerStalled { timestamp, .. } => *timestamp,
        }
    }

    fn source_name(&self) -> &str {
        match self {
            PoolEvent::JobSubmitted { pool_name, .. }
            | PoolEvent::JobRejected { pool_name, .. }
            | PoolEvent::JobCompleted { pool_name, .. }
            | PoolEvent::JobFailed { pool_name, .. }
            | PoolEvent::WorkerStalled { pool_name, .. } => pool_name,
        }
    }
}
