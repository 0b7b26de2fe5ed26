use crate::events::PoolEvent;
use std::time::Duration;
use taskguard_core::{EventListeners, FnListener};

/// Configuration for a [`Pool`](crate::Pool).
pub struct PoolConfig {
    pub(crate) max_workers: usize,
    pub(crate) queue_size: usize,
    pub(crate) worker_timeout: Duration,
    pub(crate) job_timeout: Duration,
    pub(crate) shutdown_grace: Duration,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<PoolEvent>,
}

impl PoolConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> PoolConfigBuilder {
        PoolConfigBuilder::new()
    }

    /// Number of workers.
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Capacity of the job queue.
    pub fn queue_size(&self) -> usize {
        self.queue_size
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfigBuilder::new().build()
    }
}

/// Builder for [`PoolConfig`].
///
/// Zero worker counts and queue sizes are raised to one.
pub struct PoolConfigBuilder {
    max_workers: usize,
    queue_size: usize,
    worker_timeout: Duration,
    job_timeout: Duration,
    shutdown_grace: Duration,
    name: String,
    event_listeners: EventListeners<PoolEvent>,
}

impl PoolConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            max_workers: 10,
            queue_size: 1000,
            worker_timeout: Duration::from_secs(30 * 60),
            job_timeout: Duration::from_secs(5 * 60),
            shutdown_grace: Duration::from_millis(200),
            name: String::from("<unnamed>"),
            event_listeners: EventListeners::new(),
        }
    }

    /// Number of long-lived workers.
    ///
    /// Default: 10
    pub fn max_workers(mut self, n: usize) -> Self {
        self.max_workers = n.max(1);
        self
    }

    /// Capacity of the job queue. Submissions beyond it are rejected.
    ///
    /// Default: 1000
    pub fn queue_size(mut self, n: usize) -> Self {
        self.queue_size = n.max(1);
        self
    }

    /// How long a single job may occupy a worker before a warning is logged.
    ///
    /// Default: 30 minutes
    pub fn worker_timeout(mut self, timeout: Duration) -> Self {
        self.worker_timeout = timeout;
        self
    }

    /// Deadline for jobs that do not carry their own timeout.
    ///
    /// Default: 5 minutes
    pub fn job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = timeout;
        self
    }

    /// How long [`Pool::stop`](crate::Pool::stop) waits for workers to exit.
    ///
    /// Default: 200 milliseconds
    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Give this pool a human-readable name for logs, events and metrics.
    ///
    /// Default: `<unnamed>`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked when a job is rejected.
    ///
    /// Receives the job id and the reason (`"full"` or `"stopped"`).
    pub fn on_job_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &'static str) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &PoolEvent| {
                if let PoolEvent::JobRejected { job_id, reason, .. } = event {
                    f(job_id, reason);
                }
            }));
        self
    }

    /// Registers a callback invoked when a job returns `Ok`.
    pub fn on_job_completed<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, Duration) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &PoolEvent| {
                if let PoolEvent::JobCompleted {
                    job_id, duration, ..
                } = event
                {
                    f(job_id, *duration);
                }
            }));
        self
    }

    /// Registers a callback invoked when a job fails.
    ///
    /// Receives the job id and the rendered error.
    pub fn on_job_failed<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &PoolEvent| {
                if let PoolEvent::JobFailed { job_id, error, .. } = event {
                    f(job_id, error);
                }
            }));
        self
    }

    /// Registers a callback invoked when a job outlives the worker timeout.
    pub fn on_worker_stalled<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &PoolEvent| {
                if let PoolEvent::WorkerStalled { job_id, .. } = event {
                    f(job_id);
                }
            }));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> PoolConfig {
        PoolConfig {
            max_workers: self.max_workers,
            queue_size: self.queue_size,
            worker_timeout: self.worker_timeout,
            job_timeout: self.job_timeout,
            shutdown_grace: self.shutdown_grace,
            name: self.name,
            event_listeners: self.event_listeners,
        }
    }
}

impl Default for PoolConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
