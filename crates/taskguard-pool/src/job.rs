use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use taskguard_core::BoxError;
use tokio_util::sync::CancellationToken;

/// A unit of work accepted by a [`Pool`](crate::Pool).
///
/// A job is consumed exactly once. The token passed to
/// [`execute`](Job::execute) is cancelled when the job's deadline passes or
/// the pool is force-stopped; jobs that want to stop early must watch it.
pub trait Job: Send + 'static {
    /// Identifier used in logs and events.
    fn id(&self) -> &str;

    /// Deadline for this job. `None` uses the pool's job timeout.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Runs the job.
    fn execute(self: Box<Self>, token: CancellationToken) -> BoxFuture<'static, Result<(), BoxError>>;
}

/// A [`Job`] built from a closure.
pub struct SimpleJob<F> {
    id: String,
    timeout: Option<Duration>,
    f: F,
}

impl<F, Fut> SimpleJob<F>
where
    F: FnOnce(CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    /// Wraps `f` as a job named `id`.
    pub fn new(id: impl Into<String>, f: F) -> Self {
        Self {
            id: id.into(),
            timeout: None,
            f,
        }
    }

    /// Sets a per-job deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl<F, Fut> Job for SimpleJob<F>
where
    F: FnOnce(CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn execute(self: Box<Self>, token: CancellationToken) -> BoxFuture<'static, Result<(), BoxError>> {
        Box::pin((self.f)(token))
    }
}

impl<F> fmt::Debug for SimpleJob<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleJob")
            .field("id", &self.id)
            .field("timeout", &self.timeout)
            .finish()
    }
}
