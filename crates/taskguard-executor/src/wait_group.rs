//! Waiting for a group of protected tasks.

use crate::executor::SafeExecutor;
use crate::handle::TaskHandle;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Counts protected tasks and lets callers wait for all of them.
///
/// A task counts as finished however it ends: returning, panicking, being
/// skipped or being aborted. It leaves the group only after the executor's
/// stats record it, so `stats()` is settled once `wait()` returns.
///
/// ```rust
/// use taskguard_executor::SafeExecutor;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let executor = SafeExecutor::new();
/// let group = executor.wait_group();
/// let hits = Arc::new(AtomicUsize::new(0));
///
/// for _ in 0..4 {
///     let hits = Arc::clone(&hits);
///     group.spawn(async move {
///         hits.fetch_add(1, Ordering::SeqCst);
///     });
/// }
///
/// group.wait().await;
/// assert_eq!(hits.load(Ordering::SeqCst), 4);
/// # }
/// ```
#[derive(Clone)]
pub struct WaitGroup {
    executor: SafeExecutor,
    state: Arc<State>,
}

struct State {
    pending: AtomicUsize,
    notify: Notify,
}

impl WaitGroup {
    /// Creates an empty group spawning through `executor`.
    pub fn new(executor: SafeExecutor) -> Self {
        Self {
            executor,
            state: Arc::new(State {
                pending: AtomicUsize::new(0),
                notify: Notify::new(),
            }),
        }
    }

    /// Spawns `fut` through the executor and counts it.
    pub fn spawn<F>(&self, fut: F) -> TaskHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.executor.spawn_counted(self.enter(), fut)
    }

    /// Spawns `f(token)` through the executor and counts it. See
    /// [`SafeExecutor::spawn_with_token`].
    pub fn spawn_with_token<F, Fut>(&self, token: CancellationToken, f: F) -> TaskHandle<Fut::Output>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        self.executor
            .spawn_with_token_counted(self.enter(), token, f)
    }

    /// Counts one unit of work by hand. The work is finished when the
    /// returned guard is dropped.
    pub fn enter(&self) -> WaitGuard {
        self.state.pending.fetch_add(1, Ordering::AcqRel);
        WaitGuard {
            state: Arc::clone(&self.state),
        }
    }

    /// Resolves once every counted task has finished.
    pub async fn wait(&self) {
        loop {
            let notified = self.state.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.state.pending.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Outstanding units of work.
    pub fn len(&self) -> usize {
        self.state.pending.load(Ordering::Acquire)
    }

    /// Returns `true` when no work is outstanding.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The executor this group spawns through.
    pub fn executor(&self) -> &SafeExecutor {
        &self.executor
    }
}

/// Marks one unit of [`WaitGroup`] work as finished when dropped.
#[must_use = "the work is considered finished as soon as the guard is dropped"]
pub struct WaitGuard {
    state: Arc<State>,
}

impl Drop for WaitGuard {
    fn drop(&mut self) {
        if self.state.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.state.notify.notify_waiters();
        }
    }
}
