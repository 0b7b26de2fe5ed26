//! Result-collecting groups of protected tasks.

use crate::executor::SafeExecutor;
use crate::wait_group::WaitGroup;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Outcome of one task in a [`Batch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult<T, E> {
    /// Position of the task in submission order, starting at zero.
    pub index: usize,
    /// What the task returned.
    pub result: Result<T, E>,
}

/// Runs fallible tasks through a [`WaitGroup`] and collects their results.
///
/// Results are recorded in completion order, each tagged with its
/// submission index. A task that panics records nothing; the panic shows up
/// in the executor stats instead.
///
/// ```rust
/// use taskguard_executor::SafeExecutor;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let executor = SafeExecutor::new();
/// let batch = executor.batch::<u32, String>();
///
/// batch.add(async { Ok(1) });
/// batch.add(async { Err("shard 2 offline".to_string()) });
///
/// let (results, errors) = batch.wait().await;
/// assert_eq!(results.len(), 2);
/// assert_eq!(errors, vec!["shard 2 offline".to_string()]);
/// # }
/// ```
pub struct Batch<T, E> {
    group: WaitGroup,
    next_index: AtomicUsize,
    collected: Arc<Mutex<Collected<T, E>>>,
}

struct Collected<T, E> {
    results: Vec<BatchResult<T, E>>,
    errors: usize,
}

impl<T, E> Batch<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Creates an empty batch spawning through `executor`.
    pub fn new(executor: SafeExecutor) -> Self {
        Self {
            group: WaitGroup::new(executor),
            next_index: AtomicUsize::new(0),
            collected: Arc::new(Mutex::new(Collected {
                results: Vec::new(),
                errors: 0,
            })),
        }
    }

    /// Spawns `fut` and records its result. Returns the submission index.
    pub fn add<F>(&self, fut: F) -> usize
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        let index = self.next_index.fetch_add(1, Ordering::Relaxed);
        let collected = Arc::clone(&self.collected);
        let _ = self.group.spawn(async move {
            let result = fut.await;
            let mut collected = collected.lock();
            if result.is_err() {
                collected.errors += 1;
            }
            collected.results.push(BatchResult { index, result });
        });
        index
    }

    /// Number of tasks added so far.
    pub fn len(&self) -> usize {
        self.next_index.load(Ordering::Relaxed)
    }

    /// Returns `true` if nothing was added.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Waits for every task and returns all results plus the errors among them.
    pub async fn wait(self) -> (Vec<BatchResult<T, E>>, Vec<E>)
    where
        E: Clone,
    {
        let results = self.wait_for_results().await;
        let errors = results
            .iter()
            .filter_map(|r| r.result.as_ref().err().cloned())
            .collect();
        (results, errors)
    }

    /// Waits for every task and returns the results.
    pub async fn wait_for_results(self) -> Vec<BatchResult<T, E>> {
        self.group.wait().await;
        let mut collected = self.collected.lock();
        std::mem::take(&mut collected.results)
    }

    /// Waits for every task and returns only the errors.
    pub async fn wait_for_errors(self) -> Vec<E> {
        self.wait_for_results()
            .await
            .into_iter()
            .filter_map(|r| r.result.err())
            .collect()
    }

    /// Waits for every task added so far and reports whether any failed.
    pub async fn has_errors(&self) -> bool {
        self.group.wait().await;
        self.collected.lock().errors > 0
    }
}
