use crate::batch::Batch;
use crate::config::{ExecutorConfig, ExecutorConfigBuilder};
use crate::deadline::run_with_deadline;
use crate::events::ExecutorEvent;
use crate::handle::{ActiveTask, TaskError, TaskHandle, TaskId, TaskKind};
use crate::interval::IntervalHandle;
use crate::logger::{TaskLogger, TracingLogger};
use crate::panic::{self, Guarded, PanicReport};
use crate::stats::ExecutionStats;
use crate::wait_group::{WaitGroup, WaitGuard};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use taskguard_core::{EventListeners, TaskEvent};
use tokio::runtime::Handle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_gauge, gauge};

#[cfg(feature = "metrics")]
static METRICS_INIT: std::sync::Once = std::sync::Once::new();

/// Callback invoked once for every contained panic.
pub type RecoverHandler = Arc<dyn Fn(&PanicReport) + Send + Sync>;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Spawns tasks on a tokio runtime so that a panic inside a task is caught,
/// logged with its backtrace and handed to a recovery handler instead of
/// escaping.
///
/// `SafeExecutor` is cheap to clone; clones share stats, handler and logger.
///
/// # Examples
///
/// ```rust
/// use taskguard_executor::SafeExecutor;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let executor = SafeExecutor::builder().name("ingest").build();
///
/// let ok = executor.spawn(async { 1 + 1 });
/// let bad = executor.spawn(async { panic!("bad input") });
///
/// assert_eq!(ok.join().await.unwrap(), 2);
/// assert!(bad.join().await.unwrap_err().is_panic());
///
/// let stats = executor.stats();
/// assert_eq!(stats.completed_count, 1);
/// assert_eq!(stats.panic_count, 1);
/// # }
/// ```
#[derive(Clone)]
pub struct SafeExecutor {
    shared: Arc<Shared>,
}

struct Shared {
    name: String,
    handle: Handle,
    max_interval_in_flight: Option<usize>,
    listeners: EventListeners<ExecutorEvent>,
    next_id: AtomicU64,
    stats: Mutex<ExecutionStats>,
    active: Mutex<HashMap<TaskId, ActiveTask>>,
    recover_handler: RwLock<Option<RecoverHandler>>,
    logger: RwLock<Arc<dyn TaskLogger>>,
}

impl SafeExecutor {
    /// Creates an executor with default settings on the current runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn new() -> Self {
        ExecutorConfigBuilder::new().build()
    }

    /// Returns a builder for a configured executor.
    pub fn builder() -> ExecutorConfigBuilder {
        ExecutorConfigBuilder::new()
    }

    /// Creates an executor from a configuration, spawning onto `handle`.
    pub fn with_config(config: ExecutorConfig, handle: Handle) -> Self {
        #[cfg(feature = "metrics")]
        {
            METRICS_INIT.call_once(|| {
                describe_counter!(
                    "executor_tasks_spawned_total",
                    "Total number of tasks spawned through the executor"
                );
                describe_counter!(
                    "executor_tasks_finished_total",
                    "Total number of finished tasks by outcome"
                );
                describe_gauge!("executor_tasks_active", "Tasks currently running");
            });
        }

        let logger: Arc<dyn TaskLogger> = Arc::new(TracingLogger::new(config.name.clone()));
        Self {
            shared: Arc::new(Shared {
                name: config.name,
                handle,
                max_interval_in_flight: config.max_interval_in_flight,
                listeners: config.event_listeners,
                next_id: AtomicU64::new(0),
                stats: Mutex::new(ExecutionStats::default()),
                active: Mutex::new(HashMap::new()),
                recover_handler: RwLock::new(None),
                logger: RwLock::new(logger),
            }),
        }
    }

    /// Returns the executor name.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Returns the runtime handle tasks are spawned onto.
    pub fn runtime_handle(&self) -> &Handle {
        &self.shared.handle
    }

    /// Runs `fut` as a protected task.
    pub fn spawn<F>(&self, fut: F) -> TaskHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.launch(TaskKind::Plain, None, None, fut)
    }

    /// Runs `f(token)` as a protected task.
    ///
    /// The token is checked once before `f` is called. If it is already
    /// cancelled the task is skipped: a warning is logged, the task counts as
    /// completed and the handle resolves to [`TaskError::Skipped`]. After
    /// that, cancellation is only seen if `f` watches the token.
    pub fn spawn_with_token<F, Fut>(&self, token: CancellationToken, f: F) -> TaskHandle<Fut::Output>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        self.launch_with_token(token, None, f)
    }

    /// [`spawn`](Self::spawn) that releases `group` only after the task's
    /// stats have been settled.
    pub(crate) fn spawn_counted<F>(&self, group: WaitGuard, fut: F) -> TaskHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.launch(TaskKind::Plain, None, Some(group), fut)
    }

    pub(crate) fn spawn_with_token_counted<F, Fut>(
        &self,
        group: WaitGuard,
        token: CancellationToken,
        f: F,
    ) -> TaskHandle<Fut::Output>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        self.launch_with_token(token, Some(group), f)
    }

    fn launch_with_token<F, Fut>(
        &self,
        token: CancellationToken,
        group: Option<WaitGuard>,
        f: F,
    ) -> TaskHandle<Fut::Output>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        let body_token = token.clone();
        self.launch(TaskKind::Cancellable, Some(token), group, async move {
            f(body_token).await
        })
    }

    /// Runs `f(token)` as a protected task whose token is cancelled once
    /// `timeout` has elapsed since the task started.
    ///
    /// The body keeps running after the deadline until it returns.
    pub fn spawn_with_timeout<F, Fut>(&self, f: F, timeout: Duration) -> TaskHandle<Fut::Output>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        self.launch(TaskKind::Deadline, None, None, async move {
            let token = CancellationToken::new();
            run_with_deadline(f(token.clone()), token, timeout)
                .await
                .output
        })
    }

    /// Sleeps for `delay` inside a protected task, then runs `fut`.
    pub fn spawn_with_delay<F>(&self, fut: F, delay: Duration) -> TaskHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.launch(TaskKind::Delayed, None, None, async move {
            tokio::time::sleep(delay).await;
            fut.await
        })
    }

    /// Runs a fresh protected task built by `f` every `period` until the
    /// returned handle is stopped.
    ///
    /// Each run is independent: a panicking run does not affect later ones.
    /// The first run happens one period after the call. Dropping the handle
    /// does not stop the interval.
    pub fn spawn_with_interval<F, Fut>(&self, f: F, period: Duration) -> IntervalHandle
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let period = period.max(MIN_INTERVAL);
        let token = CancellationToken::new();
        let stop = token.clone();
        let executor = self.clone();
        let body = Arc::new(f);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let supervisor = self.next_task_id();

        let handle = self.launch_as(supervisor, TaskKind::IntervalSupervisor, None, None, async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let running = in_flight.load(Ordering::Acquire);
                if let Some(max) = executor.shared.max_interval_in_flight {
                    if running >= max {
                        executor.shared.tick_skipped(supervisor, running);
                        continue;
                    }
                }

                let slot = InFlightSlot::take(&in_flight);
                let body = Arc::clone(&body);
                let _ = executor.launch(TaskKind::IntervalTick, None, None, async move {
                    let _slot = slot;
                    body().await;
                });
            }
        });

        IntervalHandle::new(token, handle.id())
    }

    /// Installs the recovery handler called for every contained panic.
    ///
    /// The handler runs after stats are updated and the panic is logged. A
    /// panic inside the handler itself is not contained by the executor.
    pub fn set_recover_handler<H>(&self, handler: H)
    where
        H: Fn(&PanicReport) + Send + Sync + 'static,
    {
        *self.shared.recover_handler.write() = Some(Arc::new(handler));
    }

    /// Removes the recovery handler.
    pub fn clear_recover_handler(&self) {
        *self.shared.recover_handler.write() = None;
    }

    /// Replaces the logger.
    pub fn set_logger(&self, logger: Arc<dyn TaskLogger>) {
        *self.shared.logger.write() = logger;
    }

    /// Returns the current logger.
    pub fn logger(&self) -> Arc<dyn TaskLogger> {
        self.shared.logger()
    }

    /// Returns a snapshot of the execution counters.
    pub fn stats(&self) -> ExecutionStats {
        self.shared.stats.lock().clone()
    }

    /// Zeroes the counters. Tasks still running stay counted as active.
    pub fn reset_stats(&self) {
        self.shared.stats.lock().reset();
    }

    /// Returns the tasks currently running, oldest first.
    pub fn active_tasks(&self) -> Vec<ActiveTask> {
        let mut tasks: Vec<ActiveTask> = self.shared.active.lock().values().cloned().collect();
        tasks.sort_by_key(|task| task.id);
        tasks
    }

    /// Creates a [`WaitGroup`] that spawns through this executor.
    pub fn wait_group(&self) -> WaitGroup {
        WaitGroup::new(self.clone())
    }

    /// Creates a [`Batch`] that spawns through this executor.
    pub fn batch<T, E>(&self) -> Batch<T, E>
    where
        T: Send + 'static,
        E: Send + 'static,
    {
        Batch::new(self.clone())
    }

    fn next_task_id(&self) -> TaskId {
        TaskId(self.shared.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn launch<F>(
        &self,
        kind: TaskKind,
        gate: Option<CancellationToken>,
        group: Option<WaitGuard>,
        fut: F,
    ) -> TaskHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.launch_as(self.next_task_id(), kind, gate, group, fut)
    }

    fn launch_as<F>(
        &self,
        id: TaskId,
        kind: TaskKind,
        gate: Option<CancellationToken>,
        group: Option<WaitGuard>,
        fut: F,
    ) -> TaskHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        panic::install_capture_hook();

        let started_at = Instant::now();
        self.shared.stats.lock().record_spawn();
        self.shared.active.lock().insert(
            id,
            ActiveTask {
                id,
                kind,
                started_at,
            },
        );
        self.shared.emit(ExecutorEvent::TaskSpawned {
            executor: self.shared.name.clone(),
            timestamp: started_at,
            task: id,
        });

        #[cfg(feature = "metrics")]
        {
            counter!("executor_tasks_spawned_total", "executor" => self.shared.name.clone())
                .increment(1);
            gauge!("executor_tasks_active", "executor" => self.shared.name.clone()).increment(1.0);
        }

        let settle = Settle {
            shared: Arc::clone(&self.shared),
            id,
            started_at,
            done: false,
            _group: group,
        };

        let inner = self.shared.handle.spawn(async move {
            if let Some(token) = gate {
                if token.is_cancelled() {
                    settle.skipped();
                    return Err(TaskError::Skipped(id));
                }
            }

            match Guarded::new(fut).await {
                Ok(output) => {
                    settle.completed();
                    Ok(output)
                }
                Err(caught) => {
                    let report = PanicReport::new(id, caught);
                    settle.panicked(&report);
                    Err(TaskError::Panicked(report))
                }
            }
        });

        TaskHandle { id, inner }
    }
}

impl fmt::Debug for SafeExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SafeExecutor")
            .field("name", &self.shared.name)
            .field("stats", &*self.shared.stats.lock())
            .finish()
    }
}

impl Shared {
    fn logger(&self) -> Arc<dyn TaskLogger> {
        Arc::clone(&self.logger.read())
    }

    fn emit(&self, event: ExecutorEvent) {
        if self.listeners.is_empty() {
            return;
        }
        let panicked = self.listeners.emit(&event);
        if panicked > 0 {
            self.logger().warn(&format!(
                "executor {}: {panicked} listener(s) panicked on {}",
                self.name,
                event.event_type()
            ));
        }
    }

    fn finish_completed(&self, id: TaskId, duration: Duration) {
        self.stats.lock().record_completion();
        self.active.lock().remove(&id);
        self.emit(ExecutorEvent::TaskCompleted {
            executor: self.name.clone(),
            timestamp: Instant::now(),
            task: id,
            duration,
        });
        self.record_finished("completed");
    }

    fn finish_skipped(&self, id: TaskId) {
        self.stats.lock().record_completion();
        self.active.lock().remove(&id);
        self.logger()
            .warn(&format!("{id} skipped: token cancelled before start"));
        self.emit(ExecutorEvent::TaskSkipped {
            executor: self.name.clone(),
            timestamp: Instant::now(),
            task: id,
        });
        self.record_finished("skipped");
    }

    fn finish_panicked(&self, report: &PanicReport) {
        self.stats
            .lock()
            .record_panic(report.task_id, report.timestamp);
        self.active.lock().remove(&report.task_id);

        let logger = self.logger();
        logger.error(&format!(
            "{} panicked: {}",
            report.task_id, report.message
        ));
        if let Some(location) = &report.location {
            logger.error(&format!("panic location: {location}"));
        }
        logger.error(&format!("stack trace:\n{}", report.backtrace));

        self.emit(ExecutorEvent::TaskPanicked {
            executor: self.name.clone(),
            timestamp: Instant::now(),
            task: report.task_id,
            message: report.message.clone(),
        });
        self.record_finished("panicked");

        let handler = self.recover_handler.read().clone();
        if let Some(handler) = handler {
            handler(report);
        }
    }

    fn tick_skipped(&self, supervisor: TaskId, in_flight: usize) {
        self.logger().warn(&format!(
            "interval {supervisor} skipped a tick: {in_flight} runs still in flight"
        ));
        self.emit(ExecutorEvent::IntervalTickSkipped {
            executor: self.name.clone(),
            timestamp: Instant::now(),
            supervisor,
            in_flight,
        });
    }

    #[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
    fn record_finished(&self, outcome: &'static str) {
        #[cfg(feature = "metrics")]
        {
            counter!(
                "executor_tasks_finished_total",
                "executor" => self.name.clone(),
                "outcome" => outcome
            )
            .increment(1);
            gauge!("executor_tasks_active", "executor" => self.name.clone()).decrement(1.0);
        }
    }
}

/// Settles a task's bookkeeping exactly once. If the task future is dropped
/// before it finishes (abort, runtime shutdown) the task counts as completed.
///
/// The wait group guard is a field so it drops after `Drop::drop` has
/// settled the stats.
struct Settle {
    shared: Arc<Shared>,
    id: TaskId,
    started_at: Instant,
    done: bool,
    _group: Option<WaitGuard>,
}

impl Settle {
    fn completed(mut self) {
        self.done = true;
        self.shared
            .finish_completed(self.id, self.started_at.elapsed());
    }

    fn skipped(mut self) {
        self.done = true;
        self.shared.finish_skipped(self.id);
    }

    fn panicked(mut self, report: &PanicReport) {
        self.done = true;
        self.shared.finish_panicked(report);
    }
}

impl Drop for Settle {
    fn drop(&mut self) {
        if !self.done {
            self.shared
                .logger()
                .debug(&format!("{} dropped before finishing", self.id));
            self.shared
                .finish_completed(self.id, self.started_at.elapsed());
        }
    }
}

/// Counts one in-flight interval run until dropped.
struct InFlightSlot(Arc<AtomicUsize>);

impl InFlightSlot {
    fn take(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}
