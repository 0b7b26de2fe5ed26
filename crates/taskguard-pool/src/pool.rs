use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::events::PoolEvent;
use crate::job::{Job, SimpleJob};
use crate::stats::PoolStats;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use taskguard_core::{BoxError, EventListeners, TaskEvent};
use taskguard_executor::{
    run_with_deadline, DeadlineOutcome, ExecutionStats, PanicReport, SafeExecutor, TaskHandle,
    TaskLogger,
};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

#[cfg(feature = "metrics")]
use metrics::{counter, gauge, histogram};

type JobBox = Box<dyn Job>;
type Intake = mpsc::Sender<JobBox>;

const DRAIN_POLL: Duration = Duration::from_millis(10);

/// A fixed set of workers fed from a bounded FIFO queue.
///
/// A dispatcher takes each queued job and hands it to the next idle worker
/// through that worker's one-slot intake. Jobs run inside the pool's
/// [`SafeExecutor`], so a panicking job counts as failed and the worker
/// carries on.
///
/// Dropping the pool signals shutdown without waiting.
///
/// # Examples
///
/// ```rust
/// use taskguard_executor::SafeExecutor;
/// use taskguard_pool::{Pool, PoolConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let executor = SafeExecutor::new();
/// let pool = Pool::new(PoolConfig::builder().max_workers(2).build(), &executor);
///
/// pool.submit_fn("resize-42", |_token| async { Ok(()) }).unwrap();
/// pool.stop_gracefully(std::time::Duration::from_secs(1)).await;
///
/// assert_eq!(pool.stats().completed_jobs, 1);
/// # }
/// ```
pub struct Pool {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    queue_size: usize,
    worker_timeout: Duration,
    job_timeout: Duration,
    shutdown_grace: Duration,
    listeners: EventListeners<PoolEvent>,
    executor: SafeExecutor,
    jobs: mpsc::Sender<JobBox>,
    shutdown: CancellationToken,
    accepting: AtomicBool,
    stopped: AtomicBool,
    stats: Mutex<PoolStats>,
    busy: AtomicUsize,
    live: AtomicUsize,
    tasks: Mutex<Vec<TaskHandle<()>>>,
}

impl Pool {
    /// Starts the workers and the dispatcher on `executor`.
    pub fn new(config: PoolConfig, executor: &SafeExecutor) -> Self {
        let (jobs_tx, jobs_rx) = mpsc::channel(config.queue_size);
        let (idle_tx, idle_rx) = mpsc::channel(config.max_workers);

        let inner = Arc::new(Inner {
            name: config.name,
            queue_size: config.queue_size,
            worker_timeout: config.worker_timeout,
            job_timeout: config.job_timeout,
            shutdown_grace: config.shutdown_grace,
            listeners: config.event_listeners,
            executor: executor.clone(),
            jobs: jobs_tx,
            shutdown: CancellationToken::new(),
            accepting: AtomicBool::new(true),
            stopped: AtomicBool::new(false),
            stats: Mutex::new(PoolStats::default()),
            busy: AtomicUsize::new(0),
            live: AtomicUsize::new(0),
            tasks: Mutex::new(Vec::new()),
        });

        let mut tasks = Vec::with_capacity(config.max_workers + 1);
        for worker in 0..config.max_workers {
            inner.live.fetch_add(1, Ordering::AcqRel);
            tasks.push(executor.spawn(worker_loop(
                Arc::clone(&inner),
                worker,
                idle_tx.clone(),
            )));
        }
        drop(idle_tx);
        tasks.push(executor.spawn(dispatch(Arc::clone(&inner), jobs_rx, idle_rx)));
        *inner.tasks.lock() = tasks;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            pool = %inner.name,
            workers = config.max_workers,
            queue_size = config.queue_size,
            "worker pool started"
        );

        Self { inner }
    }

    /// Queues `job` without waiting.
    ///
    /// Returns [`PoolError::PoolFull`] when the queue is at capacity and
    /// [`PoolError::Stopped`] once the pool no longer accepts work.
    pub fn submit<J: Job>(&self, job: J) -> Result<(), PoolError> {
        self.submit_boxed(Box::new(job))
    }

    /// Queues an already boxed job. See [`submit`](Self::submit).
    pub fn submit_boxed(&self, job: Box<dyn Job>) -> Result<(), PoolError> {
        let inner = &self.inner;
        if !inner.accepting.load(Ordering::Acquire) {
            inner.rejected(job.id(), "stopped");
            return Err(PoolError::Stopped);
        }

        // Counted before the send so a fast job never finishes uncounted.
        inner.stats.lock().total_jobs += 1;
        let job_id = job.id().to_string();

        match inner.jobs.try_send(job) {
            Ok(()) => {
                inner.emit(PoolEvent::JobSubmitted {
                    pool_name: inner.name.clone(),
                    timestamp: Instant::now(),
                    job_id,
                });
                #[cfg(feature = "metrics")]
                {
                    counter!("pool_jobs_submitted_total", "pool" => inner.name.clone())
                        .increment(1);
                    gauge!("pool_queue_depth", "pool" => inner.name.clone())
                        .set(inner.queued() as f64);
                }
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                inner.stats.lock().total_jobs -= 1;
                inner.rejected(&job_id, "full");
                Err(PoolError::PoolFull {
                    capacity: inner.queue_size,
                })
            }
            Err(TrySendError::Closed(_)) => {
                inner.stats.lock().total_jobs -= 1;
                inner.rejected(&job_id, "stopped");
                Err(PoolError::Stopped)
            }
        }
    }

    /// Queues a closure as a [`SimpleJob`].
    pub fn submit_fn<F, Fut>(&self, id: impl Into<String>, f: F) -> Result<(), PoolError>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.submit(SimpleJob::new(id, f))
    }

    /// Queues a closure as a [`SimpleJob`] with its own deadline.
    pub fn submit_with_timeout<F, Fut>(
        &self,
        id: impl Into<String>,
        f: F,
        timeout: Duration,
    ) -> Result<(), PoolError>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.submit(SimpleJob::new(id, f).with_timeout(timeout))
    }

    /// Returns a snapshot of the pool counters.
    pub fn stats(&self) -> PoolStats {
        let mut stats = self.inner.stats.lock().clone();
        stats.active_workers = self.inner.busy.load(Ordering::Acquire);
        stats.live_workers = self.inner.live.load(Ordering::Acquire);
        stats.queued_jobs = self.inner.queued();
        stats
    }

    /// Stats of the executor the pool runs on.
    pub fn executor_stats(&self) -> ExecutionStats {
        self.inner.executor.stats()
    }

    /// Installs the executor's recovery handler.
    pub fn set_recover_handler<H>(&self, handler: H)
    where
        H: Fn(&PanicReport) + Send + Sync + 'static,
    {
        self.inner.executor.set_recover_handler(handler);
    }

    /// Replaces the executor's logger, which the pool also logs through.
    pub fn set_logger(&self, logger: Arc<dyn TaskLogger>) {
        self.inner.executor.set_logger(logger);
    }

    /// The executor jobs run on.
    pub fn executor(&self) -> &SafeExecutor {
        &self.inner.executor
    }

    /// Pool name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns `true` while submissions are accepted.
    pub fn is_accepting(&self) -> bool {
        self.inner.accepting.load(Ordering::Acquire)
    }

    /// Returns `true` once [`stop`](Self::stop) has run.
    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::Acquire)
    }

    /// Stops the pool: rejects new work, signals the dispatcher, the workers
    /// and every running job's token, then waits up to the shutdown grace
    /// period for the workers to exit. Queued jobs are dropped.
    ///
    /// Only the first call to `stop` or
    /// [`stop_gracefully`](Self::stop_gracefully) has any effect.
    pub async fn stop(&self) {
        if self
            .inner
            .stopped
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        self.inner.accepting.store(false, Ordering::Release);
        self.inner.shutdown.cancel();

        let tasks = std::mem::take(&mut *self.inner.tasks.lock());
        let exited = futures::future::join_all(tasks.into_iter().map(TaskHandle::join));
        if tokio::time::timeout(self.inner.shutdown_grace, exited)
            .await
            .is_err()
        {
            self.inner.logger().warn(&format!(
                "pool {}: workers still busy after {:?} shutdown grace",
                self.inner.name, self.inner.shutdown_grace
            ));
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(pool = %self.inner.name, "worker pool stopped");
    }

    /// Stops accepting work, waits up to `timeout` for the queue to drain
    /// and every accepted job to finish, then calls [`stop`](Self::stop).
    pub async fn stop_gracefully(&self, timeout: Duration) {
        if self.is_stopped() {
            return;
        }
        self.inner.accepting.store(false, Ordering::Release);

        let deadline = tokio::time::Instant::now() + timeout;
        while !self.inner.is_drained() {
            if tokio::time::Instant::now() >= deadline {
                self.inner.logger().warn(&format!(
                    "pool {}: {} jobs still pending after {:?}",
                    self.inner.name,
                    self.inner.pending(),
                    timeout
                ));
                break;
            }
            tokio::time::sleep(DRAIN_POLL).await;
        }

        self.stop().await;
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        self.inner.accepting.store(false, Ordering::Release);
        self.inner.shutdown.cancel();
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("name", &self.inner.name)
            .field("stats", &self.stats())
            .finish()
    }
}

impl Inner {
    fn logger(&self) -> Arc<dyn TaskLogger> {
        self.executor.logger()
    }

    fn emit(&self, event: PoolEvent) {
        if self.listeners.is_empty() {
            return;
        }
        let panicked = self.listeners.emit(&event);
        if panicked > 0 {
            self.logger().warn(&format!(
                "pool {}: {panicked} listener(s) panicked on {}",
                self.name,
                event.event_type()
            ));
        }
    }

    fn queued(&self) -> usize {
        self.jobs.max_capacity() - self.jobs.capacity()
    }

    fn pending(&self) -> u64 {
        let stats = self.stats.lock();
        stats.total_jobs - stats.finished_jobs()
    }

    fn is_drained(&self) -> bool {
        self.pending() == 0
    }

    fn rejected(&self, job_id: &str, reason: &'static str) {
        self.emit(PoolEvent::JobRejected {
            pool_name: self.name.clone(),
            timestamp: Instant::now(),
            job_id: job_id.to_string(),
            reason,
        });
        #[cfg(feature = "metrics")]
        counter!("pool_jobs_rejected_total", "pool" => self.name.clone(), "reason" => reason)
            .increment(1);
    }

    async fn run(&self, worker: usize, job: JobBox) {
        self.busy.fetch_add(1, Ordering::AcqRel);
        #[cfg(feature = "metrics")]
        gauge!("pool_active_workers", "pool" => self.name.clone())
            .set(self.busy.load(Ordering::Acquire) as f64);

        let job_id = job.id().to_string();
        let deadline = job.timeout().unwrap_or(self.job_timeout);
        let started = Instant::now();

        let task = self
            .executor
            .spawn_with_token(self.shutdown.child_token(), move |token| async move {
                run_with_deadline(job.execute(token.clone()), token, deadline).await
            });

        let joined = task.join();
        tokio::pin!(joined);
        let stall = tokio::time::sleep(self.worker_timeout);
        tokio::pin!(stall);
        let mut stalled = false;

        let result = loop {
            tokio::select! {
                result = &mut joined => break result,
                _ = &mut stall, if !stalled => {
                    stalled = true;
                    self.stalled(worker, &job_id);
                }
            }
        };

        let duration = started.elapsed();
        let (succeeded, timed_out, error) = match result {
            Ok(DeadlineOutcome {
                output: Ok(()),
                exceeded,
            }) => (true, exceeded, None),
            Ok(DeadlineOutcome {
                output: Err(err),
                exceeded,
            }) => (false, exceeded, Some(err.to_string())),
            Err(err) => (false, false, Some(err.to_string())),
        };

        self.stats.lock().record(duration, succeeded, timed_out);
        self.busy.fetch_sub(1, Ordering::AcqRel);

        if timed_out {
            self.logger().warn(&format!(
                "pool {}: job {job_id} exceeded its {deadline:?} deadline",
                self.name
            ));
        }

        let timestamp = Instant::now();
        match error {
            None => self.emit(PoolEvent::JobCompleted {
                pool_name: self.name.clone(),
                timestamp,
                job_id,
                duration,
                timed_out,
            }),
            Some(error) => {
                self.logger()
                    .error(&format!("pool {}: job {job_id} failed: {error}", self.name));
                self.emit(PoolEvent::JobFailed {
                    pool_name: self.name.clone(),
                    timestamp,
                    job_id,
                    duration,
                    timed_out,
                    error,
                });
            }
        }

        #[cfg(feature = "metrics")]
        {
            let outcome = if succeeded { "completed" } else { "failed" };
            counter!("pool_jobs_total", "pool" => self.name.clone(), "outcome" => outcome)
                .increment(1);
            if timed_out {
                counter!("pool_jobs_timed_out_total", "pool" => self.name.clone()).increment(1);
            }
            histogram!("pool_job_duration_seconds", "pool" => self.name.clone())
                .record(duration.as_secs_f64());
            gauge!("pool_active_workers", "pool" => self.name.clone())
                .set(self.busy.load(Ordering::Acquire) as f64);
        }
    }

    fn stalled(&self, worker: usize, job_id: &str) {
        self.logger().warn(&format!(
            "pool {}: worker {worker} has been running job {job_id} for more than {:?}",
            self.name, self.worker_timeout
        ));
        self.emit(PoolEvent::WorkerStalled {
            pool_name: self.name.clone(),
            timestamp: Instant::now(),
            job_id: job_id.to_string(),
            worker_timeout: self.worker_timeout,
        });
    }

    fn lost(&self, job: JobBox) {
        self.stats.lock().record(Duration::ZERO, false, false);
        self.logger().error(&format!(
            "pool {}: job {} dropped, no worker left to run it",
            self.name,
            job.id()
        ));
    }
}

/// Keeps the live worker count honest however the worker exits.
struct LiveWorker(Arc<Inner>);

impl Drop for LiveWorker {
    fn drop(&mut self) {
        self.0.live.fetch_sub(1, Ordering::AcqRel);
    }
}

async fn worker_loop(inner: Arc<Inner>, worker: usize, idle: mpsc::Sender<Intake>) {
    let _live = LiveWorker(Arc::clone(&inner));
    let (intake_tx, mut intake_rx) = mpsc::channel::<JobBox>(1);

    loop {
        tokio::select! {
            biased;
            _ = inner.shutdown.cancelled() => break,
            registered = idle.send(intake_tx.clone()) => {
                if registered.is_err() {
                    break;
                }
            }
        }

        let job = tokio::select! {
            biased;
            _ = inner.shutdown.cancelled() => break,
            job = intake_rx.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };

        inner.run(worker, job).await;
    }
}

async fn dispatch(
    inner: Arc<Inner>,
    mut jobs: mpsc::Receiver<JobBox>,
    mut idle: mpsc::Receiver<Intake>,
) {
    'jobs: loop {
        let mut job = tokio::select! {
            biased;
            _ = inner.shutdown.cancelled() => break,
            job = jobs.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };

        // A worker that died after registering leaves a closed intake behind;
        // move on to the next idle worker.
        loop {
            let intake = tokio::select! {
                biased;
                _ = inner.shutdown.cancelled() => break 'jobs,
                intake = idle.recv() => intake,
            };
            let Some(intake) = intake else {
                inner.lost(job);
                break 'jobs;
            };
            match intake.send(job).await {
                Ok(()) => break,
                Err(mpsc::error::SendError(returned)) => job = returned,
            }
        }
    }
}
