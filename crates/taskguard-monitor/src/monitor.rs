use crate::alert::{Alert, AlertConfig, AlertHandler};
use crate::alloc::{allocation_stats, AllocationStats};
use crate::config::MonitorBuilder;
use crate::stats::{CustomValue, MemoryMetrics, MonitorStats, TaskMetrics};
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant, SystemTime};
use sysinfo::{Pid, System};
use taskguard_executor::{ActiveTask, SafeExecutor};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_gauge, gauge};
#[cfg(feature = "metrics")]
use std::sync::Once;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Callback receiving every snapshot.
pub type SnapshotHandler = Arc<dyn Fn(&MonitorStats) + Send + Sync>;

/// Periodically samples an executor, the tokio runtime and process memory.
///
/// Cheap to clone; clones share one monitor. Dropping the last clone stops
/// the collection loop.
#[derive(Clone)]
pub struct Monitor {
    shared: Arc<Shared>,
}

struct Shared {
    name: String,
    interval: Duration,
    executor: SafeExecutor,
    sampler: Mutex<ProcessSampler>,
    state: RwLock<State>,
}

struct State {
    latest: MonitorStats,
    custom: HashMap<String, CustomValue>,
    handlers: Vec<SnapshotHandler>,
    alert_config: AlertConfig,
    last_alert_check: Option<Instant>,
    running: Option<CancellationToken>,
}

/// Reads process memory from the OS. Refreshing blocks on procfs reads.
struct ProcessSampler {
    system: System,
    pid: Pid,
}

impl ProcessSampler {
    fn new() -> Self {
        Self {
            system: System::new(),
            pid: Pid::from_u32(std::process::id()),
        }
    }

    /// Returns `(resident, virtual)` bytes, zero when the process cannot be
    /// read.
    fn sample(&mut self) -> (u64, u64) {
        if !self.system.refresh_process(self.pid) {
            return (0, 0);
        }
        self.system
            .process(self.pid)
            .map_or((0, 0), |process| (process.memory(), process.virtual_memory()))
    }
}

impl Monitor {
    /// Creates a stopped monitor taking a snapshot of `executor` every
    /// `interval` once started.
    pub fn new(executor: &SafeExecutor, interval: Duration) -> Self {
        Self::builder().interval(interval).build(executor)
    }

    /// Returns a builder for a configured monitor.
    pub fn builder() -> MonitorBuilder {
        MonitorBuilder::new()
    }

    pub(crate) fn from_builder(builder: MonitorBuilder, executor: &SafeExecutor) -> Self {
        #[cfg(feature = "metrics")]
        {
            METRICS_INIT.call_once(|| {
                describe_gauge!(
                    "monitor_runtime_alive_tasks",
                    "Tasks alive on the tokio runtime at the last snapshot"
                );
                describe_gauge!(
                    "monitor_executor_active_tasks",
                    "Executor tasks running at the last snapshot"
                );
                describe_gauge!(
                    "monitor_resident_memory_bytes",
                    "Process resident memory at the last snapshot"
                );
                describe_gauge!(
                    "monitor_heap_bytes",
                    "Live heap bytes counted by the tracking allocator"
                );
                describe_counter!(
                    "monitor_alerts_total",
                    "Total number of alerts raised (label: kind)"
                );
            });
        }

        Self {
            shared: Arc::new(Shared {
                name: builder.name,
                interval: builder.interval.max(MIN_INTERVAL),
                executor: executor.clone(),
                sampler: Mutex::new(ProcessSampler::new()),
                state: RwLock::new(State {
                    latest: MonitorStats::default(),
                    custom: HashMap::new(),
                    handlers: builder.handlers,
                    alert_config: builder.alert_config,
                    last_alert_check: None,
                    running: None,
                }),
            }),
        }
    }

    /// Starts the collection loop on the executor. Calling it while running
    /// does nothing.
    ///
    /// The first snapshot is taken one interval after the call.
    pub fn start(&self) {
        let token = {
            let mut state = self.shared.state.write();
            if state.running.is_some() {
                return;
            }
            let token = CancellationToken::new();
            state.running = Some(token.clone());
            token
        };

        #[cfg(feature = "tracing")]
        tracing::info!(monitor = %self.shared.name, interval = ?self.shared.interval, "monitor started");

        let weak = Arc::downgrade(&self.shared);
        let period = self.shared.interval;
        let _ = self.shared.executor.spawn(collect_loop(weak, period, token));
    }

    /// Stops the collection loop. Idempotent; the monitor can be started again.
    pub fn stop(&self) {
        let token = self.shared.state.write().running.take();
        if let Some(token) = token {
            token.cancel();

            #[cfg(feature = "tracing")]
            tracing::info!(monitor = %self.shared.name, "monitor stopped");
        }
    }

    /// Returns `true` while the collection loop is running.
    pub fn is_running(&self) -> bool {
        self.shared.state.read().running.is_some()
    }

    /// The most recent snapshot. Before the first collection every figure is
    /// zero and the timestamp is `UNIX_EPOCH`.
    pub fn stats(&self) -> MonitorStats {
        self.shared.state.read().latest.clone()
    }

    /// Tasks currently running on the executor, oldest first.
    pub fn task_profile(&self) -> Vec<ActiveTask> {
        self.shared.executor.active_tasks()
    }

    /// Allocator counters, or `None` without a
    /// [`TrackingAllocator`](crate::TrackingAllocator).
    pub fn memory_profile(&self) -> Option<AllocationStats> {
        allocation_stats()
    }

    /// Refreshes process memory and takes a snapshot now.
    ///
    /// Alerts are evaluated regardless of the check interval, and every
    /// handler receives the snapshot. The process is sampled on the calling
    /// thread, which blocks briefly on OS reads; periodic collection runs on
    /// tokio's blocking pool instead.
    pub fn force_collect(&self) -> MonitorStats {
        self.shared.collect(true)
    }

    /// Sets a custom statistic, visible at once in [`stats`](Self::stats)
    /// and carried into every later snapshot.
    pub fn set_custom_stat<K, V>(&self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<CustomValue>,
    {
        let key = key.into();
        let value = value.into();
        let mut state = self.shared.state.write();
        state.latest.custom.insert(key.clone(), value.clone());
        state.custom.insert(key, value);
    }

    /// Reads a custom statistic.
    pub fn custom_stat(&self, key: &str) -> Option<CustomValue> {
        self.shared.state.read().custom.get(key).cloned()
    }

    /// Replaces the alert thresholds.
    pub fn set_alert_config(&self, config: AlertConfig) {
        let mut state = self.shared.state.write();
        state.alert_config = config;
        state.last_alert_check = None;
    }

    /// The current alert thresholds.
    pub fn alert_config(&self) -> AlertConfig {
        self.shared.state.read().alert_config.clone()
    }

    /// Registers a handler receiving every snapshot.
    ///
    /// Periodic snapshots reach handlers on tokio's blocking pool, forced
    /// ones on the caller's thread. A panicking handler is logged
    /// through the executor's logger and does not affect other handlers.
    pub fn add_handler<F>(&self, handler: F)
    where
        F: Fn(&MonitorStats) + Send + Sync + 'static,
    {
        self.shared.state.write().handlers.push(Arc::new(handler));
    }

    /// Monitor name.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Time between snapshots.
    pub fn interval(&self) -> Duration {
        self.shared.interval
    }
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("name", &self.shared.name)
            .field("interval", &self.shared.interval)
            .field("running", &self.is_running())
            .finish()
    }
}

async fn collect_loop(shared: Weak<Shared>, period: Duration, stop: CancellationToken) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let Some(shared) = shared.upgrade() else {
            break;
        };
        let logger = shared.executor.logger();
        let name = shared.name.clone();

        // Sampling reads procfs, so it stays off the runtime's workers.
        match tokio::task::spawn_blocking(move || shared.collect(false)).await {
            Ok(_) => {}
            Err(err) if err.is_cancelled() => break,
            Err(err) => logger.error(&format!("monitor {name}: collection failed: {err}")),
        }
    }
}

impl Shared {
    fn collect(&self, forced: bool) -> MonitorStats {
        let (resident_bytes, virtual_bytes) = self.sampler.lock().sample();
        let executor = self.executor.stats();
        let runtime = self.executor.runtime_handle().metrics();
        let allocations = allocation_stats();

        let tasks = TaskMetrics {
            executor_active: executor.active_count,
            executor_total: executor.total_spawned,
            executor_completed: executor.completed_count,
            executor_panics: executor.panic_count,
            runtime_workers: runtime.num_workers(),
            runtime_alive_tasks: runtime.num_alive_tasks(),
            runtime_global_queue_depth: runtime.global_queue_depth(),
        };
        let memory = MemoryMetrics {
            resident_bytes,
            virtual_bytes,
            heap_bytes: allocations.map(|a| a.heap_bytes()),
            live_allocations: allocations.map(|a| a.live_allocations()),
        };

        let (snapshot, handlers, alerts) = {
            let mut state = self.state.write();
            let snapshot = MonitorStats {
                timestamp: SystemTime::now(),
                tasks,
                memory,
                allocations,
                executor,
                custom: state.custom.clone(),
            };
            state.latest = snapshot.clone();

            let due = forced
                || state
                    .last_alert_check
                    .map_or(true, |at| at.elapsed() >= state.alert_config.check_interval);
            let alerts = match (&state.alert_config.alert_handler, due) {
                (Some(handler), true) => {
                    let raised = state.alert_config.evaluate(&snapshot);
                    Some((Arc::clone(handler), raised))
                }
                _ => None,
            };
            if alerts.is_some() {
                state.last_alert_check = Some(Instant::now());
            }

            (snapshot, state.handlers.clone(), alerts)
        };

        self.record(&snapshot);

        if let Some((handler, alerts)) = alerts {
            self.raise(&handler, &alerts);
        }
        for handler in &handlers {
            self.guarded("snapshot handler", || handler(&snapshot));
        }

        snapshot
    }

    fn raise(&self, handler: &AlertHandler, alerts: &[Alert]) {
        for alert in alerts {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                monitor = %self.name,
                kind = %alert.kind,
                value = alert.value,
                threshold = alert.threshold,
                "{}",
                alert.message
            );

            #[cfg(feature = "metrics")]
            counter!("monitor_alerts_total", "monitor" => self.name.clone(), "kind" => alert.kind.as_str())
                .increment(1);

            self.guarded("alert handler", || handler(alert));
        }
    }

    #[cfg_attr(not(any(feature = "metrics", feature = "tracing")), allow(unused_variables))]
    fn record(&self, snapshot: &MonitorStats) {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            monitor = %self.name,
            alive_tasks = snapshot.tasks.runtime_alive_tasks,
            executor_active = snapshot.tasks.executor_active,
            resident_bytes = snapshot.memory.resident_bytes,
            "snapshot collected"
        );

        #[cfg(feature = "metrics")]
        {
            gauge!("monitor_runtime_alive_tasks", "monitor" => self.name.clone())
                .set(snapshot.tasks.runtime_alive_tasks as f64);
            gauge!("monitor_executor_active_tasks", "monitor" => self.name.clone())
                .set(snapshot.tasks.executor_active as f64);
            gauge!("monitor_resident_memory_bytes", "monitor" => self.name.clone())
                .set(snapshot.memory.resident_bytes as f64);
            if let Some(heap) = snapshot.memory.heap_bytes {
                gauge!("monitor_heap_bytes", "monitor" => self.name.clone()).set(heap as f64);
            }
        }
    }

    fn guarded(&self, what: &str, f: impl FnOnce()) {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(f)) {
            self.executor.logger().error(&format!(
                "monitor {}: {what} panicked: {}",
                self.name,
                panic_message(payload.as_ref())
            ));
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Some(token) = self.state.get_mut().running.take() {
            token.cancel();
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
