//! Runtime monitoring for taskguard executors.
//!
//! A [`Monitor`] takes a [`MonitorStats`] snapshot every interval:
//!
//! - task counts from its [`SafeExecutor`](taskguard_executor::SafeExecutor)
//!   and from the tokio runtime (workers, alive tasks, global queue depth)
//! - process resident and virtual memory, read with `sysinfo`
//! - heap usage and allocator counters, when [`TrackingAllocator`] is the
//!   global allocator
//! - user-defined custom statistics
//!
//! After each snapshot, thresholds from the [`AlertConfig`] are checked (at
//! most once per check interval) and every registered handler receives the
//! snapshot. Handler panics are caught and logged.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use taskguard_executor::SafeExecutor;
//! use taskguard_monitor::{AlertConfig, Monitor};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let executor = SafeExecutor::new();
//! let monitor = Monitor::builder()
//!     .name("ingest")
//!     .interval(Duration::from_secs(5))
//!     .alert_config(
//!         AlertConfig::builder()
//!             .max_tasks(10_000)
//!             .alert_handler(|alert| eprintln!("[{:?}] {}", alert.severity, alert.message))
//!             .build(),
//!     )
//!     .on_snapshot(|stats| println!("{} tasks alive", stats.tasks.runtime_alive_tasks))
//!     .build(&executor);
//!
//! monitor.set_custom_stat("shard", 3u32);
//! let snapshot = monitor.force_collect();
//! assert!(snapshot.custom.contains_key("shard"));
//!
//! monitor.start();
//! monitor.stop();
//! # }
//! ```
//!
//! # Feature Flags
//! - `metrics`: runtime and memory gauges, alert counter.
//! - `tracing`: snapshot and alert logging.
//! - `serde`: `Serialize` for snapshots and alerts.

mod alert;
mod alloc;
mod config;
mod monitor;
mod stats;

pub use alert::{Alert, AlertConfig, AlertConfigBuilder, AlertHandler, AlertKind, Severity};
pub use alloc::{allocation_stats, AllocationStats, TrackingAllocator};
pub use config::MonitorBuilder;
pub use monitor::{Monitor, SnapshotHandler};
pub use stats::{CustomValue, MemoryMetrics, MonitorStats, TaskMetrics};
