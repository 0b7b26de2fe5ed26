//! Bounded worker pool running jobs inside a panic-isolating executor.
//!
//! A [`Pool`] owns a bounded FIFO job queue, a fixed number of long-lived
//! workers and a dispatcher that hands each queued job to the next idle
//! worker. Every job runs through a
//! [`SafeExecutor`](taskguard_executor::SafeExecutor): a panicking job is
//! recorded as a failure and its worker keeps serving the queue.
//!
//! # Admission
//!
//! [`Pool::submit`] never waits. It fails with [`PoolError::PoolFull`] when
//! the queue is at capacity and [`PoolError::Stopped`] after shutdown began.
//!
//! # Deadlines
//!
//! Each job gets a [`CancellationToken`](tokio_util::sync::CancellationToken)
//! that is cancelled when the job's timeout (or the pool's default job
//! timeout) passes, or when the pool is force-stopped. Jobs must watch the
//! token to stop early; jobs that finish after their deadline are counted in
//! [`PoolStats::timed_out_jobs`]. A job that holds its worker for longer than
//! the worker timeout produces one warning.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use taskguard_executor::SafeExecutor;
//! use taskguard_pool::{Pool, PoolConfig, PoolError};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let executor = SafeExecutor::new();
//! let config = PoolConfig::builder()
//!     .name("thumbnails")
//!     .max_workers(4)
//!     .queue_size(100)
//!     .job_timeout(Duration::from_secs(30))
//!     .build();
//! let pool = Pool::new(config, &executor);
//!
//! pool.submit_fn("thumb-1", |token| async move {
//!     tokio::select! {
//!         _ = token.cancelled() => Err("deadline passed".into()),
//!         _ = tokio::time::sleep(Duration::from_millis(5)) => Ok(()),
//!     }
//! })
//! .unwrap();
//!
//! pool.stop_gracefully(Duration::from_secs(1)).await;
//! assert_eq!(pool.stats().completed_jobs, 1);
//! assert_eq!(
//!     pool.submit_fn("late", |_| async { Ok(()) }),
//!     Err(PoolError::Stopped)
//! );
//! # }
//! ```

mod config;
mod error;
mod events;
mod job;
mod pool;
mod stats;

pub use config::{PoolConfig, PoolConfigBuilder};
pub use error::PoolError;
pub use events::PoolEvent;
pub use job::{Job, SimpleJob};
pub use pool::Pool;
pub use stats::PoolStats;
