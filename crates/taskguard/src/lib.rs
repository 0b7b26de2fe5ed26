//! Panic-isolating task execution and resilience primitives for tokio.
//!
//! `taskguard` bundles a [`SafeExecutor`](executor::SafeExecutor) that
//! contains panics in spawned tasks with optional patterns built on it:
//!
//! | Feature          | Crate                        | What it provides                                 |
//! |------------------|------------------------------|--------------------------------------------------|
//! | (always)         | `taskguard-executor`         | `SafeExecutor`, `WaitGroup`, `Batch`, stats      |
//! | `pool`           | `taskguard-pool`             | Bounded worker pool with a dispatcher            |
//! | `circuitbreaker` | `taskguard-circuitbreaker`   | Consecutive-failure circuit breaker, Tower layer |
//! | `ratelimiter`    | `taskguard-ratelimiter`      | Token bucket with executor-driven refill         |
//! | `retry`          | `taskguard-retry`            | Retry with pluggable backoff                     |
//! | `monitor`        | `taskguard-monitor`          | Snapshots, threshold alerts, tracking allocator  |
//!
//! `full` enables every pattern. `metrics`, `tracing` and `serde` switch the
//! matching feature on in every enabled crate.
//!
//! Every component takes its executor explicitly; there is no process-wide
//! default.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use taskguard::executor::SafeExecutor;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let executor = SafeExecutor::builder().name("api").build();
//! executor.set_recover_handler(|report| {
//!     eprintln!("{} panicked: {}", report.task_id, report.message);
//! });
//!
//! let handle = executor.spawn(async { panic!("bad input") });
//! assert!(handle.join().await.unwrap_err().is_panic());
//! assert_eq!(executor.stats().panic_count, 1);
//! # }
//! ```
//!
//! # Errors
//!
//! Each crate has its own error enum. All of them convert into
//! [`GuardError`], so a call path through several components can use `?`
//! with a single error type.

// Re-export core (always available)
pub use taskguard_core as core;
pub use taskguard_core::{BoxError, GuardError};

pub use taskguard_executor as executor;

#[cfg(feature = "circuitbreaker")]
pub use taskguard_circuitbreaker as circuitbreaker;

#[cfg(feature = "monitor")]
pub use taskguard_monitor as monitor;

#[cfg(feature = "pool")]
pub use taskguard_pool as pool;

#[cfg(feature = "ratelimiter")]
pub use taskguard_ratelimiter as ratelimiter;

#[cfg(feature = "retry")]
pub use taskguard_retry as retry;
