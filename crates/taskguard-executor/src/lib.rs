//! Panic-isolating task execution for tokio.
//!
//! [`SafeExecutor`] spawns futures so that a panic inside one of them is
//! caught, logged with its backtrace through a [`TaskLogger`], counted in
//! [`ExecutionStats`] and handed to a recovery handler. The process, the
//! runtime thread and every other task keep running.
//!
//! On top of the executor:
//! - [`WaitGroup`]: wait for a set of protected tasks
//! - [`Batch`]: collect the results of a set of fallible tasks
//! - [`IntervalHandle`]: periodic protected work
//! - [`run_with_deadline`]: cancel a token when a deadline passes
//!
//! # Cancellation
//!
//! Cancellation is cooperative. Task bodies that accept a
//! [`CancellationToken`](tokio_util::sync::CancellationToken) are expected to
//! watch it; the executor only checks the token before a task starts.
//!
//! # Panics in the recovery handler
//!
//! The recovery handler runs on the task that panicked and is not itself
//! protected. If it panics, tokio contains that panic and the task's
//! [`TaskHandle::join`] reports [`TaskError::Aborted`].
//!
//! # Example
//!
//! ```rust
//! use taskguard_executor::SafeExecutor;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let executor = SafeExecutor::new();
//! let recovered = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&recovered);
//! executor.set_recover_handler(move |report| {
//!     assert_eq!(report.message, "unexpected state");
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! let result = executor.spawn(async { panic!("unexpected state") }).join().await;
//! assert!(result.is_err());
//! assert_eq!(recovered.load(Ordering::SeqCst), 1);
//! # }
//! ```

mod batch;
mod config;
mod deadline;
mod events;
mod executor;
mod handle;
mod interval;
mod logger;
mod panic;
mod stats;
mod wait_group;

pub use batch::{Batch, BatchResult};
pub use config::{ExecutorConfig, ExecutorConfigBuilder};
pub use deadline::{run_with_deadline, DeadlineOutcome};
pub use events::ExecutorEvent;
pub use executor::{RecoverHandler, SafeExecutor};
pub use handle::{ActiveTask, TaskError, TaskHandle, TaskId, TaskKind};
pub use interval::IntervalHandle;
pub use logger::{NoopLogger, TaskLogger, TracingLogger};
pub use panic::PanicReport;
pub use stats::ExecutionStats;
pub use wait_group::{WaitGroup, WaitGuard};

pub use tokio_util::sync::CancellationToken;
