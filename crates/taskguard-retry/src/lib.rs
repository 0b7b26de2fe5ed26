//! Retry with pluggable backoff.
//!
//! [`Retry::execute`] calls an operation until it succeeds, the attempt
//! budget runs out, or a `retry_on` predicate refuses the error. Between
//! attempts it sleeps for the delay given by a [`BackoffStrategy`]:
//!
//! - [`FixedBackoff`]: the same delay every time
//! - [`LinearBackoff`]: `base * (attempt + 1)`, capped
//! - [`ExponentialBackoff`]: `base * 2^attempt`, capped
//! - [`FnBackoff`]: any closure of the attempt index
//!
//! [`Retry::execute_async`] runs the same loop as one task on a
//! [`SafeExecutor`] and hands back a receiver for the result.
//!
//! # Examples
//!
//! ```
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::time::Duration;
//! use taskguard_executor::SafeExecutor;
//! use taskguard_retry::{Retry, RetryError};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let executor = SafeExecutor::new();
//! let retry = Retry::<&str>::builder()
//!     .name("fetch-profile")
//!     .max_attempts(3)
//!     .fixed_backoff(Duration::from_millis(1))
//!     .retry_on(|err| *err != "not found")
//!     .on_retry(|attempt, delay| println!("attempt {attempt} failed, waiting {delay:?}"))
//!     .build(&executor);
//!
//! let calls = AtomicUsize::new(0);
//! let profile = retry
//!     .execute(|| async {
//!         if calls.fetch_add(1, Ordering::SeqCst) < 2 {
//!             Err("timeout")
//!         } else {
//!             Ok("alice")
//!         }
//!     })
//!     .await;
//! assert_eq!(profile, Ok("alice"));
//!
//! let missing = retry.execute(|| async { Err::<(), _>("not found") }).await;
//! assert!(matches!(missing, Err(RetryError::NotRetryable { attempt: 1, .. })));
//! # }
//! ```
//!
//! # Feature Flags
//! - `metrics`: attempt and outcome counters.
//! - `tracing`: logs each retry and each exhausted budget.

mod backoff;
mod config;
mod error;
mod events;

pub use backoff::{BackoffStrategy, ExponentialBackoff, FixedBackoff, FnBackoff, LinearBackoff};
pub use config::{RetryConfig, RetryConfigBuilder};
pub use error::RetryError;
pub use events::RetryEvent;

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use taskguard_executor::SafeExecutor;
use tokio::sync::oneshot;

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter};
#[cfg(feature = "metrics")]
use std::sync::Once;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

/// Retries fallible operations with a backoff between attempts.
///
/// `E` is the operation's error type, needed by the `retry_on` predicate.
pub struct Retry<E> {
    executor: SafeExecutor,
    config: Arc<RetryConfig<E>>,
}

impl<E> Clone for Retry<E> {
    fn clone(&self) -> Self {
        Self {
            executor: self.executor.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<E> Retry<E> {
    /// Creates a retry making at most `max_attempts` attempts, waiting
    /// according to `backoff` in between.
    pub fn new<B>(max_attempts: usize, backoff: B, executor: &SafeExecutor) -> Self
    where
        B: BackoffStrategy + 'static,
    {
        Self::builder()
            .max_attempts(max_attempts)
            .backoff(backoff)
            .build(executor)
    }

    /// Returns a builder for a configured retry.
    pub fn builder() -> RetryConfigBuilder<E> {
        RetryConfigBuilder::new()
    }

    /// Creates a retry from a configuration.
    pub fn with_config(config: RetryConfig<E>, executor: &SafeExecutor) -> Self {
        #[cfg(feature = "metrics")]
        {
            METRICS_INIT.call_once(|| {
                describe_counter!(
                    "retry_calls_total",
                    "Total number of retried operations (label: outcome=success|exhausted|not_retryable)"
                );
                describe_counter!(
                    "retry_attempts_total",
                    "Total number of retry attempts after the first"
                );
            });
        }

        Self {
            executor: executor.clone(),
            config: Arc::new(config),
        }
    }

    /// Calls `f` until it succeeds or the retry gives up.
    ///
    /// After a failed attempt, if the error is retryable and attempts remain,
    /// sleeps for the backoff delay and calls `f` again. Otherwise returns the
    /// last error wrapped in [`RetryError`].
    pub async fn execute<F, Fut, T>(&self, mut f: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let config = &self.config;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let error = match f().await {
                Ok(value) => {
                    self.finished(RetryEvent::Success {
                        retry_name: config.name.clone(),
                        timestamp: Instant::now(),
                        attempts: attempt,
                    });
                    return Ok(value);
                }
                Err(error) => error,
            };

            if !config.should_retry(&error) {
                self.finished(RetryEvent::IgnoredError {
                    retry_name: config.name.clone(),
                    timestamp: Instant::now(),
                    attempt,
                });
                return Err(RetryError::NotRetryable {
                    attempt,
                    source: error,
                });
            }

            if attempt >= config.max_attempts {
                #[cfg(feature = "tracing")]
                tracing::warn!(retry = %config.name, attempts = attempt, "retry attempts exhausted");

                self.finished(RetryEvent::Error {
                    retry_name: config.name.clone(),
                    timestamp: Instant::now(),
                    attempts: attempt,
                });
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    source: error,
                });
            }

            let delay = config.backoff.delay(attempt - 1);

            #[cfg(feature = "tracing")]
            tracing::debug!(retry = %config.name, attempt, ?delay, "attempt failed, retrying");

            #[cfg(feature = "metrics")]
            counter!("retry_attempts_total", "retry" => config.name.clone()).increment(1);

            config.event_listeners.emit(&RetryEvent::Retry {
                retry_name: config.name.clone(),
                timestamp: Instant::now(),
                attempt,
                delay,
            });

            tokio::time::sleep(delay).await;
        }
    }

    /// Runs [`execute`](Self::execute) as one protected task on the executor.
    ///
    /// The receiver yields the single result. If the operation panics, the
    /// executor records the panic and the receiver reports that the sender
    /// was dropped.
    pub fn execute_async<F, Fut, T>(&self, f: F) -> oneshot::Receiver<Result<T, RetryError<E>>>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let retry = self.clone();
        let _ = self.executor.spawn(async move {
            let result = retry.execute(f).await;
            let _ = tx.send(result);
        });
        rx
    }

    /// Total number of attempts, including the first.
    pub fn max_attempts(&self) -> usize {
        self.config.max_attempts
    }

    /// Retry name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Executor running [`execute_async`](Self::execute_async) loops.
    pub fn executor(&self) -> &SafeExecutor {
        &self.executor
    }

    fn finished(&self, event: RetryEvent) {
        #[cfg(feature = "metrics")]
        {
            let outcome = match &event {
                RetryEvent::Success { .. } => "success",
                RetryEvent::Error { .. } => "exhausted",
                RetryEvent::IgnoredError { .. } => "not_retryable",
                RetryEvent::Retry { .. } => "retry",
            };
            counter!("retry_calls_total", "retry" => self.config.name.clone(), "outcome" => outcome)
                .increment(1);
        }

        self.config.event_listeners.emit(&event);
    }
}

impl<E> std::fmt::Debug for Retry<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retry")
            .field("name", &self.config.name)
            .field("max_attempts", &self.config.max_attempts)
            .finish_non_exhaustive()
    }
}
