//! Token-bucket rate limiting for in-process call sites and Tower services.
//!
//! A [`RateLimiter`] holds up to `limit` permits and starts full. A refill
//! task, spawned on a [`SafeExecutor`], adds one permit every
//! `interval / limit` and drops refills that would overflow the bucket.
//!
//! - [`RateLimiter::allow`] takes a permit if one is available and never waits.
//! - [`RateLimiter::wait`] waits for a permit; waiters are served in arrival
//!   order.
//! - [`RateLimiter::stop`] halts the refill. Remaining permits can still be
//!   taken, after which callers get [`RateLimiterError::Stopped`].
//!
//! Dropping the last clone of a limiter stops its refill task as well.
//!
//! # Examples
//!
//! ```
//! use taskguard_executor::SafeExecutor;
//! use taskguard_ratelimiter::RateLimiter;
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let executor = SafeExecutor::new();
//! let limiter = RateLimiter::builder()
//!     .name("outbound-mail")
//!     .limit(3)
//!     .interval(Duration::from_secs(1))
//!     .on_permit_rejected(|stopped| {
//!         println!("rate limited (stopped: {stopped})");
//!     })
//!     .build(&executor);
//!
//! let granted: Vec<bool> = (0..5).map(|_| limiter.allow()).collect();
//! assert_eq!(granted, [true, true, true, false, false]);
//! # }
//! ```
//!
//! # Tower
//!
//! [`RateLimiter::layer`] wraps services so each request takes a permit
//! without waiting; refused requests fail with
//! [`RateLimitedServiceError::Limited`].
//!
//! # Feature Flags
//! - `metrics`: permit counters, wait-time histogram and an available-permits gauge.
//! - `tracing`: refill lifecycle logging.

mod config;
mod error;
mod events;
mod layer;
mod limiter;

pub use config::{RateLimiterConfig, RateLimiterConfigBuilder};
pub use error::{RateLimitedServiceError, RateLimiterError};
pub use events::RateLimiterEvent;
pub use layer::{RateLimiterLayer, RateLimiterService};

use crate::limiter::{refill_loop, Bucket};
use std::sync::Arc;
use std::time::{Duration, Instant};
use taskguard_executor::SafeExecutor;
use tokio_util::sync::{CancellationToken, DropGuard};

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, histogram};
#[cfg(feature = "metrics")]
use std::sync::Once;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

/// A token-bucket rate limiter.
///
/// Cheap to clone; clones share one bucket.
#[derive(Clone)]
pub struct RateLimiter {
    shared: Arc<Shared>,
}

struct Shared {
    bucket: Arc<Bucket>,
    config: Arc<RateLimiterConfig>,
    stop: CancellationToken,
    // Cancels the refill task once the last handle is gone.
    _refill: DropGuard,
}

impl RateLimiter {
    /// Creates a limiter allowing `limit` calls per `interval`, refilled by
    /// a task on `executor`.
    pub fn new(limit: usize, interval: Duration, executor: &SafeExecutor) -> Self {
        Self::builder()
            .limit(limit)
            .interval(interval)
            .build(executor)
    }

    /// Returns a builder for a configured limiter.
    pub fn builder() -> RateLimiterConfigBuilder {
        RateLimiterConfigBuilder::new()
    }

    /// Creates a limiter from a configuration and starts its refill task.
    pub fn with_config(config: RateLimiterConfig, executor: &SafeExecutor) -> Self {
        #[cfg(feature = "metrics")]
        {
            METRICS_INIT.call_once(|| {
                describe_counter!(
                    "ratelimiter_calls_total",
                    "Total number of permit requests (label: outcome=acquired|rejected)"
                );
                describe_histogram!(
                    "ratelimiter_wait_duration_seconds",
                    "Time spent waiting for a permit"
                );
                describe_gauge!(
                    "ratelimiter_available_permits",
                    "Permits currently available in the bucket"
                );
            });
        }

        let bucket = Arc::new(Bucket::new(config.limit));
        let config = Arc::new(config);
        let stop = CancellationToken::new();

        let _ = executor.spawn(refill_loop(
            Arc::clone(&bucket),
            Arc::clone(&config),
            stop.clone(),
        ));

        Self {
            shared: Arc::new(Shared {
                bucket,
                config,
                _refill: stop.clone().drop_guard(),
                stop,
            }),
        }
    }

    /// Takes a permit if one is available. Never waits.
    pub fn allow(&self) -> bool {
        self.try_acquire().is_ok()
    }

    /// Takes a permit if one is available, reporting why not otherwise.
    pub fn try_acquire(&self) -> Result<(), RateLimiterError> {
        if self.shared.bucket.try_take() {
            self.acquired(Duration::ZERO);
            Ok(())
        } else {
            Err(self.rejected())
        }
    }

    /// Waits for a permit.
    ///
    /// Waiters are served in arrival order. Once the limiter is stopped,
    /// waiters take whatever permits remain and then fail with
    /// [`RateLimiterError::Stopped`].
    pub async fn wait(&self) -> Result<(), RateLimiterError> {
        let started = tokio::time::Instant::now();
        let bucket = &self.shared.bucket;

        let acquired = tokio::select! {
            biased;
            taken = bucket.take() => taken,
            _ = self.shared.stop.cancelled() => bucket.try_take(),
        };

        if acquired {
            self.acquired(started.elapsed());
            Ok(())
        } else {
            Err(self.rejected())
        }
    }

    /// Halts the refill task. Idempotent.
    pub fn stop(&self) {
        if !self.shared.stop.is_cancelled() {
            #[cfg(feature = "tracing")]
            tracing::info!(limiter = %self.shared.config.name, "rate limiter stopped");
        }
        self.shared.stop.cancel();
    }

    /// Returns `true` once [`stop`](Self::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        self.shared.stop.is_cancelled()
    }

    /// Permits currently in the bucket.
    pub fn available_tokens(&self) -> usize {
        self.shared.bucket.available()
    }

    /// Bucket capacity.
    pub fn limit(&self) -> usize {
        self.shared.config.limit
    }

    /// Limiter name.
    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    /// Returns a Tower layer that takes a permit from this limiter for every
    /// request.
    pub fn layer(&self) -> RateLimiterLayer {
        RateLimiterLayer::new(self.clone())
    }

    fn acquired(&self, wait_duration: Duration) {
        let config = &self.shared.config;
        config.event_listeners.emit(&RateLimiterEvent::PermitAcquired {
            limiter_name: config.name.clone(),
            timestamp: Instant::now(),
            wait_duration,
        });

        #[cfg(feature = "metrics")]
        {
            counter!("ratelimiter_calls_total", "limiter" => config.name.clone(), "outcome" => "acquired")
                .increment(1);
            histogram!("ratelimiter_wait_duration_seconds", "limiter" => config.name.clone())
                .record(wait_duration.as_secs_f64());
        }
    }

    fn rejected(&self) -> RateLimiterError {
        let config = &self.shared.config;
        let stopped = self.is_stopped();
        config.event_listeners.emit(&RateLimiterEvent::PermitRejected {
            limiter_name: config.name.clone(),
            timestamp: Instant::now(),
            stopped,
        });

        #[cfg(feature = "metrics")]
        counter!("ratelimiter_calls_total", "limiter" => config.name.clone(), "outcome" => "rejected")
            .increment(1);

        if stopped {
            RateLimiterError::Stopped
        } else {
            RateLimiterError::RateLimitExceeded
        }
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("name", &self.shared.config.name)
            .field("limit", &self.shared.config.limit)
            .field("available", &self.available_tokens())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}
