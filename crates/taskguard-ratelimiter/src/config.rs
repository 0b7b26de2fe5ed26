use crate::events::RateLimiterEvent;
use crate::RateLimiter;
use std::time::Duration;
use taskguard_core::{EventListeners, FnListener};
use taskguard_executor::SafeExecutor;

/// Configuration for the rate limiter pattern.
pub struct RateLimiterConfig {
    pub(crate) limit: usize,
    pub(crate) interval: Duration,
    pub(crate) event_listeners: EventListeners<RateLimiterEvent>,
    pub(crate) name: String,
}

impl RateLimiterConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> RateLimiterConfigBuilder {
        RateLimiterConfigBuilder::new()
    }

    /// Bucket capacity.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Time over which a full bucket is refilled.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Time between two refill ticks: `interval / limit`, but never below
    /// one millisecond. A tick adds every permit owed since the last one, so
    /// the floor does not lower the rate.
    pub fn refill_period(&self) -> Duration {
        let slots = u32::try_from(self.limit).unwrap_or(u32::MAX);
        (self.interval / slots).max(MIN_REFILL_PERIOD)
    }
}

const MIN_REFILL_PERIOD: Duration = Duration::from_millis(1);

/// Builder for [`RateLimiterConfig`].
pub struct RateLimiterConfigBuilder {
    limit: usize,
    interval: Duration,
    event_listeners: EventListeners<RateLimiterEvent>,
    name: String,
}

impl Default for RateLimiterConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiterConfigBuilder {
    /// Creates a new builder with defaults.
    ///
    /// Defaults:
    /// - limit: 100
    /// - interval: 1 second
    /// - name: `"<unnamed>"`
    pub fn new() -> Self {
        Self {
            limit: 100,
            interval: Duration::from_secs(1),
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Sets the bucket capacity. The bucket starts full. Zero is raised to one.
    ///
    /// With an interval of one second this is the sustained number of calls
    /// per second.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    /// Sets how long refilling an empty bucket takes. Permits accrue at
    /// `limit / interval` and are added at most once per millisecond.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the name for this rate limiter instance (used in events, logs
    /// and metric labels).
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback when a permit is acquired.
    ///
    /// # Callback Signature
    /// `Fn(Duration)` - Called with how long the caller waited for the
    /// permit. Non-blocking acquisitions report zero.
    pub fn on_permit_acquired<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RateLimiterEvent::PermitAcquired { wait_duration, .. } = event {
                f(*wait_duration);
            }
        }));
        self
    }

    /// Registers a callback when a caller is refused a permit.
    ///
    /// # Callback Signature
    /// `Fn(bool)` - Called with `true` when the refusal came from a stopped
    /// limiter with no permits left.
    pub fn on_permit_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RateLimiterEvent::PermitRejected { stopped, .. } = event {
                f(*stopped);
            }
        }));
        self
    }

    /// Registers a callback when the refill task exits, either because the
    /// limiter was stopped or because every handle was dropped.
    pub fn on_refill_stopped<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if matches!(event, RateLimiterEvent::RefillStopped { .. }) {
                f();
            }
        }));
        self
    }

    /// Builds the configuration.
    pub fn into_config(self) -> RateLimiterConfig {
        RateLimiterConfig {
            limit: self.limit,
            interval: self.interval,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }

    /// Builds the rate limiter, starting its refill task on `executor`.
    pub fn build(self, executor: &SafeExecutor) -> RateLimiter {
        RateLimiter::with_config(self.into_config(), executor)
    }
}
