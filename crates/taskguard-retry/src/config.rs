use crate::backoff::{BackoffStrategy, ExponentialBackoff, FixedBackoff, FnBackoff, LinearBackoff};
use crate::events::RetryEvent;
use crate::Retry;
use std::sync::Arc;
use std::time::Duration;
use taskguard_core::{EventListeners, FnListener};
use taskguard_executor::SafeExecutor;

pub(crate) type RetryPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Configuration for the retry pattern.
pub struct RetryConfig<E> {
    pub(crate) max_attempts: usize,
    pub(crate) backoff: Arc<dyn BackoffStrategy>,
    pub(crate) retry_on: Option<RetryPredicate<E>>,
    pub(crate) event_listeners: EventListeners<RetryEvent>,
    pub(crate) name: String,
}

impl<E> RetryConfig<E> {
    /// Creates a new configuration builder.
    pub fn builder() -> RetryConfigBuilder<E> {
        RetryConfigBuilder::new()
    }

    /// Total number of attempts, including the first.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub(crate) fn should_retry(&self, error: &E) -> bool {
        self.retry_on.as_ref().map_or(true, |predicate| predicate(error))
    }
}

/// Builder for [`RetryConfig`].
pub struct RetryConfigBuilder<E> {
    max_attempts: usize,
    backoff: Option<Arc<dyn BackoffStrategy>>,
    retry_on: Option<RetryPredicate<E>>,
    event_listeners: EventListeners<RetryEvent>,
    name: String,
}

impl<E> Default for RetryConfigBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> RetryConfigBuilder<E> {
    /// Creates a new builder with defaults.
    ///
    /// Defaults:
    /// - max_attempts: 3
    /// - backoff: fixed 100ms
    /// - retry_on: every error is retried
    /// - name: `"<unnamed>"`
    pub fn new() -> Self {
        Self {
            max_attempts: 3,
            backoff: None,
            retry_on: None,
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Sets the total number of attempts, including the first. Zero is
    /// raised to one.
    pub fn max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Waits `delay` between attempts.
    pub fn fixed_backoff(self, delay: Duration) -> Self {
        self.backoff(FixedBackoff::new(delay))
    }

    /// Waits `base * attempt`, at most `max`, between attempts.
    pub fn linear_backoff(self, base: Duration, max: Duration) -> Self {
        self.backoff(LinearBackoff::new(base, max))
    }

    /// Doubles the wait after every failure, starting at `base`, up to `max`.
    pub fn exponential_backoff(self, base: Duration, max: Duration) -> Self {
        self.backoff(ExponentialBackoff::new(base, max))
    }

    /// Computes the wait with `f(attempt)`, where `attempt` is the 0-based
    /// index of the attempt that failed.
    pub fn backoff_fn<F>(self, f: F) -> Self
    where
        F: Fn(usize) -> Duration + Send + Sync + 'static,
    {
        self.backoff(FnBackoff::new(f))
    }

    /// Sets a custom backoff strategy.
    pub fn backoff<B>(mut self, backoff: B) -> Self
    where
        B: BackoffStrategy + 'static,
    {
        self.backoff = Some(Arc::new(backoff));
        self
    }

    /// Sets a predicate to determine which errors should be retried. Errors
    /// it rejects are returned at once as
    /// [`RetryError::NotRetryable`](crate::RetryError::NotRetryable).
    pub fn retry_on<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.retry_on = Some(Arc::new(predicate));
        self
    }

    /// Sets the name for this retry instance (used in events, logs and
    /// metric labels).
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback before each retry.
    ///
    /// # Callback Signature
    /// `Fn(usize, Duration)` - the 1-based attempt that failed and the delay
    /// before the next one.
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Retry { attempt, delay, .. } = event {
                f(*attempt, *delay);
            }
        }));
        self
    }

    /// Registers a callback when an operation succeeds, with the number of
    /// attempts it took.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Success { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a callback when every attempt failed, with the number of
    /// attempts made.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Error { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a callback when `retry_on` refuses an error.
    pub fn on_ignored_error<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::IgnoredError { attempt, .. } = event {
                f(*attempt);
            }
        }));
        self
    }

    /// Builds the configuration.
    pub fn into_config(self) -> RetryConfig<E> {
        RetryConfig {
            max_attempts: self.max_attempts,
            backoff: self
                .backoff
                .unwrap_or_else(|| Arc::new(FixedBackoff::new(Duration::from_millis(100)))),
            retry_on: self.retry_on,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }

    /// Builds a [`Retry`] that runs asynchronous retries on `executor`.
    pub fn build(self, executor: &SafeExecutor) -> Retry<E> {
        Retry::with_config(self.into_config(), executor)
    }
}
