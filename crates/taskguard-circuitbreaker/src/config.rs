use crate::events::CircuitBreakerEvent;
use crate::{CircuitBreaker, CircuitState};
use std::time::Duration;
use taskguard_core::{EventListeners, FnListener};

/// Configuration for the circuit breaker pattern.
pub struct CircuitBreakerConfig {
    pub(crate) max_failures: usize,
    pub(crate) reset_timeout: Duration,
    pub(crate) permitted_calls_in_half_open: Option<usize>,
    pub(crate) event_listeners: EventListeners<CircuitBreakerEvent>,
    pub(crate) name: String,
}

impl CircuitBreakerConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }
}

/// Builder for configuring and constructing a circuit breaker.
pub struct CircuitBreakerConfigBuilder {
    max_failures: usize,
    reset_timeout: Duration,
    permitted_calls_in_half_open: Option<usize>,
    event_listeners: EventListeners<CircuitBreakerEvent>,
    name: String,
}

impl CircuitBreakerConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            max_failures: 5,
            reset_timeout: Duration::from_secs(30),
            permitted_calls_in_half_open: None,
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Sets how many consecutive failures open the circuit. Zero is raised
    /// to one.
    ///
    /// Default: 5
    pub fn max_failures(mut self, n: usize) -> Self {
        self.max_failures = n.max(1);
        self
    }

    /// Sets how long the circuit stays open after the last failure before a
    /// call may probe it.
    ///
    /// Default: 30 seconds
    pub fn reset_timeout(mut self, timeout: Duration) -> Self {
        self.reset_timeout = timeout;
        self
    }

    /// Limits how many probe calls may be in flight while half-open. Extra
    /// callers are rejected as if the circuit were open. Zero is raised to
    /// one.
    ///
    /// Default: unlimited
    pub fn permitted_calls_in_half_open(mut self, n: usize) -> Self {
        self.permitted_calls_in_half_open = Some(n.max(1));
        self
    }

    /// Give this breaker a human-readable name for logs, events and metrics.
    ///
    /// Default: `<unnamed>`
    pub fn name<N: Into<String>>(mut self, n: N) -> Self {
        self.name = n.into();
        self
    }

    /// Registers a callback invoked on every state transition.
    ///
    /// The callback runs after the breaker's lock is released, so it may
    /// query the breaker.
    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::StateTransition {
                    from_state,
                    to_state,
                    ..
                } = event
                {
                    f(*from_state, *to_state);
                }
            }));
        self
    }

    /// Registers a callback invoked when a call is rejected.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if matches!(event, CircuitBreakerEvent::CallRejected { .. }) {
                    f();
                }
            }));
        self
    }

    /// Registers a callback invoked when a failure is recorded, with the
    /// current consecutive failure count.
    pub fn on_failure_recorded<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::FailureRecorded {
                    consecutive_failures,
                    ..
                } = event
                {
                    f(*consecutive_failures);
                }
            }));
        self
    }

    /// Builds the configuration.
    pub fn into_config(self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            max_failures: self.max_failures,
            reset_timeout: self.reset_timeout,
            permitted_calls_in_half_open: self.permitted_calls_in_half_open,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }

    /// Builds the circuit breaker.
    pub fn build(self) -> CircuitBreaker {
        CircuitBreaker::with_config(self.into_config())
    }
}

impl Default for CircuitBreakerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
