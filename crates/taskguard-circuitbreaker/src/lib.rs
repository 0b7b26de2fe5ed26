//! Consecutive-failure circuit breaker.
//!
//! A [`CircuitBreaker`] stops calling a failing dependency after
//! `max_failures` consecutive failures, rejects calls while open, and lets
//! calls probe the dependency again once `reset_timeout` has passed since the
//! last failure.
//!
//! ## States
//! - **Closed**: calls pass; a failure extends the failure streak, a success
//!   ends it. Reaching `max_failures` opens the circuit.
//! - **Open**: calls fail with [`CircuitBreakerError::OpenCircuit`] without
//!   running. The first call after `reset_timeout` moves to half-open.
//! - **HalfOpen**: calls run; a success closes the circuit, a failure opens
//!   it again.
//!
//! By default every caller arriving while half-open is admitted. Use
//! [`CircuitBreakerConfigBuilder::permitted_calls_in_half_open`] to cap the
//! number of concurrent probes.
//!
//! ## Example
//! ```rust
//! use taskguard_circuitbreaker::{CircuitBreaker, CircuitState};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let breaker = CircuitBreaker::builder()
//!     .name("search-backend")
//!     .max_failures(2)
//!     .reset_timeout(Duration::from_secs(10))
//!     .build();
//!
//! for _ in 0..2 {
//!     let _ = breaker.execute(|| async { Err::<(), _>("timeout") }).await;
//! }
//! assert_eq!(breaker.state(), CircuitState::Open);
//!
//! let err = breaker.execute(|| async { Ok::<_, &str>(1) }).await.unwrap_err();
//! assert!(err.is_circuit_open());
//! # }
//! ```
//!
//! ## Tower
//! [`CircuitBreaker::layer`] returns a [`CircuitBreakerLayer`] sharing the
//! breaker's state, so direct calls and service calls trip the same circuit.
//!
//! ## Feature Flags
//! - `metrics`: enables metrics collection using the `metrics` crate.
//! - `tracing`: logs state transitions using the `tracing` crate.

use crate::circuit::{Admission, Circuit};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[cfg(feature = "metrics")]
use metrics::{describe_counter, describe_gauge};
#[cfg(feature = "metrics")]
use std::sync::Once;

pub use circuit::CircuitState;
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
pub use error::CircuitBreakerError;
pub use events::CircuitBreakerEvent;
pub use layer::{CircuitBreakerLayer, CircuitBreakerService};

mod circuit;
mod config;
mod error;
mod events;
mod layer;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

/// Guards calls to a dependency by counting consecutive failures.
///
/// Cheap to clone; clones share one circuit.
#[derive(Clone)]
pub struct CircuitBreaker {
    shared: Arc<Shared>,
}

struct Shared {
    circuit: Mutex<Circuit>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    /// Creates a breaker that opens after `max_failures` consecutive
    /// failures and probes again `reset_timeout` after the last failure.
    pub fn new(max_failures: usize, reset_timeout: Duration) -> Self {
        Self::builder()
            .max_failures(max_failures)
            .reset_timeout(reset_timeout)
            .build()
    }

    /// Returns a builder for a configured breaker.
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Creates a breaker from a configuration.
    pub fn with_config(config: CircuitBreakerConfig) -> Self {
        #[cfg(feature = "metrics")]
        {
            METRICS_INIT.call_once(|| {
                describe_counter!(
                    "circuitbreaker_calls_total",
                    "Total number of calls through the circuit breaker"
                );
                describe_counter!(
                    "circuitbreaker_transitions_total",
                    "Total number of circuit breaker state transitions"
                );
                describe_gauge!(
                    "circuitbreaker_state",
                    "Current state of the circuit breaker (0 closed, 1 half-open, 2 open)"
                );
            });
        }

        Self {
            shared: Arc::new(Shared {
                circuit: Mutex::new(Circuit::new()),
                config,
            }),
        }
    }

    /// Runs `f` if the circuit admits the call and records its outcome.
    ///
    /// Nothing is awaited before `f` is called. When the circuit rejects the
    /// call, `f` is never invoked and [`CircuitBreakerError::OpenCircuit`]
    /// is returned.
    pub async fn execute<F, Fut, T, E>(&self, f: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let Some(permit) = self.try_acquire() else {
            return Err(CircuitBreakerError::OpenCircuit);
        };

        let result = f().await;
        permit.complete(result.is_ok());
        result.map_err(CircuitBreakerError::Inner)
    }

    /// Current state.
    ///
    /// An open circuit whose reset timeout has passed still reports `Open`
    /// until the next call moves it to half-open.
    pub fn state(&self) -> CircuitState {
        self.shared.circuit.lock().state()
    }

    /// Returns `(consecutive failures, successes since the last reset)`.
    pub fn stats(&self) -> (usize, usize) {
        self.shared.circuit.lock().counts()
    }

    /// When the most recent failure was recorded.
    pub fn last_failure_time(&self) -> Option<Instant> {
        self.shared.circuit.lock().last_failure_time()
    }

    /// Returns `true` while the circuit is open.
    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    /// Closes the circuit and zeroes every counter.
    pub fn reset(&self) {
        let mut events = Vec::new();
        self.shared
            .circuit
            .lock()
            .reset(&self.shared.config, &mut events);
        self.emit(events);
    }

    /// Breaker name.
    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    /// Returns a Tower layer backed by this breaker's circuit.
    pub fn layer(&self) -> CircuitBreakerLayer {
        CircuitBreakerLayer::new(self.clone())
    }

    fn try_acquire(&self) -> Option<CallPermit<'_>> {
        let mut events = Vec::new();
        let admission = self
            .shared
            .circuit
            .lock()
            .try_acquire(&self.shared.config, &mut events);
        self.emit(events);

        admission.map(|admission| CallPermit {
            breaker: self,
            admission,
            completed: false,
        })
    }

    fn emit(&self, events: Vec<CircuitBreakerEvent>) {
        for event in &events {
            self.shared.config.event_listeners.emit(event);
        }
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (state, counts) = {
            let circuit = self.shared.circuit.lock();
            (circuit.state(), circuit.counts())
        };
        f.debug_struct("CircuitBreaker")
            .field("name", &self.shared.config.name)
            .field("state", &state)
            .field("counts", &counts)
            .finish()
    }
}

/// An admitted call. Dropping it without completing (the caller's future
/// was cancelled) gives back any half-open probe slot it held.
struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    admission: Admission,
    completed: bool,
}

impl CallPermit<'_> {
    fn complete(mut self, success: bool) {
        self.completed = true;
        let shared = &self.breaker.shared;
        let mut events = Vec::new();
        {
            let mut circuit = shared.circuit.lock();
            circuit.release(self.admission);
            if success {
                circuit.record_success(&shared.config, &mut events);
            } else {
                circuit.record_failure(&shared.config, &mut events);
            }
        }
        self.breaker.emit(events);
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.completed {
            self.breaker.shared.circuit.lock().release(self.admission);
        }
    }
}
