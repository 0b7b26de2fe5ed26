use crate::CircuitState;
use std::time::Instant;
use taskguard_core::TaskEvent;

/// Events emitted by a [`CircuitBreaker`](crate::CircuitBreaker).
#[derive(Debug, Clone)]
pub enum CircuitBreakerEvent {
    /// A call was permitted through the circuit breaker.
    CallPermitted {
        breaker_name: String,
        timestamp: Instant,
        state: CircuitState,
    },
    /// A call was rejected without running.
    CallRejected {
        breaker_name: String,
        timestamp: Instant,
        state: CircuitState,
    },
    /// The circuit breaker transitioned between states.
    StateTransition {
        breaker_name: String,
        timestamp: Instant,
        from_state: CircuitState,
        to_state: CircuitState,
    },
    /// A successful call was recorded.
    SuccessRecorded {
        breaker_name: String,
        timestamp: Instant,
        state: CircuitState,
    },
    /// A failed call was recorded.
    FailureRecorded {
        breaker_name: String,
        timestamp: Instant,
        state: CircuitState,
        consecutive_failures: usize,
    },
}

impl TaskEvent for CircuitBreakerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CircuitBreakerEvent::CallPermitted { .. } => "call_permitted",
            CircuitBreakerEvent::CallRejected { .. } => "call_rejected",
            CircuitBreakerEvent::StateTransition { .. } => "state_transition",
            CircuitBreakerEvent::SuccessRecorded { .. } => "success_recorded",
            CircuitBreakerEvent::FailureRecorded { .. } => "failure_recorded",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CircuitBreakerEvent::CallPermitted { timestamp, .. }
            | CircuitBreakerEvent::CallRejected { timestamp, .. }
            | CircuitBreakerEvent::StateTransition { timestamp, .. }
            | CircuitBreakerEvent::SuccessRecorded { timestamp, .. }
            | CircuitBreakerEvent::FailureRecorded { timestamp, .. } => *timestamp,
        }
    }

    fn source_name(&self) -> &str {
        match self {
            CircuitBreakerEvent::CallPermitted { breaker_name, .. }
            | CircuitBreakerEvent::CallRejected { breaker_name, .. }
            | CircuitBreakerEvent::StateTransition { breaker_name, .. }
            | CircuitBreakerEvent::SuccessRecorded { breaker_name, .. }
            | CircuitBreakerEvent::FailureRecorded { breaker_name, .. } => breaker_name,
        }
    }
}
