use taskguard_core::GuardError;
use thiserror::Error;

/// Errors returned by [`CircuitBreaker::execute`](crate::CircuitBreaker::execute).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CircuitBreakerError<E> {
    /// The circuit is open; the function was not called.
    #[error("circuit is open; call not permitted")]
    OpenCircuit,

    /// The function ran and returned an error.
    #[error("inner error: {0}")]
    Inner(E),
}

impl<E> CircuitBreakerError<E> {
    /// Returns true if the error indicates the circuit is open.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, CircuitBreakerError::OpenCircuit)
    }

    /// Returns the inner error if present.
    pub fn into_inner(self) -> Option<E> {
        match self {
            CircuitBreakerError::Inner(e) => Some(e),
            CircuitBreakerError::OpenCircuit => None,
        }
    }
}

impl<E> From<CircuitBreakerError<E>> for GuardError<E> {
    fn from(err: CircuitBreakerError<E>) -> Self {
        match err {
            CircuitBreakerError::OpenCircuit => GuardError::CircuitOpen { name: None },
            CircuitBreakerError::Inner(e) => GuardError::Application(e),
        }
    }
}
