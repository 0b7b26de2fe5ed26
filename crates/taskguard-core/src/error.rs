//! Unified error type for code that composes several taskguard components.
//!
//! Each component has its own error enum (`PoolError`, `CircuitBreakerError`,
//! `RateLimiterError`, `RetryError`). Every one of them converts into
//! [`GuardError<E>`], so a call path that goes through a rate limiter, a
//! circuit breaker and a retry can use a single error type:
//!
//! ```rust
//! use taskguard_core::GuardError;
//!
//! #[derive(Debug)]
//! struct StoreDown;
//!
//! impl std::fmt::Display for StoreDown {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "store down")
//!     }
//! }
//!
//! impl std::error::Error for StoreDown {}
//!
//! fn describe(err: &GuardError<StoreDown>) -> &'static str {
//!     if err.is_rejection() {
//!         "rejected before running"
//!     } else {
//!         "ran and failed"
//!     }
//! }
//!
//! assert_eq!(describe(&GuardError::PoolFull { capacity: 4 }), "rejected before running");
//! assert_eq!(describe(&GuardError::Application(StoreDown)), "ran and failed");
//! ```

/// Boxed error returned by job bodies and type-erased task code.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A common error type wrapping every taskguard rejection and failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GuardError<E> {
    /// A worker pool queue was full.
    #[error("pool is full (queue capacity {capacity})")]
    PoolFull {
        /// Capacity of the rejected queue.
        capacity: usize,
    },

    /// The component was stopped and no longer accepts work.
    #[error("{component} is stopped")]
    Stopped {
        /// Which component rejected the call (e.g. "pool", "rate_limiter").
        component: &'static str,
    },

    /// A circuit breaker is open.
    #[error("circuit breaker {name:?} is open")]
    CircuitOpen {
        /// Circuit breaker name.
        name: Option<String>,
    },

    /// A rate limiter had no permit available.
    #[error("rate limited")]
    RateLimited,

    /// Every retry attempt failed; `last` is the final failure.
    #[error("retry failed after {attempts} attempts: {last}")]
    RetryExhausted {
        /// Number of attempts made.
        attempts: usize,
        /// Error of the final attempt.
        last: E,
    },

    /// The task panicked; the panic was contained.
    #[error("task panicked: {message}")]
    Panicked {
        /// Panic payload rendered as text.
        message: String,
    },

    /// The guarded operation itself returned an error.
    #[error("application error: {0}")]
    Application(E),
}

impl<E> GuardError<E> {
    /// Returns `true` for admission-control rejections, where the guarded
    /// operation never ran.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            GuardError::PoolFull { .. }
                | GuardError::Stopped { .. }
                | GuardError::CircuitOpen { .. }
                | GuardError::RateLimited
        )
    }

    /// Returns `true` if this is a circuit breaker rejection.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, GuardError::CircuitOpen { .. })
    }

    /// Returns `true` if this is a rate limiter rejection.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, GuardError::RateLimited)
    }

    /// Returns `true` if this came from the guarded operation itself.
    pub fn is_application(&self) -> bool {
        matches!(
            self,
            GuardError::Application(_) | GuardError::RetryExhausted { .. }
        )
    }

    /// Extracts the application error, unwrapping retry exhaustion.
    pub fn application_error(self) -> Option<E> {
        match self {
            GuardError::Application(e) => Some(e),
            GuardError::RetryExhausted { last, .. } => Some(last),
            _ => None,
        }
    }

    /// Maps the application error using a function.
    pub fn map_application<F, T>(self, f: F) -> GuardError<T>
    where
        F: FnOnce(E) -> T,
    {
        match self {
            GuardError::PoolFull { capacity } => GuardError::PoolFull { capacity },
            GuardError::Stopped { component } => GuardError::Stopped { component },
            GuardError::CircuitOpen { name } => GuardError::CircuitOpen { name },
            GuardError::RateLimited => GuardError::RateLimited,
            GuardError::RetryExhausted { attempts, last } => GuardError::RetryExhausted {
                attempts,
                last: f(last),
            },
            GuardError::Panicked { message } => GuardError::Panicked { message },
            GuardError::Application(e) => GuardError::Application(f(e)),
        }
    }
}
