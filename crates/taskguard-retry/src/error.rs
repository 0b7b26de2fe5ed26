use std::fmt;
use taskguard_core::GuardError;

/// Why a retried operation gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    /// Every attempt failed. `source` is the error of the last one.
    Exhausted {
        /// Number of attempts made.
        attempts: usize,
        /// Error returned by the final attempt.
        source: E,
    },
    /// The `retry_on` predicate refused to retry this error.
    NotRetryable {
        /// 1-based attempt that produced the error.
        attempt: usize,
        /// The refused error.
        source: E,
    },
}

impl<E> RetryError<E> {
    /// Number of attempts made before giving up.
    pub fn attempts(&self) -> usize {
        match self {
            RetryError::Exhausted { attempts, .. } => *attempts,
            RetryError::NotRetryable { attempt, .. } => *attempt,
        }
    }

    /// Returns `true` if the attempt budget ran out.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }

    /// Borrows the error of the last attempt.
    pub fn last_error(&self) -> &E {
        match self {
            RetryError::Exhausted { source, .. } | RetryError::NotRetryable { source, .. } => {
                source
            }
        }
    }

    /// Returns the error of the last attempt.
    pub fn into_last_error(self) -> E {
        match self {
            RetryError::Exhausted { source, .. } | RetryError::NotRetryable { source, .. } => {
                source
            }
        }
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Exhausted { attempts, source } => {
                write!(f, "retry failed after {attempts} attempts: {source}")
            }
            RetryError::NotRetryable { attempt, source } => {
                write!(f, "non-retryable error on attempt {attempt}: {source}")
            }
        }
    }
}

impl<E> std::error::Error for RetryError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.last_error())
    }
}

impl<E> From<RetryError<E>> for GuardError<E> {
    fn from(err: RetryError<E>) -> Self {
        match err {
            RetryError::Exhausted { attempts, source } => GuardError::RetryExhausted {
                attempts,
                last: source,
            },
            RetryError::NotRetryable { source, .. } => GuardError::Application(source),
        }
    }
}
