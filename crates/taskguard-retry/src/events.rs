use std::time::{Duration, Instant};
use taskguard_core::TaskEvent;

/// Events emitted by a [`Retry`](crate::Retry).
#[derive(Debug, Clone)]
pub enum RetryEvent {
    /// An attempt failed and another one will follow after `delay`.
    Retry {
        retry_name: String,
        timestamp: Instant,
        /// 1-based attempt that just failed.
        attempt: usize,
        delay: Duration,
    },
    /// The operation succeeded (either on first try or after retries).
    Success {
        retry_name: String,
        timestamp: Instant,
        attempts: usize,
    },
    /// The operation failed after exhausting all attempts.
    Error {
        retry_name: String,
        timestamp: Instant,
        attempts: usize,
    },
    /// An error was returned without retrying because `retry_on` refused it.
    IgnoredError {
        retry_name: String,
        timestamp: Instant,
        attempt: usize,
    },
}

impl TaskEvent for RetryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RetryEvent::Retry { .. } => "retry",
            RetryEvent::Success { .. } => "success",
            RetryEvent::Error { .. } => "error",
            RetryEvent::IgnoredError { .. } => "ignored_error",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RetryEvent::Retry { timestamp, .. }
            | RetryEvent::Success { timestamp, .. }
            | RetryEvent::Error { timestamp, .. }
            | RetryEvent::IgnoredError { timestamp, .. } => *timestamp,
        }
    }

    fn source_name(&self) -> &str {
        match self {
            RetryEvent::Retry { retry_name, .. }
            | RetryEvent::Success { retry_name, .. }
            | RetryEvent::Error { retry_name, .. }
            | RetryEvent::IgnoredError { retry_name, .. } => retry_name,
        }
    }
}
