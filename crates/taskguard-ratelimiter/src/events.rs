use std::time::{Duration, Instant};
use taskguard_core::TaskEvent;

/// Events emitted by a [`RateLimiter`](crate::RateLimiter).
#[derive(Debug, Clone)]
pub enum RateLimiterEvent {
    /// A permit was taken.
    PermitAcquired {
        limiter_name: String,
        timestamp: Instant,
        /// How long the caller waited; zero for [`allow`](crate::RateLimiter::allow).
        wait_duration: Duration,
    },
    /// A caller was refused.
    PermitRejected {
        limiter_name: String,
        timestamp: Instant,
        /// Set when the refusal came from a stopped limiter.
        stopped: bool,
    },
    /// The refill task exited.
    RefillStopped {
        limiter_name: String,
        timestamp: Instant,
    },
}

impl TaskEvent for RateLimiterEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RateLimiterEvent::PermitAcquired { .. } => "permit_acquired",
            RateLimiterEvent::PermitRejected { .. } => "permit_rejected",
            RateLimiterEvent::RefillStopped { .. } => "refill_stopped",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RateLimiterEvent::PermitAcquired { timestamp, .. }
            | RateLimiterEvent::PermitRejected { timestamp, .. }
            | RateLimiterEvent::RefillStopped { timestamp, .. } => *timestamp,
        }
    }

    fn source_name(&self) -> &str {
        match self {
            RateLimiterEvent::PermitAcquired { limiter_name, .. }
            | RateLimiterEvent::PermitRejected { limiter_name, .. }
            | RateLimiterEvent::RefillStopped { limiter_name, .. } => limiter_name,
        }
    }
}
