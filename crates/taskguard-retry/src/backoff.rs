//! Backoff strategies.
//!
//! A strategy maps the 0-based index of the attempt that just failed to the
//! delay before the next one. Every strategy here is a pure function of that
//! index, so one instance can be shared by concurrent retries.

use std::fmt;
use std::time::Duration;

/// Computes the delay before retrying after a failed attempt.
pub trait BackoffStrategy: Send + Sync {
    /// Delay after the failure of attempt `attempt` (0-based).
    fn delay(&self, attempt: usize) -> Duration;
}

/// The same delay after every failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedBackoff {
    delay: Duration,
}

impl FixedBackoff {
    /// Creates a fixed backoff.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl BackoffStrategy for FixedBackoff {
    fn delay(&self, _attempt: usize) -> Duration {
        self.delay
    }
}

/// `base * (attempt + 1)`, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearBackoff {
    base: Duration,
    max: Duration,
}

impl LinearBackoff {
    /// Creates a linear backoff.
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }
}

impl BackoffStrategy for LinearBackoff {
    fn delay(&self, attempt: usize) -> Duration {
        u32::try_from(attempt.saturating_add(1))
            .ok()
            .and_then(|factor| self.base.checked_mul(factor))
            .map_or(self.max, |delay| delay.min(self.max))
    }
}

/// `base * 2^attempt`, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    base: Duration,
    max: Duration,
}

impl ExponentialBackoff {
    /// Creates an exponential backoff.
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }
}

impl BackoffStrategy for ExponentialBackoff {
    fn delay(&self, attempt: usize) -> Duration {
        u32::try_from(attempt)
            .ok()
            .and_then(|shift| 1u32.checked_shl(shift))
            .and_then(|factor| self.base.checked_mul(factor))
            .map_or(self.max, |delay| delay.min(self.max))
    }
}

/// A backoff computed by a closure.
pub struct FnBackoff<F> {
    f: F,
}

impl<F> FnBackoff<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    /// Wraps `f`.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> BackoffStrategy for FnBackoff<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    fn delay(&self, attempt: usize) -> Duration {
        (self.f)(attempt)
    }
}

impl<F> fmt::Debug for FnBackoff<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnBackoff").finish_non_exhaustive()
    }
}
