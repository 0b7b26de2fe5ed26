use taskguard_core::GuardError;

/// Errors returned by a [`RateLimiter`](crate::RateLimiter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RateLimiterError {
    /// No permit was available.
    #[error("rate limit exceeded")]
    RateLimitExceeded,
    /// The limiter was stopped and its remaining permits are used up.
    #[error("rate limiter is stopped")]
    Stopped,
}

impl RateLimiterError {
    /// Returns `true` if the call was refused for lack of a permit.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, RateLimiterError::RateLimitExceeded)
    }

    /// Returns `true` if the limiter no longer refills.
    pub fn is_stopped(&self) -> bool {
        matches!(self, RateLimiterError::Stopped)
    }
}

impl<E> From<RateLimiterError> for GuardError<E> {
    fn from(err: RateLimiterError) -> Self {
        match err {
            RateLimiterError::RateLimitExceeded => GuardError::RateLimited,
            RateLimiterError::Stopped => GuardError::Stopped {
                component: "rate_limiter",
            },
        }
    }
}

/// Error returned by a [`RateLimiterService`](crate::RateLimiterService).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitedServiceError<E> {
    /// The request was refused before reaching the inner service.
    #[error(transparent)]
    Limited(RateLimiterError),
    /// The inner service failed.
    #[error("inner service error: {0}")]
    Inner(E),
}

impl<E> RateLimitedServiceError<E> {
    /// Returns `true` if the request never reached the inner service.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, RateLimitedServiceError::Limited(_))
    }

    /// Returns the inner service's error, if that is what failed.
    pub fn into_inner(self) -> Option<E> {
        match self {
            RateLimitedServiceError::Inner(e) => Some(e),
            RateLimitedServiceError::Limited(_) => None,
        }
    }
}

impl<E> From<RateLimitedServiceError<E>> for GuardError<E> {
    fn from(err: RateLimitedServiceError<E>) -> Self {
        match err {
            RateLimitedServiceError::Limited(limited) => limited.into(),
            RateLimitedServiceError::Inner(e) => GuardError::Application(e),
        }
    }
}
