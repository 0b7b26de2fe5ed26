use crate::{RateLimitedServiceError, RateLimiter};
use futures::future::BoxFuture;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// A Tower Layer that takes a permit from a [`RateLimiter`] per request.
///
/// Requests never wait for a permit; they are refused at once when the
/// bucket is empty.
#[derive(Clone, Debug)]
pub struct RateLimiterLayer {
    limiter: RateLimiter,
}

impl RateLimiterLayer {
    /// Creates a layer backed by `limiter`.
    pub fn new(limiter: RateLimiter) -> Self {
        Self { limiter }
    }
}

impl<S> Layer<S> for RateLimiterLayer {
    type Service = RateLimiterService<S>;

    fn layer(&self, service: S) -> Self::Service {
        RateLimiterService {
            inner: service,
            limiter: self.limiter.clone(),
        }
    }
}

/// A Tower Service rate limited by a shared [`RateLimiter`].
#[derive(Clone, Debug)]
pub struct RateLimiterService<S> {
    inner: S,
    limiter: RateLimiter,
}

impl<S, Req> Service<Req> for RateLimiterService<S>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Future: Send + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = RateLimitedServiceError<S::Error>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner
            .poll_ready(cx)
            .map_err(RateLimitedServiceError::Inner)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        if let Err(limited) = self.limiter.try_acquire() {
            return Box::pin(async move { Err(RateLimitedServiceError::Limited(limited)) });
        }

        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let fut = inner.call(req);
        Box::pin(async move { fut.await.map_err(RateLimitedServiceError::Inner) })
    }
}
