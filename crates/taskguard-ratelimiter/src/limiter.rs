use crate::config::RateLimiterConfig;
use crate::events::RateLimiterEvent;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Permit store of a fixed capacity.
///
/// Only the refill loop adds permits, so the check in [`Bucket::refill`]
/// cannot race another refill past the capacity.
pub(crate) struct Bucket {
    permits: Semaphore,
    capacity: usize,
}

impl Bucket {
    /// Creates a full bucket.
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            permits: Semaphore::new(capacity),
            capacity,
        }
    }

    pub(crate) fn try_take(&self) -> bool {
        match self.permits.try_acquire() {
            Ok(permit) => {
                permit.forget();
                true
            }
            Err(_) => false,
        }
    }

    /// Waits for a permit in arrival order.
    pub(crate) async fn take(&self) -> bool {
        match self.permits.acquire().await {
            Ok(permit) => {
                permit.forget();
                true
            }
            Err(_) => false,
        }
    }

    /// Adds up to `owed` permits without passing the capacity. Returns how
    /// many were added.
    pub(crate) fn refill(&self, owed: usize) -> usize {
        let room = self.capacity.saturating_sub(self.permits.available_permits());
        let added = owed.min(room);
        if added > 0 {
            self.permits.add_permits(added);
        }
        added
    }

    pub(crate) fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

/// Turns elapsed time into whole permits at `limit` per `interval`.
///
/// The fraction of a permit left over after each tick is carried into the
/// next one, so the long-run rate holds even when the tick period is
/// floored above `interval / limit`.
pub(crate) struct Accrual {
    limit: u128,
    interval_nanos: u128,
    last: Instant,
    carry: u128,
}

impl Accrual {
    pub(crate) fn new(limit: usize, interval: Duration, now: Instant) -> Self {
        Self {
            limit: limit as u128,
            interval_nanos: interval.as_nanos().max(1),
            last: now,
            carry: 0,
        }
    }

    /// Permits owed for the time since the previous call.
    pub(crate) fn owed(&mut self, now: Instant) -> usize {
        let elapsed = now.saturating_duration_since(self.last).as_nanos();
        self.last = now;

        let scaled = self.limit.saturating_mul(elapsed).saturating_add(self.carry);
        self.carry = scaled % self.interval_nanos;
        usize::try_from(scaled / self.interval_nanos).unwrap_or(usize::MAX)
    }
}

/// Adds the permits owed since the previous tick, once per refill period,
/// until `stop` is cancelled.
pub(crate) async fn refill_loop(
    bucket: Arc<Bucket>,
    config: Arc<RateLimiterConfig>,
    stop: CancellationToken,
) {
    let period = config.refill_period();
    let mut accrual = Accrual::new(config.limit, config.interval, Instant::now());
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    #[cfg(feature = "tracing")]
    tracing::debug!(limiter = %config.name, ?period, "refill started");

    loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let owed = accrual.owed(Instant::now());
        if bucket.refill(owed) > 0 {
            #[cfg(feature = "metrics")]
            metrics::gauge!("ratelimiter_available_permits", "limiter" => config.name.clone())
                .set(bucket.available() as f64);
        }
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(limiter = %config.name, remaining = bucket.available(), "refill stopped");

    config.event_listeners.emit(&RateLimiterEvent::RefillStopped {
        limiter_name: config.name.clone(),
        timestamp: std::time::Instant::now(),
    });
}
