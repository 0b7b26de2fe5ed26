//! Property tests for the rate limiter.
//!
//! Invariants tested:
//! - A burst never gets more than `limit` permits
//! - The bucket never holds more than `limit` permits
//! - Over a window, grants never exceed the refill rate plus the burst

use proptest::prelude::*;
use std::time::Duration;
use taskguard_executor::SafeExecutor;
use taskguard_ratelimiter::RateLimiter;

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    /// Property: excess calls within one refill period are refused.
    #[test]
    fn burst_is_capped(limit in 1usize..=50, calls in 0usize..=120) {
        let rt = paused_runtime();
        rt.block_on(async {
            let executor = SafeExecutor::new();
            let limiter = RateLimiter::new(limit, Duration::from_secs(10), &executor);

            let granted = (0..calls).filter(|_| limiter.allow()).count();
            prop_assert_eq!(granted, calls.min(limit));
            Ok(())
        })?;
    }

    /// Property: an idle bucket refills to capacity and no further.
    #[test]
    fn idle_bucket_is_bounded(limit in 1usize..=20, idle_ms in 0u64..=2_000) {
        let rt = paused_runtime();
        rt.block_on(async {
            let executor = SafeExecutor::new();
            let limiter = RateLimiter::new(limit, Duration::from_millis(100), &executor);
            while limiter.allow() {}

            tokio::time::sleep(Duration::from_millis(idle_ms)).await;
            prop_assert!(limiter.available_tokens() <= limit);
            Ok(())
        })?;
    }

    /// Property: grants over a window are bounded by burst + refills.
    #[test]
    fn grants_follow_the_refill_rate(
        limit in 1usize..=10,
        interval_ms in 50u64..=500,
        window_ms in 100u64..=3_000,
    ) {
        let rt = paused_runtime();
        rt.block_on(async {
            let executor = SafeExecutor::new();
            let limiter = RateLimiter::new(limit, Duration::from_millis(interval_ms), &executor);
            let period = limiter_period(limit, interval_ms);

            let mut granted = 0u64;
            let mut elapsed = 0;
            while elapsed <= window_ms {
                while limiter.allow() {
                    granted += 1;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
                elapsed += 5;
            }

            let refills = elapsed / period + 1;
            prop_assert!(granted <= limit as u64 + refills, "granted {} > {} + {}", granted, limit, refills);
            Ok(())
        })?;
    }
}

fn limiter_period(limit: usize, interval_ms: u64) -> u64 {
    (interval_ms / limit as u64).max(1)
}
