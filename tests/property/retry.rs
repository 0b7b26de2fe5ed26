//! Property tests for retry.
//!
//! Invariants tested:
//! - An always-failing operation runs exactly `max_attempts` times
//! - An operation failing `k < max_attempts` times succeeds after `k + 1` calls
//! - Backoff delays are bounded by the configured maximum

use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use taskguard_executor::SafeExecutor;
use taskguard_retry::{BackoffStrategy, ExponentialBackoff, LinearBackoff, Retry};

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    /// Property: attempts are exact.
    #[test]
    fn invocations_match_outcomes(max_attempts in 1usize..=10, failures in 0usize..=12) {
        let rt = paused_runtime();
        rt.block_on(async {
            let executor = SafeExecutor::new();
            let retry = Retry::builder()
                .max_attempts(max_attempts)
                .fixed_backoff(Duration::from_millis(3))
                .build(&executor);
            let calls = AtomicUsize::new(0);

            let result = retry
                .execute(|| async {
                    if calls.fetch_add(1, Ordering::SeqCst) < failures {
                        Err("nope")
                    } else {
                        Ok(())
                    }
                })
                .await;

            if failures < max_attempts {
                prop_assert!(result.is_ok());
                prop_assert_eq!(calls.load(Ordering::SeqCst), failures + 1);
            } else {
                let err = result.unwrap_err();
                prop_assert_eq!(err.attempts(), max_attempts);
                prop_assert_eq!(calls.load(Ordering::SeqCst), max_attempts);
            }
            Ok(())
        })?;
    }

    /// Property: exponential delays are monotonic and capped.
    #[test]
    fn exponential_delays_are_capped(base_ms in 1u64..=1_000, max_ms in 1u64..=60_000, attempt in 0usize..=100) {
        let max = Duration::from_millis(max_ms);
        let backoff = ExponentialBackoff::new(Duration::from_millis(base_ms), max);
        let delay = backoff.delay(attempt);
        prop_assert!(delay <= max);
        prop_assert!(backoff.delay(attempt + 1) >= delay);
    }

    /// Property: linear delays are monotonic and capped.
    #[test]
    fn linear_delays_are_capped(base_ms in 1u64..=1_000, max_ms in 1u64..=60_000, attempt in 0usize..=1_000) {
        let max = Duration::from_millis(max_ms);
        let backoff = LinearBackoff::new(Duration::from_millis(base_ms), max);
        let delay = backoff.delay(attempt);
        prop_assert!(delay <= max);
        prop_assert!(backoff.delay(attempt + 1) >= delay);
    }
}
