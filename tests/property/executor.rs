//! Property tests for the safe executor.
//!
//! Invariants tested:
//! - Once every task finished, `completed + panics == total` and nothing is active
//! - The recovery handler runs once per panic

use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use taskguard_executor::SafeExecutor;
use tokio::runtime::Runtime;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    /// Property: stats balance for any mix of normal and panicking tasks.
    #[test]
    fn stats_balance(outcomes in prop::collection::vec(any::<bool>(), 0..60)) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let executor = SafeExecutor::new();
            let recovered = Arc::new(AtomicUsize::new(0));
            let counter = Arc::clone(&recovered);
            executor.set_recover_handler(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });

            let handles: Vec<_> = outcomes
                .iter()
                .map(|&panics| {
                    executor.spawn(async move {
                        tokio::task::yield_now().await;
                        if panics {
                            panic!("generated panic");
                        }
                    })
                })
                .collect();
            for handle in handles {
                let _ = handle.join().await;
            }

            let expected_panics = outcomes.iter().filter(|&&p| p).count() as u64;
            let stats = executor.stats();
            prop_assert_eq!(stats.total_spawned, outcomes.len() as u64);
            prop_assert_eq!(stats.active_count, 0);
            prop_assert_eq!(stats.panic_count, expected_panics);
            prop_assert_eq!(stats.completed_count + stats.panic_count, stats.total_spawned);
            prop_assert_eq!(recovered.load(Ordering::SeqCst) as u64, expected_panics);
            Ok(())
        })?;
    }
}
