//! Worker pool stress tests

use std::sync::Arc;
use std::time::{Duration, Instant};
use taskguard_executor::SafeExecutor;
use taskguard_pool::{Pool, PoolConfig, PoolError};

use super::ConcurrencyTracker;

/// Test: 100k jobs through a small pool with back-pressure
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore]
async fn stress_hundred_thousand_jobs() {
    let executor = SafeExecutor::new();
    let pool = Pool::new(
        PoolConfig::builder().max_workers(16).queue_size(1_000).build(),
        &executor,
    );
    let tracker = ConcurrencyTracker::new();

    let start = Instant::now();
    let mut rejected = 0u64;
    for i in 0..100_000 {
        loop {
            let tracker = Arc::clone(&tracker);
            match pool.submit_fn(format!("job-{i}"), move |_| async move {
                tracker.enter();
                tokio::task::yield_now().await;
                tracker.exit();
                Ok(())
            }) {
                Ok(()) => break,
                Err(PoolError::PoolFull { .. }) => {
                    rejected += 1;
                    tokio::task::yield_now().await;
                }
                Err(err) => panic!("unexpected rejection: {err}"),
            }
        }
    }
    pool.stop_gracefully(Duration::from_secs(60)).await;
    let elapsed = start.elapsed();

    println!("100k jobs completed in {:?} ({} full rejections)", elapsed, rejected);
    let stats = pool.stats();
    assert_eq!(stats.total_jobs, 100_000);
    assert_eq!(stats.completed_jobs, 100_000);
    assert!(tracker.peak() <= 16);
}

/// Test: half the jobs fail or panic
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore]
async fn stress_failing_jobs_keep_workers_alive() {
    let executor = SafeExecutor::new();
    executor.set_logger(Arc::new(taskguard_executor::NoopLogger));
    let pool = Pool::new(
        PoolConfig::builder().max_workers(8).queue_size(20_000).build(),
        &executor,
    );

    for i in 0..20_000u32 {
        pool.submit_fn(format!("job-{i}"), move |_| async move {
            match i % 4 {
                0 => panic!("job {i} panicked"),
                1 => Err(format!("job {i} failed").into()),
                _ => Ok(()),
            }
        })
        .unwrap();
    }

    pool.stop_gracefully(Duration::from_secs(60)).await;
    let stats = pool.stats();
    assert_eq!(stats.completed_jobs, 10_000);
    assert_eq!(stats.failed_jobs, 10_000);
    assert_eq!(pool.executor_stats().panic_count, 5_000);
}
