//! Rate limiter metrics regression tests

use super::helpers::*;
use serial_test::serial;

use std::time::Duration;
use taskguard_executor::SafeExecutor;
use taskguard_ratelimiter::RateLimiter;

#[tokio::test]
#[serial]
async fn ratelimiter_metrics_exist() {
    init_recorder();

    let executor = SafeExecutor::new();
    let limiter = RateLimiter::builder()
        .name("test_limiter")
        .limit(10)
        .interval(Duration::from_secs(1))
        .build(&executor);

    for _ in 0..3 {
        assert!(limiter.allow());
    }
    limiter.wait().await.unwrap();

    assert_counter_exists("ratelimiter_calls_total");
    assert_metric_has_label("ratelimiter_calls_total", "limiter", "test_limiter");
    assert_metric_has_label("ratelimiter_calls_total", "outcome", "acquired");

    assert_histogram_exists("ratelimiter_wait_duration_seconds");
    assert_metric_has_label("ratelimiter_wait_duration_seconds", "limiter", "test_limiter");
}

#[tokio::test]
#[serial]
async fn ratelimiter_rejection_and_refill_metrics() {
    init_recorder();

    let executor = SafeExecutor::new();
    let limiter = RateLimiter::builder()
        .name("reject_limiter")
        .limit(2)
        .interval(Duration::from_millis(40))
        .build(&executor);

    for _ in 0..5 {
        let _ = limiter.allow();
    }
    // One refill period is 20ms.
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_metric_has_label("ratelimiter_calls_total", "outcome", "rejected");
    assert_gauge_exists("ratelimiter_available_permits");
    assert_metric_has_label("ratelimiter_available_permits", "limiter", "reject_limiter");
}
