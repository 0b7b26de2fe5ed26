use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use taskguard_executor::SafeExecutor;
use taskguard_retry::{BackoffStrategy, ExponentialBackoff, FnBackoff, LinearBackoff, Retry};
use tokio::time::Instant;

async fn attempt_offsets(retry: &Retry<&'static str>) -> Vec<Duration> {
    let start = Instant::now();
    let stamps = Mutex::new(Vec::new());
    let _ = retry
        .execute(|| {
            stamps.lock().push(start.elapsed());
            async { Err::<(), _>("unavailable") }
        })
        .await;
    stamps.into_inner()
}

#[tokio::test(start_paused = true)]
async fn fixed_backoff_spaces_attempts_evenly() {
    let executor = SafeExecutor::new();
    let retry = Retry::builder()
        .max_attempts(4)
        .fixed_backoff(Duration::from_millis(25))
        .build(&executor);

    let offsets = attempt_offsets(&retry).await;
    let expected = [0, 25, 50, 75].map(Duration::from_millis).to_vec();
    assert_eq!(offsets, expected);
}

#[tokio::test(start_paused = true)]
async fn exponential_backoff_doubles_until_capped() {
    let executor = SafeExecutor::new();
    let retry = Retry::builder()
        .max_attempts(6)
        .exponential_backoff(Duration::from_millis(10), Duration::from_millis(50))
        .build(&executor);

    let offsets = attempt_offsets(&retry).await;
    // Gaps: 10, 20, 40, 50, 50.
    let expected = [0, 10, 30, 70, 120, 170].map(Duration::from_millis).to_vec();
    assert_eq!(offsets, expected);
}

#[tokio::test(start_paused = true)]
async fn linear_backoff_grows_by_base() {
    let executor = SafeExecutor::new();
    let retry = Retry::builder()
        .max_attempts(4)
        .linear_backoff(Duration::from_millis(10), Duration::from_secs(1))
        .build(&executor);

    let offsets = attempt_offsets(&retry).await;
    // Gaps: 10, 20, 30.
    let expected = [0, 10, 30, 60].map(Duration::from_millis).to_vec();
    assert_eq!(offsets, expected);
}

#[tokio::test(start_paused = true)]
async fn custom_backoff_function() {
    let executor = SafeExecutor::new();
    let retry = Retry::builder()
        .max_attempts(3)
        .backoff_fn(|attempt| Duration::from_millis(if attempt == 0 { 100 } else { 1 }))
        .build(&executor);

    let offsets = attempt_offsets(&retry).await;
    let expected = [0, 100, 101].map(Duration::from_millis).to_vec();
    assert_eq!(offsets, expected);
}

#[test]
fn strategies_saturate_on_large_attempts() {
    let exponential = ExponentialBackoff::new(Duration::from_millis(1), Duration::from_secs(30));
    assert_eq!(exponential.delay(200), Duration::from_secs(30));

    let linear = LinearBackoff::new(Duration::from_secs(1), Duration::from_secs(5));
    assert_eq!(linear.delay(usize::MAX), Duration::from_secs(5));

    let custom = FnBackoff::new(|attempt| Duration::from_millis(attempt as u64));
    assert_eq!(custom.delay(7), Duration::from_millis(7));
}

#[tokio::test(start_paused = true)]
async fn shared_strategy_object() {
    let executor = SafeExecutor::new();
    let strategy: Arc<dyn BackoffStrategy> =
        Arc::new(ExponentialBackoff::new(Duration::from_millis(5), Duration::from_millis(5)));
    assert_eq!(strategy.delay(3), Duration::from_millis(5));

    let retry: Retry<&'static str> = Retry::new(
        2,
        ExponentialBackoff::new(Duration::from_millis(5), Duration::from_millis(5)),
        &executor,
    );
    let offsets = attempt_offsets(&retry).await;
    assert_eq!(offsets, vec![Duration::ZERO, Duration::from_millis(5)]);
}
