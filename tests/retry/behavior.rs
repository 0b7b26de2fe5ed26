use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use taskguard_core::GuardError;
use taskguard_executor::SafeExecutor;
use taskguard_retry::{FixedBackoff, Retry, RetryError};

#[derive(Debug, Clone, PartialEq)]
struct FetchError(usize);

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fetch failed on attempt {}", self.0)
    }
}

impl std::error::Error for FetchError {}

#[tokio::test(start_paused = true)]
async fn always_failing_operation_runs_exactly_max_attempts() {
    let executor = SafeExecutor::new();
    for max_attempts in [1usize, 2, 5] {
        let retry = Retry::new(max_attempts, FixedBackoff::new(Duration::from_millis(1)), &executor);
        let calls = AtomicUsize::new(0);

        let err = retry
            .execute(|| async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Err::<(), _>(FetchError(n))
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), max_attempts);
        assert!(err.is_exhausted());
        assert_eq!(err.attempts(), max_attempts);
        assert_eq!(err.last_error(), &FetchError(max_attempts));
    }
}

#[tokio::test(start_paused = true)]
async fn stops_at_first_success() {
    let executor = SafeExecutor::new();
    let retry = Retry::new(10, FixedBackoff::new(Duration::from_millis(5)), &executor);
    let calls = AtomicUsize::new(0);

    let value = retry
        .execute(|| async {
            match calls.fetch_add(1, Ordering::SeqCst) {
                0..=2 => Err(FetchError(0)),
                n => Ok(n * 100),
            }
        })
        .await
        .unwrap();

    assert_eq!(value, 300);
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn error_message_names_the_last_failure() {
    let executor = SafeExecutor::new();
    let retry = Retry::new(3, FixedBackoff::new(Duration::ZERO), &executor);
    let calls = AtomicUsize::new(0);

    let err = retry
        .execute(|| async { Err::<(), _>(FetchError(calls.fetch_add(1, Ordering::SeqCst) + 1)) })
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "retry failed after 3 attempts: fetch failed on attempt 3"
    );
    let source = std::error::Error::source(&err).map(ToString::to_string);
    assert_eq!(source.as_deref(), Some("fetch failed on attempt 3"));
}

#[tokio::test(start_paused = true)]
async fn exhaustion_converts_to_guard_error() {
    let executor = SafeExecutor::new();
    let retry = Retry::new(2, FixedBackoff::new(Duration::ZERO), &executor);

    let err: GuardError<FetchError> = retry
        .execute(|| async { Err::<(), _>(FetchError(7)) })
        .await
        .unwrap_err()
        .into();

    match err {
        GuardError::RetryExhausted { attempts, last } => {
            assert_eq!(attempts, 2);
            assert_eq!(last, FetchError(7));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn shared_retry_serves_concurrent_callers() {
    let executor = SafeExecutor::new();
    let retry = Retry::<FetchError>::new(3, FixedBackoff::new(Duration::from_millis(10)), &executor);
    let calls = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let retry = retry.clone();
        let calls = Arc::clone(&calls);
        handles.push(tokio::spawn(async move {
            retry
                .execute(|| {
                    let calls = Arc::clone(&calls);
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Err::<(), _>(FetchError(0))
                    }
                })
                .await
        }));
    }

    for handle in handles {
        let result: Result<(), RetryError<FetchError>> = handle.await.unwrap();
        assert_eq!(result.unwrap_err().attempts(), 3);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 24);
}
