use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use taskguard_executor::SafeExecutor;
use taskguard_ratelimiter::RateLimiter;

#[tokio::test(start_paused = true)]
async fn wait_blocks_until_refill() {
    let executor = SafeExecutor::new();
    let limiter = RateLimiter::new(2, Duration::from_millis(200), &executor);
    assert!(limiter.allow());
    assert!(limiter.allow());

    let started = tokio::time::Instant::now();
    limiter.wait().await.unwrap();
    let waited = started.elapsed();

    assert!(waited >= Duration::from_millis(100), "waited {waited:?}");
    assert!(waited < Duration::from_millis(200), "waited {waited:?}");
}

#[tokio::test(start_paused = true)]
async fn waiters_are_served_in_arrival_order() {
    let executor = SafeExecutor::new();
    let limiter = RateLimiter::new(1, Duration::from_millis(10), &executor);
    assert!(limiter.allow());

    let order = Arc::new(Mutex::new(Vec::new()));
    let mut handles = Vec::new();
    for i in 0..5 {
        let limiter = limiter.clone();
        let order = Arc::clone(&order);
        handles.push(tokio::spawn(async move {
            limiter.wait().await.unwrap();
            order.lock().push(i);
        }));
        tokio::task::yield_now().await;
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
}

#[tokio::test(start_paused = true)]
async fn wait_reports_acquisition_delay() {
    let executor = SafeExecutor::new();
    let delays = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&delays);
    let limiter = RateLimiter::builder()
        .limit(1)
        .interval(Duration::from_millis(50))
        .on_permit_acquired(move |waited| sink.lock().push(waited))
        .build(&executor);

    limiter.wait().await.unwrap();
    limiter.wait().await.unwrap();

    let delays = delays.lock();
    assert_eq!(delays.len(), 2);
    assert_eq!(delays[0], Duration::ZERO);
    assert!(delays[1] >= Duration::from_millis(40));
}
