use std::time::Duration;
use taskguard_executor::SafeExecutor;
use taskguard_ratelimiter::RateLimiter;

#[tokio::test(start_paused = true)]
async fn burst_is_capped_at_limit() {
    let executor = SafeExecutor::new();
    let limiter = RateLimiter::new(10, Duration::from_secs(1), &executor);

    let allowed = (0..25).filter(|_| limiter.allow()).count();
    assert_eq!(allowed, 10);
    assert_eq!(limiter.available_tokens(), 0);
}

#[tokio::test(start_paused = true)]
async fn refills_one_permit_per_period() {
    let executor = SafeExecutor::new();
    let limiter = RateLimiter::new(4, Duration::from_millis(400), &executor);
    while limiter.allow() {}

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(limiter.available_tokens(), 1);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(limiter.available_tokens(), 3);
}

#[tokio::test(start_paused = true)]
async fn idle_bucket_never_exceeds_capacity() {
    let executor = SafeExecutor::new();
    let limiter = RateLimiter::new(3, Duration::from_millis(30), &executor);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(limiter.available_tokens(), 3);
    assert_eq!((0..10).filter(|_| limiter.allow()).count(), 3);
}

#[tokio::test(start_paused = true)]
async fn sustained_rate_matches_configuration() {
    let executor = SafeExecutor::new();
    let limiter = RateLimiter::new(5, Duration::from_millis(100), &executor);
    while limiter.allow() {}

    let mut allowed = 0;
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        if limiter.allow() {
            allowed += 1;
        }
    }

    // One second at five permits per 100ms.
    assert!((48..=50).contains(&allowed), "allowed {allowed}");
}

#[tokio::test(start_paused = true)]
async fn rates_above_one_permit_per_millisecond_are_kept() {
    let executor = SafeExecutor::new();
    // 10 permits per millisecond, above the refill tick floor.
    let limiter = RateLimiter::new(1000, Duration::from_millis(100), &executor);
    while limiter.allow() {}

    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut allowed = 0;
    while limiter.allow() {
        allowed += 1;
    }
    assert!((490..=510).contains(&allowed), "allowed {allowed}");
}
