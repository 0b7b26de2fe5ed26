//! Circuit breaker stress tests

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use taskguard_circuitbreaker::{CircuitBreaker, CircuitState};

/// Test: 1 million calls through a closed circuit
#[tokio::test]
#[ignore]
async fn stress_one_million_calls() {
    let breaker = CircuitBreaker::new(5, Duration::from_secs(30));
    let calls = AtomicUsize::new(0);

    let start = Instant::now();
    for _ in 0..1_000_000 {
        let _ = breaker
            .execute(|| async {
                calls.fetch_add(1, Ordering::Relaxed);
                Ok::<_, ()>(())
            })
            .await;
    }
    let elapsed = start.elapsed();

    println!("1M calls completed in {:?}", elapsed);
    println!("Throughput: {:.0} calls/sec", 1_000_000.0 / elapsed.as_secs_f64());
    assert_eq!(calls.load(Ordering::Relaxed), 1_000_000);
    assert_eq!(breaker.state(), CircuitState::Closed);
}

/// Test: thousands of concurrent callers while the circuit thrashes
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore]
async fn stress_concurrent_thrashing() {
    let breaker = CircuitBreaker::builder()
        .max_failures(3)
        .reset_timeout(Duration::from_millis(1))
        .build();
    let invoked = Arc::new(AtomicUsize::new(0));
    let rejected = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for task in 0..2_000usize {
        let breaker = breaker.clone();
        let invoked = Arc::clone(&invoked);
        let rejected = Arc::clone(&rejected);
        handles.push(tokio::spawn(async move {
            for i in 0..50usize {
                let fail = (task + i) % 3 == 0;
                let result = breaker
                    .execute(|| async {
                        invoked.fetch_add(1, Ordering::Relaxed);
                        if fail { Err(()) } else { Ok(()) }
                    })
                    .await;
                if matches!(result, Err(ref e) if e.is_circuit_open()) {
                    rejected.fetch_add(1, Ordering::Relaxed);
                }
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let invoked = invoked.load(Ordering::Relaxed);
    let rejected = rejected.load(Ordering::Relaxed);
    println!("invoked {invoked}, rejected {rejected}");
    assert_eq!(invoked + rejected, 100_000);

    let (failures, _) = breaker.stats();
    assert!(failures <= 100_000);
}
