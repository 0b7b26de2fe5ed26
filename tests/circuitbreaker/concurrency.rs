use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use taskguard_circuitbreaker::{CircuitBreaker, CircuitState};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_failures_open_once() {
    let opened = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&opened);
    let breaker = CircuitBreaker::builder()
        .max_failures(10)
        .reset_timeout(Duration::from_secs(60))
        .on_state_transition(move |_, to| {
            if to == CircuitState::Open {
                sink.fetch_add(1, Ordering::SeqCst);
            }
        })
        .build();

    let mut handles = Vec::new();
    for _ in 0..50 {
        let breaker = breaker.clone();
        handles.push(tokio::spawn(async move {
            let _ = breaker.execute(|| async { Err::<(), _>("reset by peer") }).await;
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(breaker.state(), CircuitState::Open);
    assert_eq!(opened.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn clones_share_one_circuit() {
    let breaker = CircuitBreaker::new(3, Duration::from_secs(60));
    let clones: Vec<_> = (0..3).map(|_| breaker.clone()).collect();

    for clone in &clones {
        let _ = clone.execute(|| async { Err::<(), _>(()) }).await;
    }

    assert!(breaker.is_open());
    breaker.reset();
    assert!(clones.iter().all(|c| c.state() == CircuitState::Closed));
}
