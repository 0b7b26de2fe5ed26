use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use taskguard_circuitbreaker::{CircuitBreaker, CircuitState};

async fn trip(breaker: &CircuitBreaker, failures: usize) {
    for _ in 0..failures {
        let _ = breaker.execute(|| async { Err::<(), _>("timeout") }).await;
    }
}

#[tokio::test]
async fn stays_open_until_reset_timeout() {
    let breaker = CircuitBreaker::new(1, Duration::from_millis(100));
    trip(&breaker, 1).await;

    tokio::time::sleep(Duration::from_millis(30)).await;
    let err = breaker.execute(|| async { Ok::<_, ()>(()) }).await.unwrap_err();
    assert!(err.is_circuit_open());

    tokio::time::sleep(Duration::from_millis(100)).await;
    breaker.execute(|| async { Ok::<_, ()>(()) }).await.unwrap();
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[tokio::test]
async fn failed_probe_reopens_and_restarts_the_timer() {
    let breaker = CircuitBreaker::new(2, Duration::from_millis(50));
    trip(&breaker, 2).await;
    tokio::time::sleep(Duration::from_millis(70)).await;

    trip(&breaker, 1).await;
    assert_eq!(breaker.state(), CircuitState::Open);

    let err = breaker.execute(|| async { Ok::<_, ()>(()) }).await.unwrap_err();
    assert!(err.is_circuit_open());
}

#[tokio::test]
async fn transition_sequence_is_reported_in_order() {
    let transitions = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&transitions);
    let breaker = CircuitBreaker::builder()
        .max_failures(1)
        .reset_timeout(Duration::from_millis(20))
        .on_state_transition(move |from, to| sink.lock().push((from, to)))
        .build();

    trip(&breaker, 1).await;
    tokio::time::sleep(Duration::from_millis(40)).await;
    breaker.execute(|| async { Ok::<_, ()>(()) }).await.unwrap();

    assert_eq!(
        *transitions.lock(),
        vec![
            (CircuitState::Closed, CircuitState::Open),
            (CircuitState::Open, CircuitState::HalfOpen),
            (CircuitState::HalfOpen, CircuitState::Closed),
        ]
    );
}

#[tokio::test]
async fn every_caller_probes_by_default() {
    let breaker = CircuitBreaker::new(1, Duration::from_millis(10));
    trip(&breaker, 1).await;
    tokio::time::sleep(Duration::from_millis(30)).await;

    let slow = || async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok::<_, ()>(())
    };
    let (a, b, c) = tokio::join!(
        breaker.execute(slow),
        breaker.execute(slow),
        breaker.execute(slow)
    );
    assert!(a.is_ok() && b.is_ok() && c.is_ok());
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[tokio::test]
async fn probe_limit_rejects_extra_callers() {
    let breaker = CircuitBreaker::builder()
        .max_failures(1)
        .reset_timeout(Duration::from_millis(10))
        .permitted_calls_in_half_open(1)
        .build();
    trip(&breaker, 1).await;
    tokio::time::sleep(Duration::from_millis(30)).await;

    let slow = || async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok::<_, ()>(())
    };
    let (first, second) = tokio::join!(breaker.execute(slow), breaker.execute(slow));

    assert!(first.is_ok());
    assert!(second.unwrap_err().is_circuit_open());
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[tokio::test]
async fn dropping_a_call_from_an_earlier_half_open_period_keeps_the_limit() {
    let breaker = CircuitBreaker::builder()
        .max_failures(1)
        .reset_timeout(Duration::from_millis(10))
        .permitted_calls_in_half_open(1)
        .build();

    // Holds a half-open slot until the caller drops `release`.
    let hold = |breaker: &CircuitBreaker| {
        let breaker = breaker.clone();
        let (started_tx, started_rx) = tokio::sync::oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            breaker
                .execute(|| async move {
                    let _ = started_tx.send(());
                    std::future::pending::<()>().await;
                    Ok::<_, ()>(())
                })
                .await
        });
        (task, started_rx)
    };

    trip(&breaker, 1).await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    let (old_call, started) = hold(&breaker);
    started.await.unwrap();
    assert_eq!(breaker.state(), CircuitState::HalfOpen);

    breaker.reset();
    trip(&breaker, 1).await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    let (new_call, started) = hold(&breaker);
    started.await.unwrap();
    assert_eq!(breaker.state(), CircuitState::HalfOpen);

    old_call.abort();
    assert!(old_call.await.unwrap_err().is_cancelled());

    let err = breaker.execute(|| async { Ok::<_, ()>(()) }).await.unwrap_err();
    assert!(err.is_circuit_open());

    new_call.abort();
    let _ = new_call.await;
    breaker.execute(|| async { Ok::<_, ()>(()) }).await.unwrap();
    assert_eq!(breaker.state(), CircuitState::Closed);
}
