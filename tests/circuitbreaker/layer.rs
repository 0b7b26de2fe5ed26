use std::time::Duration;
use taskguard_circuitbreaker::{CircuitBreaker, CircuitState};
use tower::{Layer, ServiceBuilder, ServiceExt};

#[tokio::test]
async fn layer_shares_the_breaker_circuit() {
    let breaker = CircuitBreaker::new(2, Duration::from_secs(60));
    let service = ServiceBuilder::new()
        .layer(breaker.layer())
        .service_fn(|id: u32| async move {
            if id % 2 == 0 {
                Err(format!("user {id} not found"))
            } else {
                Ok(id)
            }
        });

    assert_eq!(service.clone().oneshot(1).await.unwrap(), 1);
    let err = service.clone().oneshot(2).await.unwrap_err();
    assert_eq!(err.into_inner(), Some("user 2 not found".to_string()));
    let _ = service.clone().oneshot(4).await;

    assert_eq!(breaker.state(), CircuitState::Open);
    assert!(service.clone().oneshot(3).await.unwrap_err().is_circuit_open());
}

#[tokio::test]
async fn direct_calls_trip_layered_services() {
    let breaker = CircuitBreaker::new(1, Duration::from_secs(60));
    let service = breaker
        .layer()
        .layer(tower::service_fn(|_: ()| async { Ok::<_, String>("pong") }));

    let _ = breaker.execute(|| async { Err::<(), _>("down") }).await;

    let err = service.oneshot(()).await.unwrap_err();
    assert!(err.is_circuit_open());
}
