use super::*;
use std::sync::Arc;
use std::time::Duration;

fn ok_call() -> impl std::future::Future<Output = Result<&'static str, &'static str>> {
    async { Ok("ok") }
}

fn err_call() -> impl std::future::Future<Output = Result<&'static str, &'static str>> {
    async { Err("boom") }
}

#[tokio::test]
async fn test_circuit_breaker_closed_state_allows_calls() {
    let breaker = CircuitBreaker::new("test", CircuitBreakerConfig::default());
    let result = breaker.call(ok_call()).await;
    assert_eq!(result.unwrap(), "ok");
    assert_eq!(breaker.state().await, CircuitState::Closed);
}

#[tokio::test]
async fn test_circuit_breaker_opens_after_threshold_failures() {
    let config = CircuitBreakerConfig {
        failure_threshold: 3,
        ..CircuitBreakerConfig::default()
    };
    let breaker = CircuitBreaker::new("test", config);

    for _ in 0..3 {
        let _ = breaker.call(err_call()).await;
    }

    assert_eq!(breaker.state().await, CircuitState::Open);
    assert_eq!(breaker.failure_count().await, 3);
}

#[tokio::test]
async fn test_circuit_breaker_rejects_when_open() {
    let config = CircuitBreakerConfig {
        failure_threshold: 1,
        timeout_duration: Duration::from_secs(60),
        ..CircuitBreakerConfig::default()
    };
    let breaker = CircuitBreaker::new("test", config);

    let _ = breaker.call(err_call()).await;
    assert_eq!(breaker.state().await, CircuitState::Open);

    let result = breaker.call(ok_call()).await;
    assert!(matches!(result, Err(CircuitBreakerError::CircuitOpen { .. })));
}

#[tokio::test]
async fn test_circuit_breaker_transitions_to_half_open() {
    let config = CircuitBreakerConfig {
        failure_threshold: 1,
        timeout_duration: Duration::from_millis(20),
        ..CircuitBreakerConfig::default()
    };
    let breaker = CircuitBreaker::new("test", config);

    let _ = breaker.call(err_call()).await;
    assert_eq!(breaker.state().await, CircuitState::Open);

    tokio::time::sleep(Duration::from_millis(30)).await;

    let result = breaker.call(ok_call()).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_circuit_breaker_closes_after_successful_recovery() {
    let config = CircuitBreakerConfig {
        failure_threshold: 1,
        success_threshold: 2,
        timeout_duration: Duration::from_millis(10),
        half_open_max_calls: 3,
    };
    let breaker = CircuitBreaker::new("test", config);

    let _ = breaker.call(err_call()).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    let _ = breaker.call(ok_call()).await;
    assert_eq!(breaker.state().await, CircuitState::HalfOpen);

    let _ = breaker.call(ok_call()).await;
    assert_eq!(breaker.state().await, CircuitState::Closed);
}

#[tokio::test]
async fn test_circuit_breaker_reopens_on_half_open_failure() {
    let config = CircuitBreakerConfig {
        failure_threshold: 1,
        success_threshold: 2,
        timeout_duration: Duration::from_millis(10),
        half_open_max_calls: 3,
    };
    let breaker = CircuitBreaker::new("test", config);

    let _ = breaker.call(err_call()).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    let result = breaker.call(err_call()).await;
    assert!(result.is_err());
    assert_eq!(breaker.state().await, CircuitState::Open);
}

#[tokio::test]
async fn test_circuit_breaker_limits_half_open_calls() {
    let config = CircuitBreakerConfig {
        failure_threshold: 1,
        success_threshold: 10,
        timeout_duration: Duration::from_millis(10),
        half_open_max_calls: 1,
    };
    let breaker = Arc::new(CircuitBreaker::new("test", config));

    let _ = breaker.call(err_call()).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    let b1 = breaker.clone();
    let b2 = breaker.clone();

    let slow_ok = || async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok::<_, &'static str>("ok")
    };

    let h1 = tokio::spawn(async move { b1.call(slow_ok()).await });
    tokio::time::sleep(Duration::from_millis(5)).await;
    let h2 = tokio::spawn(async move { b2.call(ok_call()).await });

    let r1 = h1.await.unwrap();
    let r2 = h2.await.unwrap();

    let rejected = matches!(r2, Err(CircuitBreakerError::TooManyCalls { .. }));
    assert!(r1.is_ok());
    assert!(rejected);
}

#[tokio::test]
async fn test_circuit_breaker_with_fallback_uses_fallback_when_open() {
    let config = CircuitBreakerConfig {
        failure_threshold: 1,
        timeout_duration: Duration::from_secs(60),
        ..CircuitBreakerConfig::default()
    };
    let breaker = CircuitBreaker::new("test", config);

    let _ = breaker.call(err_call()).await;
    assert_eq!(breaker.state().await, CircuitState::Open);

    let result = breaker
        .call_with_fallback(ok_call(), || "fallback")
        .await
        .unwrap();
    assert_eq!(result, "fallback");
}

#[tokio::test]
async fn test_circuit_breaker_with_fallback_uses_primary_when_closed() {
    let breaker = CircuitBreaker::new("test", CircuitBreakerConfig::default());

    let result = breaker
        .call_with_fallback(ok_call(), || "fallback")
        .await
        .unwrap();
    assert_eq!(result, "ok");
}

#[tokio::test]
async fn test_circuit_breaker_resets_failure_count_on_success_when_closed() {
    let config = CircuitBreakerConfig {
        failure_threshold: 5,
        ..CircuitBreakerConfig::default()
    };
    let breaker = CircuitBreaker::new("test", config);

    let _ = breaker.call(err_call()).await;
    let _ = breaker.call(err_call()).await;
    assert_eq!(breaker.failure_count().await, 2);

    let _ = breaker.call(ok_call()).await;
    assert_eq!(breaker.failure_count().await, 0);
}

#[tokio::test]
async fn test_circuit_breaker_reset() {
    let config = CircuitBreakerConfig {
        failure_threshold: 1,
        ..CircuitBreakerConfig::default()
    };
    let breaker = CircuitBreaker::new("test", config);

    let _ = breaker.call(err_call()).await;
    assert_eq!(breaker.state().await, CircuitState::Open);

    breaker.reset().await;
    assert_eq!(breaker.state().await, CircuitState::Closed);
    assert_eq!(breaker.failure_count().await, 0);
}

#[tokio::test]
async fn test_circuit_breaker_metrics() {
    let breaker = CircuitBreaker::new("ml-backend", CircuitBreakerConfig::default());
    let _ = breaker.call(err_call()).await;

    let metrics = breaker.metrics().await;
    assert_eq!(metrics.name, "ml-backend");
    assert_eq!(metrics.state, CircuitState::Closed);
    assert_eq!(metrics.failure_count, 1);
}

#[test]
fn test_circuit_breaker_config_presets() {
    let embedding = CircuitBreakerConfig::embedding_service();
    assert_eq!(embedding.failure_threshold, 5);
    assert_eq!(embedding.timeout_duration, Duration::from_secs(60));
    assert_eq!(embedding.half_open_max_calls, 3);

    let ml = CircuitBreakerConfig::ml_backend();
    assert_eq!(ml.failure_threshold, 5);
    assert_eq!(ml.timeout_duration, Duration::from_secs(30));
    assert_eq!(ml.half_open_max_calls, 3);
}

#[test]
fn test_circuit_state_display() {
    assert_eq!(CircuitState::Closed.to_string(), "Closed");
    assert_eq!(CircuitState::Open.to_string(), "Open");
    assert_eq!(CircuitState::HalfOpen.to_string(), "HalfOpen");
}
