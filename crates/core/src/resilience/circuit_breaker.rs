//! Circuit breaker implementation: Closed → Open → HalfOpen → Closed.
//!
//! Used by the Hybrid Ranker to wrap each ML backend call (TGN, HGT,
//! LightGCN) so a backend that is consistently failing or timing out is
//! skipped for a cooldown window instead of paying its deadline on every
//! request, and by the Embedder for the Ollama endpoint.

use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CircuitState::Closed => "Closed",
            CircuitState::Open => "Open",
            CircuitState::HalfOpen => "HalfOpen",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub timeout_duration: Duration,
    pub half_open_max_calls: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            timeout_duration: Duration::from_secs(30),
            half_open_max_calls: 3,
        }
    }
}

impl CircuitBreakerConfig {
    /// Ollama embedding/generation endpoint: longer cooldown tolerates a slow
    /// model reload.
    pub fn embedding_service() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            timeout_duration: Duration::from_secs(60),
            half_open_max_calls: 3,
        }
    }

    /// TGN/HGT/LightGCN collaborative backends, matching the Hybrid Ranker's
    /// 5-second per-call deadline with a 30-second cooldown.
    pub fn ml_backend() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            timeout_duration: Duration::from_secs(30),
            half_open_max_calls: 3,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    #[error("circuit '{name}' is open, retry after {retry_after_ms}ms")]
    CircuitOpen { name: String, retry_after_ms: u64 },

    #[error("circuit '{name}' rejected call: too many half-open probes in flight")]
    TooManyCalls { name: String },

    #[error(transparent)]
    Inner(E),
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerMetrics {
    pub name: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
}

struct Inner {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    half_open_in_flight: u32,
    opened_at: Option<Instant>,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            half_open_in_flight: 0,
            opened_at: None,
        }
    }
}

pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(name: &str, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.to_string(),
            config,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub async fn state(&self) -> CircuitState {
        self.inner.lock().await.state
    }

    pub async fn failure_count(&self) -> u32 {
        self.inner.lock().await.failure_count
    }

    pub async fn success_count(&self) -> u32 {
        self.inner.lock().await.success_count
    }

    pub async fn force_open(&self) {
        let mut guard = self.inner.lock().await;
        guard.state = CircuitState::Open;
        guard.opened_at = Some(Instant::now());
        warn!(circuit = %self.name, "circuit forced open");
    }

    pub async fn reset(&self) {
        let mut guard = self.inner.lock().await;
        *guard = Inner::default();
        info!(circuit = %self.name, "circuit reset to closed");
    }

    pub async fn metrics(&self) -> CircuitBreakerMetrics {
        let guard = self.inner.lock().await;
        CircuitBreakerMetrics {
            name: self.name.clone(),
            state: guard.state,
            failure_count: guard.failure_count,
            success_count: guard.success_count,
        }
    }

    /// Run `future` through the breaker. Rejects immediately without
    /// running it when the circuit is open or the half-open probe quota is
    /// exhausted.
    pub async fn call<Fut, T, E>(&self, future: Fut) -> Result<T, CircuitBreakerError<E>>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        let mut guard = self.inner.lock().await;

        if guard.state == CircuitState::Open {
            let elapsed = guard.opened_at.map(|t| t.elapsed()).unwrap_or_default();
            if elapsed >= self.config.timeout_duration {
                guard.state = CircuitState::HalfOpen;
                guard.success_count = 0;
                guard.half_open_in_flight = 0;
                info!(circuit = %self.name, "circuit half-open, probing");
            } else {
                let retry_after = self.config.timeout_duration.saturating_sub(elapsed);
                return Err(CircuitBreakerError::CircuitOpen {
                    name: self.name.clone(),
                    retry_after_ms: retry_after.as_millis() as u64,
                });
            }
        }

        let admitted_half_open = guard.state == CircuitState::HalfOpen;
        if admitted_half_open {
            if guard.half_open_in_flight >= self.config.half_open_max_calls {
                return Err(CircuitBreakerError::TooManyCalls {
                    name: self.name.clone(),
                });
            }
            guard.half_open_in_flight += 1;
        }
        drop(guard);

        let result = future.await;

        let mut guard = self.inner.lock().await;
        if admitted_half_open {
            guard.half_open_in_flight = guard.half_open_in_flight.saturating_sub(1);
        }
        match &result {
            Ok(_) => self.record_success(&mut guard),
            Err(_) => self.record_failure(&mut guard),
        }
        drop(guard);

        result.map_err(CircuitBreakerError::Inner)
    }

    /// Like [`call`](Self::call), but substitutes `fallback()` instead of
    /// returning an error when the breaker itself rejected the call (circuit
    /// open or half-open quota exhausted). An error from the inner future
    /// still propagates.
    pub async fn call_with_fallback<Fut, T, E>(
        &self,
        future: Fut,
        fallback: impl FnOnce() -> T,
    ) -> Result<T, CircuitBreakerError<E>>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        match self.call(future).await {
            Ok(value) => Ok(value),
            Err(CircuitBreakerError::CircuitOpen { .. })
            | Err(CircuitBreakerError::TooManyCalls { .. }) => Ok(fallback()),
            Err(err @ CircuitBreakerError::Inner(_)) => Err(err),
        }
    }

    fn record_success(&self, guard: &mut Inner) {
        match guard.state {
            CircuitState::Closed => {
                guard.failure_count = 0;
            }
            CircuitState::HalfOpen => {
                guard.success_count += 1;
                if guard.success_count >= self.config.success_threshold {
                    guard.state = CircuitState::Closed;
                    guard.failure_count = 0;
                    guard.success_count = 0;
                    guard.half_open_in_flight = 0;
                    info!(circuit = %self.name, "circuit closed after recovery");
                }
            }
            CircuitState::Open => {}
        }
    }

    fn record_failure(&self, guard: &mut Inner) {
        match guard.state {
            CircuitState::Closed => {
                guard.failure_count += 1;
                if guard.failure_count >= self.config.failure_threshold {
                    guard.state = CircuitState::Open;
                    guard.opened_at = Some(Instant::now());
                    warn!(circuit = %self.name, failures = guard.failure_count, "circuit opened");
                }
            }
            CircuitState::HalfOpen => {
                guard.state = CircuitState::Open;
                guard.opened_at = Some(Instant::now());
                guard.success_count = 0;
                guard.half_open_in_flight = 0;
                warn!(circuit = %self.name, "circuit reopened after half-open failure");
            }
            CircuitState::Open => {}
        }
    }
}
