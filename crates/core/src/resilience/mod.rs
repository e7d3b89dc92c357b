//! Circuit breaker for the optional collaborators (embedding service, ML
//! ranking backends) that the Hybrid Ranker and Embedder call into.

mod circuit_breaker;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitBreakerMetrics, CircuitState,
};

#[cfg(test)]
mod tests;
