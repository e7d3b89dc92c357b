//! # Casino Core
//!
//! Shared ambient stack for the casino recommendation and chat services:
//! configuration loading, the error taxonomy, the Postgres pool, retry
//! backoff, circuit breaking, structured logging, and graceful shutdown
//! coordination. No domain logic lives here — both `casino-vectorstore` and
//! the two service crates depend on this crate for these cross-cutting
//! concerns.
//!
//! ## Modules
//!
//! - `config`: environment-driven configuration for Postgres, Qdrant, Ollama
//! - `database`: shared PostgreSQL connection pool
//! - `embedder`: Ollama-backed text embedding and sentiment scoring
//! - `error`: the `CasinoError` taxonomy
//! - `observability`: structured logging initialization
//! - `resilience`: circuit breaker for optional collaborators
//! - `retry`: exponential backoff retry utility
//! - `shutdown`: graceful shutdown coordinator for detached background tasks

pub mod config;
pub mod database;
pub mod embedder;
pub mod error;
pub mod observability;
pub mod resilience;
pub mod retry;
pub mod shutdown;

pub use config::{ConfigLoader, DatabaseConfig, OllamaConfig, QdrantConfig, ServiceConfig};
pub use database::{DatabasePool, PoolStats};
pub use embedder::{Embedder, OllamaEmbedder, SentimentError, EMBEDDING_DIM};
pub use error::CasinoError;
pub use observability::{init_logging, LogConfig, LogFormat};
pub use resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitState};
pub use retry::{retry_with_backoff, RetryPolicy};
pub use shutdown::{ShutdownConfig, ShutdownCoordinator, ShutdownHandle};

/// Result type alias for casino platform operations.
pub type Result<T> = std::result::Result<T, CasinoError>;
