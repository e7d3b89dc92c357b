//! Shared configuration loader for the casino platform services.
//!
//! Provides environment-variable driven, validated, defaulted configuration
//! structs. Both `casino-chat` and `casino-recommendation` load their
//! dependencies (Postgres, Qdrant, Ollama) through this module so the two
//! services agree on environment variable names and defaults.
//!
//! # Example
//!
//! ```no_run
//! use casino_core::config::{ConfigLoader, DatabaseConfig, QdrantConfig, ServiceConfig};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! casino_core::config::load_dotenv();
//!
//! let db = DatabaseConfig::from_env()?;
//! let qdrant = QdrantConfig::from_env()?;
//! let service = ServiceConfig::from_env(8081)?;
//!
//! db.validate()?;
//! qdrant.validate()?;
//! service.validate()?;
//! # Ok(())
//! # }
//! ```

use crate::error::CasinoError;
use std::time::Duration;
use url::Url;

/// Standardized environment-variable configuration loading.
pub trait ConfigLoader: Sized {
    fn from_env() -> Result<Self, CasinoError>;
    fn validate(&self) -> Result<(), CasinoError>;
}

/// PostgreSQL connection pool configuration.
///
/// # Environment Variables
///
/// - `POSTGRES_URL` (required, falls back to `DATABASE_URL`)
/// - `POSTGRES_MAX_CONNECTIONS` (default: 20)
/// - `POSTGRES_MIN_CONNECTIONS` (default: 2)
/// - `POSTGRES_CONNECT_TIMEOUT_SECS` (default: 30)
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/casino".to_string(),
            max_connections: 20,
            min_connections: 2,
            connect_timeout: Duration::from_secs(30),
        }
    }
}

impl ConfigLoader for DatabaseConfig {
    fn from_env() -> Result<Self, CasinoError> {
        let url = std::env::var("POSTGRES_URL")
            .or_else(|_| std::env::var("DATABASE_URL"))
            .map_err(|_| CasinoError::Configuration {
                message: "POSTGRES_URL (or DATABASE_URL) must be set".to_string(),
                key: Some("POSTGRES_URL".to_string()),
            })?;

        let max_connections =
            parse_env_var("POSTGRES_MAX_CONNECTIONS", DatabaseConfig::default().max_connections)?;
        let min_connections =
            parse_env_var("POSTGRES_MIN_CONNECTIONS", DatabaseConfig::default().min_connections)?;
        let connect_timeout_secs = parse_env_var("POSTGRES_CONNECT_TIMEOUT_SECS", 30u64)?;

        Ok(Self {
            url,
            max_connections,
            min_connections,
            connect_timeout: Duration::from_secs(connect_timeout_secs),
        })
    }

    fn validate(&self) -> Result<(), CasinoError> {
        Url::parse(&self.url).map_err(|e| CasinoError::Configuration {
            message: format!("invalid POSTGRES_URL: {e}"),
            key: Some("POSTGRES_URL".to_string()),
        })?;

        if self.max_connections == 0 {
            return Err(CasinoError::Configuration {
                message: "max_connections must be greater than 0".to_string(),
                key: Some("POSTGRES_MAX_CONNECTIONS".to_string()),
            });
        }
        if self.min_connections > self.max_connections {
            return Err(CasinoError::Configuration {
                message: format!(
                    "min_connections ({}) cannot exceed max_connections ({})",
                    self.min_connections, self.max_connections
                ),
                key: Some("POSTGRES_MIN_CONNECTIONS".to_string()),
            });
        }
        Ok(())
    }
}

/// Qdrant vector index connection configuration.
///
/// # Environment Variables
///
/// - `QDRANT_URL` (default: `http://localhost:6334`, the gRPC port per the
///   vector-index protocol)
#[derive(Debug, Clone)]
pub struct QdrantConfig {
    pub url: String,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".to_string(),
        }
    }
}

impl ConfigLoader for QdrantConfig {
    fn from_env() -> Result<Self, CasinoError> {
        let url = std::env::var("QDRANT_URL").unwrap_or_else(|_| QdrantConfig::default().url);
        Ok(Self { url })
    }

    fn validate(&self) -> Result<(), CasinoError> {
        Url::parse(&self.url).map_err(|e| CasinoError::Configuration {
            message: format!("invalid QDRANT_URL: {e}"),
            key: Some("QDRANT_URL".to_string()),
        })?;
        Ok(())
    }
}

/// Ollama-compatible embedding/generation endpoint configuration.
///
/// # Environment Variables
///
/// - `OLLAMA_URL` (default: `http://localhost:11434`)
/// - `OLLAMA_EMBEDDING_MODEL` (default: `nomic-embed-text`)
/// - `OLLAMA_GENERATION_MODEL` (default: `llama3.2:3b`)
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub url: String,
    pub embedding_model: String,
    pub generation_model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            generation_model: "llama3.2:3b".to_string(),
        }
    }
}

impl ConfigLoader for OllamaConfig {
    fn from_env() -> Result<Self, CasinoError> {
        let default = OllamaConfig::default();
        let url = std::env::var("OLLAMA_URL").unwrap_or(default.url);
        let embedding_model =
            std::env::var("OLLAMA_EMBEDDING_MODEL").unwrap_or(default.embedding_model);
        let generation_model =
            std::env::var("OLLAMA_GENERATION_MODEL").unwrap_or(default.generation_model);

        Ok(Self {
            url,
            embedding_model,
            generation_model,
        })
    }

    fn validate(&self) -> Result<(), CasinoError> {
        Url::parse(&self.url).map_err(|e| CasinoError::Configuration {
            message: format!("invalid OLLAMA_URL: {e}"),
            key: Some("OLLAMA_URL".to_string()),
        })?;
        if self.embedding_model.is_empty() || self.generation_model.is_empty() {
            return Err(CasinoError::Configuration {
                message: "embedding/generation model name cannot be empty".to_string(),
                key: Some("OLLAMA_EMBEDDING_MODEL".to_string()),
            });
        }
        Ok(())
    }
}

/// Per-service HTTP + collaborator configuration.
///
/// # Environment Variables
///
/// - `PORT` (default given by the caller — 8081 for chat, 8082 for
///   recommendation)
/// - `CMS_URL` (optional)
/// - `ML_URL` (optional — its presence enables the TGN/HGT/LightGCN
///   collaborative backends in the Hybrid Ranker)
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
    pub cms_url: Option<String>,
    pub ml_url: Option<String>,
}

impl ServiceConfig {
    pub fn from_env(default_port: u16) -> Result<Self, CasinoError> {
        let port = parse_env_var("PORT", default_port)?;
        let cms_url = std::env::var("CMS_URL").ok().filter(|s| !s.is_empty());
        let ml_url = std::env::var("ML_URL").ok().filter(|s| !s.is_empty());

        Ok(Self {
            port,
            cms_url,
            ml_url,
        })
    }

    pub fn validate(&self) -> Result<(), CasinoError> {
        if self.port == 0 {
            return Err(CasinoError::Configuration {
                message: "port must be greater than 0".to_string(),
                key: Some("PORT".to_string()),
            });
        }
        if let Some(url) = &self.cms_url {
            Url::parse(url).map_err(|e| CasinoError::Configuration {
                message: format!("invalid CMS_URL: {e}"),
                key: Some("CMS_URL".to_string()),
            })?;
        }
        if let Some(url) = &self.ml_url {
            Url::parse(url).map_err(|e| CasinoError::Configuration {
                message: format!("invalid ML_URL: {e}"),
                key: Some("ML_URL".to_string()),
            })?;
        }
        Ok(())
    }

    /// Whether the collaborative ML backends (TGN/HGT/LightGCN) should be attempted.
    pub fn ml_enabled(&self) -> bool {
        self.ml_url.is_some()
    }
}

fn parse_env_var<T>(key: &str, default: T) -> Result<T, CasinoError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    std::env::var(key)
        .ok()
        .map(|v| {
            v.parse::<T>().map_err(|e| CasinoError::Configuration {
                message: format!("failed to parse {key}: {e}"),
                key: Some(key.to_string()),
            })
        })
        .unwrap_or(Ok(default))
}

/// Load a `.env` file if present; silently ignores a missing file.
pub fn load_dotenv() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.to_string().contains("not found") {
            eprintln!("warning: failed to load .env file: {e}");
        }
    }
}
