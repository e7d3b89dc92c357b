//! Shared PostgreSQL connection pool for the casino platform services.

use crate::config::DatabaseConfig;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

/// Shared database connection pool.
#[derive(Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// Create a new pool from a validated [`DatabaseConfig`].
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "connecting to database"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .connect(&config.url)
            .await?;

        info!("database connection pool established");
        Ok(Self { pool })
    }

    /// Create a pool using `DatabaseConfig::from_env()` defaults.
    pub async fn from_env() -> Result<Self, crate::error::CasinoError> {
        use crate::config::ConfigLoader;
        let config = DatabaseConfig::from_env()?;
        config.validate()?;
        Self::new(&config)
            .await
            .map_err(|e| crate::error::CasinoError::persistence(e.to_string()))
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check whether the pool can still reach the database.
    pub async fn is_healthy(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }

    /// Current pool occupancy.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            size: self.pool.size(),
            idle: self.pool.num_idle(),
        }
    }
}

/// Pool occupancy snapshot.
#[derive(Debug, Clone)]
pub struct PoolStats {
    pub size: u32,
    pub idle: usize,
}
