//! Structured logging initialization shared by both service binaries.
//!
//! Logging fields follow a fixed convention across the workspace: `user_id`,
//! `session_id`, `collection` (vector-store collection name), and `backend`
//! (recommender backend name) are always passed as structured `tracing`
//! fields, never interpolated into the message string, so they remain
//! queryable when the log format is switched to JSON in production.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, for local development.
    Pretty,
    /// Single-line JSON, for production log aggregation.
    Json,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    /// `EnvFilter` directive string, e.g. `"casino_chat=debug,info"`.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: "info".to_string(),
        }
    }
}

impl LogConfig {
    pub fn from_env() -> Self {
        let format = match std::env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };
        let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        Self { format, filter }
    }
}

/// Initialize the global `tracing` subscriber. Call exactly once per
/// process, before any other `casino-core` or service code runs.
pub fn init_logging(config: &LogConfig) {
    let env_filter =
        EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.format {
        LogFormat::Json => {
            registry.with(fmt::layer().json()).init();
        }
        LogFormat::Pretty => {
            registry.with(fmt::layer().pretty()).init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_info_pretty() {
        let config = LogConfig::default();
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.filter, "info");
    }

    #[test]
    fn from_env_defaults_when_unset() {
        std::env::remove_var("LOG_FORMAT");
        std::env::remove_var("RUST_LOG");
        let config = LogConfig::from_env();
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.filter, "info");
    }

    #[test]
    fn from_env_reads_json_format() {
        std::env::set_var("LOG_FORMAT", "json");
        let config = LogConfig::from_env();
        assert_eq!(config.format, LogFormat::Json);
        std::env::remove_var("LOG_FORMAT");
    }
}
