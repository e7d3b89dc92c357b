//! Shared error taxonomy for the casino platform services.
//!
//! The variants mirror the contract both services must honor at their HTTP
//! boundary: `Validation` and `NotFound` are client-facing failures,
//! `Persistence` is the only variant worth retrying, and
//! `DependencyDegraded`/`LlmDegraded` are constructed internally but never
//! propagated past a collaborator boundary — callers catch them and
//! substitute a degraded value rather than fail the request.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CasinoError {
    /// Malformed or out-of-range caller input. Maps to HTTP 400.
    #[error("validation failed: {message}")]
    Validation { message: String },

    /// The referenced entity does not exist. Maps to HTTP 404.
    #[error("not found: {message}")]
    NotFound { message: String },

    /// An optional collaborator (vector index, embedding service, ML
    /// backend) failed or timed out. Never surfaced to an HTTP caller;
    /// the call site substitutes an empty/zero-vector/fallback result.
    #[error("dependency degraded ({dependency}): {message}")]
    DependencyDegraded { dependency: String, message: String },

    /// The LLM endpoint failed or timed out; a canned fallback response is
    /// substituted instead of failing the request.
    #[error("llm degraded: {message}")]
    LlmDegraded { message: String },

    /// A required relational-store write or read failed. Maps to HTTP 500;
    /// the request is aborted.
    #[error("persistence error: {message}")]
    Persistence { message: String },

    /// A detached background task (e.g. user-vector recomputation) failed.
    /// Logged and dropped; never retried, never surfaced to any caller.
    #[error("background task failed: {message}")]
    BackgroundSoftFail { message: String },

    /// Configuration could not be loaded or failed validation.
    #[error("configuration error: {message}")]
    Configuration {
        message: String,
        key: Option<String>,
    },
}

impl CasinoError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn dependency_degraded(dependency: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DependencyDegraded {
            dependency: dependency.into(),
            message: message.into(),
        }
    }

    pub fn llm_degraded(message: impl Into<String>) -> Self {
        Self::LlmDegraded {
            message: message.into(),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    pub fn background_soft_fail(message: impl Into<String>) -> Self {
        Self::BackgroundSoftFail {
            message: message.into(),
        }
    }

    /// True for variants that a caller is expected to recover from rather
    /// than treat as a request failure.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::DependencyDegraded { .. } | Self::LlmDegraded { .. }
        )
    }

    /// The HTTP status code a thin web layer should map this variant to.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::NotFound { .. } => 404,
            Self::Configuration { .. } => 500,
            Self::Persistence { .. } => 500,
            Self::DependencyDegraded { .. } | Self::LlmDegraded { .. } => 200,
            Self::BackgroundSoftFail { .. } => 500,
        }
    }
}

impl From<sqlx::Error> for CasinoError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound {
                message: "row not found".to_string(),
            },
            other => Self::Persistence {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(CasinoError::validation("x").status_code(), 400);
        assert_eq!(CasinoError::not_found("x").status_code(), 404);
        assert_eq!(CasinoError::persistence("x").status_code(), 500);
    }

    #[test]
    fn degraded_variants_are_recoverable() {
        assert!(CasinoError::dependency_degraded("qdrant", "timeout").is_recoverable());
        assert!(CasinoError::llm_degraded("timeout").is_recoverable());
        assert!(!CasinoError::persistence("write failed").is_recoverable());
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err: CasinoError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, CasinoError::NotFound { .. }));
    }
}
