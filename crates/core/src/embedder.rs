//! Text embedding and sentiment scoring against an Ollama-compatible
//! endpoint, shared by the chat and recommendation services.
//!
//! `embed` never fails observably: a transport error, non-2xx response, or
//! undecodable body all fall back to a zero vector of [`EMBEDDING_DIM`]
//! length, matching how every other dependency in this platform degrades
//! rather than aborts the caller.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Fixed dimension of every dense vector produced by this platform.
pub const EMBEDDING_DIM: usize = 768;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Vec<f32>;

    /// Returns `Err` when the endpoint is unreachable or its response can't
    /// be parsed as a number; callers treat sentiment as an optional
    /// multiplier and tolerate its absence.
    async fn analyze_sentiment(&self, text: &str) -> Result<f32, SentimentError>;
}

#[derive(Debug, thiserror::Error)]
#[error("sentiment analysis unavailable: {0}")]
pub struct SentimentError(pub String);

#[derive(Debug, Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

/// `Embedder` implementation backed by a local Ollama server.
pub struct OllamaEmbedder {
    http: Client,
    base_url: String,
    embedding_model: String,
    generation_model: String,
}

impl OllamaEmbedder {
    pub fn new(base_url: impl Into<String>, embedding_model: impl Into<String>, generation_model: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build embedder http client");

        Self {
            http,
            base_url: base_url.into(),
            embedding_model: embedding_model.into(),
            generation_model: generation_model.into(),
        }
    }

    fn zero_vector() -> Vec<f32> {
        vec![0.0; EMBEDDING_DIM]
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Vec<f32> {
        let url = format!("{}/api/embeddings", self.base_url);
        let body = OllamaEmbeddingRequest {
            model: &self.embedding_model,
            prompt: text,
        };

        let response = match self.http.post(&url).json(&body).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "embedding request failed, using zero vector");
                return Self::zero_vector();
            }
        };

        if !response.status().is_success() {
            warn!(status = %response.status(), "embedding endpoint returned non-2xx");
            return Self::zero_vector();
        }

        match response.json::<OllamaEmbeddingResponse>().await {
            Ok(parsed) if parsed.embedding.len() == EMBEDDING_DIM => parsed.embedding,
            Ok(parsed) => {
                warn!(len = parsed.embedding.len(), "embedding had unexpected dimension");
                Self::zero_vector()
            }
            Err(e) => {
                warn!(error = %e, "failed to decode embedding response");
                Self::zero_vector()
            }
        }
    }

    async fn analyze_sentiment(&self, text: &str) -> Result<f32, SentimentError> {
        let url = format!("{}/api/generate", self.base_url);
        let prompt = format!(
            "Rate the sentiment of the following text on a scale from -1.0 (very negative) \
             to 1.0 (very positive). Respond with only the number.\n\nText: {text}"
        );
        let body = OllamaGenerateRequest {
            model: &self.generation_model,
            prompt: &prompt,
            stream: false,
        };

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| SentimentError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SentimentError(format!("status {}", response.status())));
        }

        let parsed: OllamaGenerateResponse = response
            .json()
            .await
            .map_err(|e| SentimentError(e.to_string()))?;

        let score: f32 = parsed
            .response
            .trim()
            .parse()
            .map_err(|_| SentimentError(format!("non-numeric response: {}", parsed.response)))?;

        Ok(score.clamp(-1.0, 1.0))
    }
}
