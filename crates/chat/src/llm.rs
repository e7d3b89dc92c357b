//! Generation endpoint client. On any failure the orchestrator falls back
//! to a keyword-matched canned response rather than surfacing an error —
//! LLM outages degrade the conversation, they don't abort it.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[async_trait]
pub trait Llm: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Debug, thiserror::Error)]
#[error("llm generation failed: {0}")]
pub struct LlmError(pub String);

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

pub struct OllamaLlm {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaLlm {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build llm http client");

        Self {
            http,
            base_url: base_url.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl Llm for OllamaLlm {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = OllamaGenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LlmError(format!("status {}", response.status())));
        }

        let parsed: OllamaGenerateResponse = response
            .json()
            .await
            .map_err(|e| LlmError(e.to_string()))?;

        Ok(parsed.response)
    }
}

/// Keyword-matched canned response, used when the generation endpoint is
/// unreachable or returns a non-2xx/undecodable response.
pub fn fallback_response(prompt: &str) -> String {
    let lower = prompt.to_lowercase();

    if lower.contains("slot") || lower.contains("game") {
        return "I'd be happy to help you with information about our casino games! We have a \
                wide variety of slots, table games, and live casino options. You can browse our \
                game categories or use the search feature to find specific games. Is there a \
                particular type of game you're interested in?"
            .to_string();
    }

    if lower.contains("bonus") || lower.contains("promotion") {
        return "We have exciting promotions available! Check out our Promotions page for \
                current offers including welcome bonuses, free spins, and cashback rewards. Is \
                there a specific type of bonus you're looking for?"
            .to_string();
    }

    if lower.contains("rtp") {
        return "RTP stands for Return to Player, which represents the theoretical percentage \
                of wagered money that a slot machine or game will pay back to players over \
                time. For example, a game with 96% RTP means that for every $100 wagered, it \
                theoretically returns $96 to players. Higher RTP generally means better odds \
                for players."
            .to_string();
    }

    if lower.contains("help") {
        return "I'm here to help! I can assist you with:\n- Finding games\n- Understanding \
                game rules\n- Information about promotions\n- General casino questions\n\nWhat \
                would you like to know?"
            .to_string();
    }

    "Thank you for your question! I'm here to help you with anything related to our casino \
     games, promotions, and services. Could you please provide more details about what you'd \
     like to know?"
        .to_string()
}

/// Logged when a generation call degrades to the fallback, so the
/// degradation is visible without the caller needing to inspect the error.
pub fn log_degraded(error: &LlmError) {
    warn!(error = %error.0, "llm generation degraded to fallback response");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_covers_game_keyword() {
        assert!(fallback_response("tell me about your slots").contains("casino games"));
    }

    #[test]
    fn fallback_covers_bonus_keyword() {
        assert!(fallback_response("any promotion today?").contains("Promotions"));
    }

    #[test]
    fn fallback_covers_rtp_keyword() {
        assert!(fallback_response("what is RTP").contains("Return to Player"));
    }

    #[test]
    fn fallback_covers_help_keyword() {
        assert!(fallback_response("help me please").contains("I'm here to help"));
    }

    #[test]
    fn fallback_is_generic_otherwise() {
        assert!(fallback_response("what time is it").contains("Thank you for your question"));
    }

    #[tokio::test]
    async fn generate_against_unreachable_host_errs() {
        let llm = OllamaLlm::new("http://127.0.0.1:1", "llama3.2:3b");
        assert!(llm.generate("hi").await.is_err());
    }
}
