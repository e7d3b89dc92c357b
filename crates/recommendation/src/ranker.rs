//! Hybrid ranker: cascades through optional ML backends before falling back
//! to content similarity, and a second always-blend entry point that mixes
//! content and collaborative scores. Grounded on
//! `RecommendationService.GetRecommendations`/`SearchSimilarGames` for the
//! content path; the TGN/HGT/LightGCN cascade and blend formula are carried
//! over from the distilled design (the captured Go service predates the ML
//! backends and only implements the content fallback).

use async_trait::async_trait;
use casino_core::resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError};
use casino_core::CasinoError;
use casino_vectorstore::{SearchFilter, VectorStore, VipLevel, GAMES_COLLECTION, USERS_COLLECTION};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

const BACKEND_DEADLINE: Duration = Duration::from_secs(5);
const CONTENT_WEIGHT: f32 = 0.4;
const COLLABORATIVE_WEIGHT: f32 = 0.6;

#[derive(Debug, Deserialize)]
struct MlRecommendation {
    slug: String,
    #[serde(default)]
    score: f32,
}

#[derive(Debug, Deserialize)]
struct MlRecommendResponse {
    #[serde(default)]
    recommendations: Vec<MlRecommendation>,
}

/// A single collaborative/session-aware backend reached over HTTP, guarded
/// by its own circuit breaker.
struct MlBackend {
    name: &'static str,
    endpoint: String,
    http: Client,
    breaker: CircuitBreaker,
}

impl MlBackend {
    fn new(name: &'static str, ml_url: &str) -> Self {
        Self {
            name,
            endpoint: format!("{}/{}/recommend", ml_url.trim_end_matches('/'), name.to_lowercase()),
            http: Client::new(),
            breaker: CircuitBreaker::new(name, CircuitBreakerConfig::ml_backend()),
        }
    }

    async fn fetch(
        &self,
        user_id: &str,
        placement: Option<&str>,
        limit: usize,
        vip_level: Option<VipLevel>,
    ) -> Result<Vec<MlRecommendation>, CasinoError> {
        let call = async {
            let mut request = self.http.post(&self.endpoint).json(&serde_json::json!({
                "userId": user_id,
                "placement": placement,
                "limit": limit,
                "vipLevel": vip_level.map(vip_level_str),
            }));
            request = request.timeout(BACKEND_DEADLINE);

            let response = request
                .send()
                .await
                .map_err(|e| CasinoError::dependency_degraded(self.name, e.to_string()))?;

            if !response.status().is_success() {
                return Err(CasinoError::dependency_degraded(
                    self.name,
                    format!("status {}", response.status()),
                ));
            }

            response
                .json::<MlRecommendResponse>()
                .await
                .map(|body| body.recommendations)
                .map_err(|e| CasinoError::dependency_degraded(self.name, e.to_string()))
        };

        match timeout(BACKEND_DEADLINE, self.breaker.call(call)).await {
            Ok(Ok(recommendations)) => Ok(recommendations),
            Ok(Err(CircuitBreakerError::Inner(e))) => Err(e),
            Ok(Err(other)) => Err(CasinoError::dependency_degraded(self.name, other.to_string())),
            Err(_) => Err(CasinoError::dependency_degraded(self.name, "deadline exceeded")),
        }
    }
}

#[async_trait]
trait Recommender: Send + Sync {
    fn name(&self) -> &'static str;
    async fn recommend(
        &self,
        user_id: &str,
        placement: Option<&str>,
        limit: usize,
        vip_level: Option<VipLevel>,
    ) -> Result<Vec<String>, CasinoError>;
}

#[async_trait]
impl Recommender for MlBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn recommend(
        &self,
        user_id: &str,
        placement: Option<&str>,
        limit: usize,
        vip_level: Option<VipLevel>,
    ) -> Result<Vec<String>, CasinoError> {
        let recommendations = self.fetch(user_id, placement, limit, vip_level).await?;
        Ok(recommendations.into_iter().map(|r| r.slug).take(limit).collect())
    }
}

pub struct HybridRanker {
    tgn: Option<MlBackend>,
    hgt: Option<MlBackend>,
    light_gcn: Option<MlBackend>,
    vector_store: Arc<VectorStore>,
}

impl HybridRanker {
    pub fn new(ml_url: Option<&str>, vector_store: Arc<VectorStore>) -> Self {
        let backends = ml_url.map(|url| {
            (
                MlBackend::new("tgn", url),
                MlBackend::new("hgt", url),
                MlBackend::new("lightgcn", url),
            )
        });

        let (tgn, hgt, light_gcn) = match backends {
            Some((tgn, hgt, light_gcn)) => (Some(tgn), Some(hgt), Some(light_gcn)),
            None => (None, None, None),
        };

        Self {
            tgn,
            hgt,
            light_gcn,
            vector_store,
        }
    }

    /// Cascades TGN → HGT → LightGCN → content, returning the first
    /// backend's results (truncated to `limit`) that yields at least one.
    pub async fn get_recommendations(
        &self,
        user_id: &str,
        placement: Option<&str>,
        limit: usize,
        vip_level: Option<VipLevel>,
    ) -> Result<Vec<String>, CasinoError> {
        for backend in [&self.tgn, &self.hgt, &self.light_gcn] {
            let Some(backend) = backend else { continue };
            match backend.recommend(user_id, placement, limit, vip_level).await {
                Ok(slugs) if !slugs.is_empty() => return Ok(dedupe(slugs, limit)),
                Ok(_) => {}
                Err(e) => warn!(backend = backend.name(), error = %e, "ml backend unavailable, falling through"),
            }
        }

        self.content_recommendations(user_id, limit, vip_level).await
    }

    async fn content_recommendations(
        &self,
        user_id: &str,
        limit: usize,
        vip_level: Option<VipLevel>,
    ) -> Result<Vec<String>, CasinoError> {
        let Some(user_vector) = self.vector_store.get_vector(USERS_COLLECTION, user_id).await else {
            // No user vector yet: one cold-start retry against HGT before
            // giving up with an empty list.
            if let Some(hgt) = &self.hgt {
                if let Ok(slugs) = hgt.recommend(user_id, None, limit, vip_level).await {
                    if !slugs.is_empty() {
                        return Ok(dedupe(slugs, limit));
                    }
                }
            }
            return Ok(Vec::new());
        };

        let filter = vip_level.map(|caller_vip_level| SearchFilter { caller_vip_level: Some(caller_vip_level) });
        let results = self
            .vector_store
            .search(GAMES_COLLECTION, &user_vector, limit, filter)
            .await;

        Ok(dedupe(
            results.into_iter().filter_map(|p| p.payload.get("slug").cloned()).collect(),
            limit,
        ))
    }

    /// Always blends content (weight 0.4) and collaborative (weight 0.6)
    /// scores, regardless of whether TGN/HGT are enabled.
    pub async fn get_hybrid_recommendations(
        &self,
        user_id: &str,
        limit: usize,
        vip_level: Option<VipLevel>,
    ) -> Result<Vec<String>, CasinoError> {
        let requested = limit * 2;
        let mut scores: HashMap<String, f32> = HashMap::new();

        if let Some(user_vector) = self.vector_store.get_vector(USERS_COLLECTION, user_id).await {
            let filter = vip_level.map(|caller_vip_level| SearchFilter { caller_vip_level: Some(caller_vip_level) });
            let content = self
                .vector_store
                .search(GAMES_COLLECTION, &user_vector, requested, filter)
                .await;
            let n = content.len() as f32;
            for (i, point) in content.into_iter().enumerate() {
                if let Some(slug) = point.payload.get("slug") {
                    let position_score = (n - i as f32) / n;
                    *scores.entry(slug.clone()).or_insert(0.0) += CONTENT_WEIGHT * position_score;
                }
            }
        }

        if let Some(light_gcn) = &self.light_gcn {
            if let Ok(recommendations) = light_gcn.fetch(user_id, None, requested, vip_level).await {
                let max_score = recommendations.iter().map(|r| r.score).fold(0.0_f32, f32::max);
                if max_score > 0.0 {
                    for r in recommendations {
                        let normalized = r.score / max_score;
                        *scores.entry(r.slug).or_insert(0.0) += COLLABORATIVE_WEIGHT * normalized;
                    }
                }
            }
        }

        let mut ranked: Vec<(String, f32)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        Ok(ranked.into_iter().take(limit).map(|(slug, _)| slug).collect())
    }
}

fn dedupe(slugs: Vec<String>, limit: usize) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    slugs
        .into_iter()
        .filter(|s| seen.insert(s.clone()))
        .take(limit)
        .collect()
}

fn vip_level_str(level: VipLevel) -> &'static str {
    match level {
        VipLevel::Bronze => "bronze",
        VipLevel::Silver => "silver",
        VipLevel::Gold => "gold",
        VipLevel::Platinum => "platinum",
    }
}
