//! Preference-vector engine: folds a user's recent events, ratings, and
//! reviews into decayed per-game weights, then accumulates a weighted-mean
//! embedding across the surviving games. Grounded on
//! `RecommendationService.UpdateUserVector`/`calculateGameWeights`/
//! `calculateUserVector` from the original Go service; this PoC variant
//! embeds the raw game slug string rather than fetching a precomputed game
//! vector (see DESIGN.md for the production alternative).

use casino_core::Embedder;
use casino_vectorstore::{VectorStore, USERS_COLLECTION};
use chrono::{DateTime, Duration, Utc};
use ndarray::Array1;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

use crate::models::{EventType, UserEvent, UserRating, UserReview};
use crate::repository::RelStore;

const EVENTS_LOOKBACK_DAYS: i64 = 30;
const BEHAVIOR_HALF_LIFE_DAYS: f64 = 7.0;
const RATING_HALF_LIFE_DAYS: f64 = 90.0;

fn event_weight(event: &UserEvent) -> f64 {
    match event.event_type {
        EventType::Impression => 0.2,
        EventType::Click => 1.0,
        EventType::PlayStart => 2.0,
        EventType::PlayEnd | EventType::GameTime => {
            let duration = event.duration_seconds.unwrap_or(0).max(0) as f64;
            2.0 + (1.0 + duration).ln()
        }
    }
}

/// Linear interpolation from rating 1 (-6) to rating 5 (+8).
fn rating_weight(rating: i32) -> f64 {
    -6.0 + 3.5 * (rating as f64 - 1.0)
}

fn decay_factor(now: DateTime<Utc>, timestamp: DateTime<Utc>, half_life_days: f64) -> f64 {
    let days_since = (now - timestamp).num_seconds() as f64 / 86_400.0;
    0.5_f64.powf(days_since / half_life_days)
}

fn calculate_game_weights(
    events: &[UserEvent],
    ratings: &[UserRating],
    reviews: &[UserReview],
    now: DateTime<Utc>,
) -> HashMap<String, f64> {
    let mut weights: HashMap<String, f64> = HashMap::new();

    for event in events {
        let decayed = event_weight(event) * decay_factor(now, event.created_at, BEHAVIOR_HALF_LIFE_DAYS);
        *weights.entry(event.game_slug.clone()).or_insert(0.0) += decayed;
    }

    let reviewed_slugs: HashSet<&str> = reviews.iter().map(|r| r.game_slug.as_str()).collect();

    for rating in ratings {
        if reviewed_slugs.contains(rating.game_slug.as_str()) {
            continue;
        }
        let decayed = rating_weight(rating.rating) * decay_factor(now, rating.updated_at, RATING_HALF_LIFE_DAYS);
        *weights.entry(rating.game_slug.clone()).or_insert(0.0) += decayed;
    }

    for review in reviews {
        let mut weight = rating_weight(review.rating);
        if let Some(sentiment) = review.sentiment_score {
            weight *= 1.0 + 0.5 * sentiment as f64;
        }
        weight *= decay_factor(now, review.updated_at, RATING_HALF_LIFE_DAYS);
        *weights.entry(review.game_slug.clone()).or_insert(0.0) += weight;
    }

    weights
}

pub struct PreferenceVectorEngine {
    rel_store: Arc<dyn RelStore>,
    vector_store: Arc<VectorStore>,
    embedder: Arc<dyn Embedder>,
}

impl PreferenceVectorEngine {
    pub fn new(
        rel_store: Arc<dyn RelStore>,
        vector_store: Arc<VectorStore>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            rel_store,
            vector_store,
            embedder,
        }
    }

    /// Recomputes and persists the user's preference vector. A no-op (not an
    /// error) when there is no surviving positive-weight signal.
    pub async fn update_user_vector(&self, user_id: &str) -> Result<(), casino_core::CasinoError> {
        let events = self
            .rel_store
            .recent_events(user_id, Duration::days(EVENTS_LOOKBACK_DAYS))
            .await?;
        let ratings = self.rel_store.user_ratings(user_id).await?;
        let reviews = self.rel_store.user_reviews(user_id).await?;

        if events.is_empty() && ratings.is_empty() && reviews.is_empty() {
            debug!(user_id, "no interaction signal, skipping vector update");
            return Ok(());
        }

        let weights = calculate_game_weights(&events, &ratings, &reviews, Utc::now());
        if weights.is_empty() {
            return Ok(());
        }

        let Some(vector) = self.calculate_user_vector(&weights).await else {
            debug!(user_id, "no surviving positive-weight signal, skipping vector update");
            return Ok(());
        };

        self.vector_store
            .upsert_point(USERS_COLLECTION, user_id, vector, HashMap::new())
            .await;
        self.rel_store.update_preference_vector_time(user_id).await?;

        info!(user_id, "updated preference vector");
        Ok(())
    }

    /// Weighted mean over surviving (positive-weight) game slugs, embedding
    /// each slug directly. No final normalization: the result's norm is
    /// bounded by the largest contributing game embedding's norm.
    async fn calculate_user_vector(&self, weights: &HashMap<String, f64>) -> Option<Vec<f32>> {
        let mut weighted_sum: Option<Array1<f64>> = None;
        let mut total_weight = 0.0_f64;

        for (slug, &weight) in weights {
            if weight <= 0.0 {
                continue;
            }

            let embedding = self.embedder.embed(slug).await;
            let embedding = Array1::from_iter(embedding.into_iter().map(|v| v as f64));

            let accumulator = weighted_sum.get_or_insert_with(|| Array1::zeros(embedding.len()));
            *accumulator += &(embedding * weight);
            total_weight += weight;
        }

        let accumulator = weighted_sum?;
        if total_weight == 0.0 {
            return None;
        }

        Some((accumulator / total_weight).iter().map(|&v| v as f32).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(event_type: EventType, days_ago: i64, duration: Option<i32>) -> UserEvent {
        UserEvent {
            id: uuid::Uuid::new_v4(),
            user_id: "u1".to_string(),
            game_slug: "alpha".to_string(),
            event_type,
            duration_seconds: duration,
            metadata: None,
            created_at: Utc::now() - Duration::days(days_ago),
        }
    }

    #[test]
    fn rating_weight_interpolates_linearly() {
        assert_eq!(rating_weight(1), -6.0);
        assert_eq!(rating_weight(5), 8.0);
        assert!((rating_weight(3) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn play_end_weight_grows_with_duration() {
        let short = event(EventType::PlayEnd, 0, Some(10));
        let long = event(EventType::PlayEnd, 0, Some(600));
        assert!(event_weight(&long) > event_weight(&short));
    }

    #[test]
    fn game_time_is_treated_as_play_end() {
        let game_time = event(EventType::GameTime, 0, Some(120));
        let play_end = event(EventType::PlayEnd, 0, Some(120));
        assert_eq!(event_weight(&game_time), event_weight(&play_end));
    }

    #[test]
    fn decay_factor_halves_at_the_half_life() {
        let now = Utc::now();
        let seven_days_ago = now - Duration::days(7);
        let factor = decay_factor(now, seven_days_ago, BEHAVIOR_HALF_LIFE_DAYS);
        assert!((factor - 0.5).abs() < 1e-6);
    }

    #[test]
    fn reviews_override_ratings_for_the_same_slug() {
        let now = Utc::now();
        let ratings = vec![UserRating {
            id: uuid::Uuid::new_v4(),
            user_id: "u1".to_string(),
            game_slug: "beta".to_string(),
            rating: 5,
            created_at: now,
            updated_at: now,
        }];
        let reviews = vec![UserReview {
            id: uuid::Uuid::new_v4(),
            user_id: "u1".to_string(),
            game_slug: "beta".to_string(),
            rating: 1,
            review_text: Some("disappointing".to_string()),
            sentiment_score: Some(-0.8),
            created_at: now,
            updated_at: now,
        }];

        let weights = calculate_game_weights(&[], &ratings, &reviews, now);
        // rating(5)=+8 would be discarded; review(rating=1, sentiment=-0.8)
        // yields a net-negative weight that excludes "beta" from the sum.
        assert!(weights["beta"] < 0.0);
    }

    #[test]
    fn three_clicks_accumulate_additively() {
        let now = Utc::now();
        let events: Vec<UserEvent> = (0..3).map(|_| event(EventType::Click, 0, None)).collect();
        let weights = calculate_game_weights(&events, &[], &[], now);
        assert!((weights["alpha"] - 3.0).abs() < 1e-6);
    }
}
