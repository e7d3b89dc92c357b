//! Relational persistence for interaction signals (`user_events`,
//! `user_ratings`, `user_reviews`) and preference bookkeeping
//! (`user_preferences`). Events are append-only; ratings and reviews upsert
//! on `(user_id, game_slug)`. JSON metadata serializes absent values as SQL
//! `NULL` via `Option<serde_json::Value>`, matching the chat service's
//! repository.

use crate::models::{EventType, UserEvent, UserPreference, UserRating, UserReview};
use async_trait::async_trait;
use casino_core::CasinoError;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

#[async_trait]
pub trait RelStore: Send + Sync {
    async fn create_event(
        &self,
        user_id: &str,
        game_slug: &str,
        event_type: EventType,
        duration_seconds: Option<i32>,
        metadata: Option<HashMap<String, String>>,
    ) -> Result<UserEvent, CasinoError>;
    /// Events for `user_id` created within the last `lookback` window, most
    /// recent first.
    async fn recent_events(&self, user_id: &str, lookback: Duration) -> Result<Vec<UserEvent>, CasinoError>;

    async fn upsert_rating(&self, user_id: &str, game_slug: &str, rating: i32) -> Result<UserRating, CasinoError>;
    async fn user_ratings(&self, user_id: &str) -> Result<Vec<UserRating>, CasinoError>;

    async fn upsert_review(
        &self,
        user_id: &str,
        game_slug: &str,
        rating: i32,
        review_text: Option<String>,
        sentiment_score: Option<f32>,
    ) -> Result<UserReview, CasinoError>;
    async fn user_reviews(&self, user_id: &str) -> Result<Vec<UserReview>, CasinoError>;
    async fn game_reviews(&self, game_slug: &str, limit: i64) -> Result<Vec<UserReview>, CasinoError>;
    async fn user_review(&self, user_id: &str, game_slug: &str) -> Result<Option<UserReview>, CasinoError>;

    async fn get_or_create_preference(&self, user_id: &str) -> Result<UserPreference, CasinoError>;
    async fn update_preference_vector_time(&self, user_id: &str) -> Result<(), CasinoError>;
}

pub struct PostgresRelStore {
    pool: PgPool,
}

impl PostgresRelStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RelStore for PostgresRelStore {
    async fn create_event(
        &self,
        user_id: &str,
        game_slug: &str,
        event_type: EventType,
        duration_seconds: Option<i32>,
        metadata: Option<HashMap<String, String>>,
    ) -> Result<UserEvent, CasinoError> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let metadata_json = metadata
            .as_ref()
            .filter(|m| !m.is_empty())
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| CasinoError::persistence(format!("serialize event metadata: {e}")))?;

        sqlx::query(
            "INSERT INTO user_events (id, user_id, game_slug, event_type, duration_seconds, metadata, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(id)
        .bind(user_id)
        .bind(game_slug)
        .bind(event_type.as_str())
        .bind(duration_seconds)
        .bind(&metadata_json)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(UserEvent {
            id,
            user_id: user_id.to_string(),
            game_slug: game_slug.to_string(),
            event_type,
            duration_seconds,
            metadata,
            created_at: now,
        })
    }

    async fn recent_events(&self, user_id: &str, lookback: Duration) -> Result<Vec<UserEvent>, CasinoError> {
        let since = Utc::now() - lookback;
        let rows: Vec<(Uuid, String, String, String, Option<i32>, Option<serde_json::Value>, DateTime<Utc>)> =
            sqlx::query_as(
                "SELECT id, user_id, game_slug, event_type, duration_seconds, metadata, created_at
                 FROM user_events
                 WHERE user_id = $1 AND created_at >= $2
                 ORDER BY created_at DESC",
            )
            .bind(user_id)
            .bind(since)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(id, user_id, game_slug, event_type, duration_seconds, metadata_json, created_at)| {
                Some(UserEvent {
                    id,
                    user_id,
                    game_slug,
                    event_type: EventType::parse(&event_type)?,
                    duration_seconds,
                    metadata: metadata_json.and_then(|v| serde_json::from_value(v).ok()),
                    created_at,
                })
            })
            .collect())
    }

    async fn upsert_rating(&self, user_id: &str, game_slug: &str, rating: i32) -> Result<UserRating, CasinoError> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO user_ratings (id, user_id, game_slug, rating, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $5)
             ON CONFLICT (user_id, game_slug)
             DO UPDATE SET rating = $4, updated_at = $5",
        )
        .bind(id)
        .bind(user_id)
        .bind(game_slug)
        .bind(rating)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(UserRating {
            id,
            user_id: user_id.to_string(),
            game_slug: game_slug.to_string(),
            rating,
            created_at: now,
            updated_at: now,
        })
    }

    async fn user_ratings(&self, user_id: &str) -> Result<Vec<UserRating>, CasinoError> {
        let rows: Vec<(Uuid, String, String, i32, DateTime<Utc>, DateTime<Utc>)> = sqlx::query_as(
            "SELECT id, user_id, game_slug, rating, created_at, updated_at
             FROM user_ratings WHERE user_id = $1 ORDER BY updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, user_id, game_slug, rating, created_at, updated_at)| UserRating {
                id,
                user_id,
                game_slug,
                rating,
                created_at,
                updated_at,
            })
            .collect())
    }

    async fn upsert_review(
        &self,
        user_id: &str,
        game_slug: &str,
        rating: i32,
        review_text: Option<String>,
        sentiment_score: Option<f32>,
    ) -> Result<UserReview, CasinoError> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO user_reviews (id, user_id, game_slug, rating, review_text, sentiment_score, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
             ON CONFLICT (user_id, game_slug)
             DO UPDATE SET rating = $4, review_text = $5, sentiment_score = $6, updated_at = $7",
        )
        .bind(id)
        .bind(user_id)
        .bind(game_slug)
        .bind(rating)
        .bind(&review_text)
        .bind(sentiment_score)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(UserReview {
            id,
            user_id: user_id.to_string(),
            game_slug: game_slug.to_string(),
            rating,
            review_text,
            sentiment_score,
            created_at: now,
            updated_at: now,
        })
    }

    async fn user_reviews(&self, user_id: &str) -> Result<Vec<UserReview>, CasinoError> {
        let rows: Vec<(Uuid, String, String, i32, Option<String>, Option<f32>, DateTime<Utc>, DateTime<Utc>)> =
            sqlx::query_as(
                "SELECT id, user_id, game_slug, rating, review_text, sentiment_score, created_at, updated_at
                 FROM user_reviews WHERE user_id = $1 ORDER BY updated_at DESC",
            )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(row_to_review).collect())
    }

    async fn game_reviews(&self, game_slug: &str, limit: i64) -> Result<Vec<UserReview>, CasinoError> {
        let rows: Vec<(Uuid, String, String, i32, Option<String>, Option<f32>, DateTime<Utc>, DateTime<Utc>)> =
            sqlx::query_as(
                "SELECT id, user_id, game_slug, rating, review_text, sentiment_score, created_at, updated_at
                 FROM user_reviews WHERE game_slug = $1 ORDER BY created_at DESC LIMIT $2",
            )
            .bind(game_slug)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(row_to_review).collect())
    }

    async fn user_review(&self, user_id: &str, game_slug: &str) -> Result<Option<UserReview>, CasinoError> {
        let row: Option<(Uuid, String, String, i32, Option<String>, Option<f32>, DateTime<Utc>, DateTime<Utc>)> =
            sqlx::query_as(
                "SELECT id, user_id, game_slug, rating, review_text, sentiment_score, created_at, updated_at
                 FROM user_reviews WHERE user_id = $1 AND game_slug = $2",
            )
            .bind(user_id)
            .bind(game_slug)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(row_to_review))
    }

    async fn get_or_create_preference(&self, user_id: &str) -> Result<UserPreference, CasinoError> {
        let row: Option<(String, Option<DateTime<Utc>>, DateTime<Utc>, DateTime<Utc>)> = sqlx::query_as(
            "SELECT user_id, vector_updated_at, created_at, updated_at FROM user_preferences WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some((user_id, vector_updated_at, created_at, updated_at)) = row {
            return Ok(UserPreference {
                user_id,
                vector_updated_at,
                created_at,
                updated_at,
            });
        }

        let now = Utc::now();
        sqlx::query(
            "INSERT INTO user_preferences (user_id, created_at, updated_at) VALUES ($1, $2, $2)",
        )
        .bind(user_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(UserPreference {
            user_id: user_id.to_string(),
            vector_updated_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    async fn update_preference_vector_time(&self, user_id: &str) -> Result<(), CasinoError> {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO user_preferences (user_id, vector_updated_at, created_at, updated_at)
             VALUES ($1, $2, $2, $2)
             ON CONFLICT (user_id)
             DO UPDATE SET vector_updated_at = $2, updated_at = $2",
        )
        .bind(user_id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn row_to_review(
    row: (Uuid, String, String, i32, Option<String>, Option<f32>, DateTime<Utc>, DateTime<Utc>),
) -> UserReview {
    let (id, user_id, game_slug, rating, review_text, sentiment_score, created_at, updated_at) = row;
    UserReview {
        id,
        user_id,
        game_slug,
        rating,
        review_text,
        sentiment_score,
        created_at,
        updated_at,
    }
}
