//! Relational entities for interaction signals and preference bookkeeping.
//! Vectors themselves live only in the vector index; these are the RelStore
//! rows that feed the preference-vector engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Impression,
    Click,
    GameTime,
    PlayStart,
    PlayEnd,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Impression => "impression",
            Self::Click => "click",
            Self::GameTime => "game_time",
            Self::PlayStart => "play_start",
            Self::PlayEnd => "play_end",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "impression" => Some(Self::Impression),
            "click" => Some(Self::Click),
            "game_time" => Some(Self::GameTime),
            "play_start" => Some(Self::PlayStart),
            "play_end" => Some(Self::PlayEnd),
            _ => None,
        }
    }
}

/// Append-only interaction signal. Never mutated once persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEvent {
    pub id: Uuid,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "gameSlug")]
    pub game_slug: String,
    #[serde(rename = "eventType")]
    pub event_type: EventType,
    #[serde(rename = "durationSeconds", skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// One rating per `(userId, gameSlug)`; upserts overwrite and bump `updatedAt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRating {
    pub id: Uuid,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "gameSlug")]
    pub game_slug: String,
    pub rating: i32,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// As `UserRating` plus optional free text and sentiment. Overrides the
/// rating for the same slug in the preference-vector engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserReview {
    pub id: Uuid,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "gameSlug")]
    pub game_slug: String,
    pub rating: i32,
    #[serde(rename = "reviewText", skip_serializing_if = "Option::is_none")]
    pub review_text: Option<String>,
    #[serde(rename = "sentimentScore", skip_serializing_if = "Option::is_none")]
    pub sentiment_score: Option<f32>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Lazily created on first vector recomputation for a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPreference {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "vectorUpdatedAt", skip_serializing_if = "Option::is_none")]
    pub vector_updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}
