//! Entities owned by the Chat Service: sessions, messages, and the
//! knowledge-base hierarchy (source → document → chunk).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VipLevel {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl VipLevel {
    pub fn rank(self) -> u8 {
        match self {
            Self::Bronze => 1,
            Self::Silver => 2,
            Self::Gold => 3,
            Self::Platinum => 4,
        }
    }

    pub fn capitalized(self) -> &'static str {
        match self {
            Self::Bronze => "Bronze",
            Self::Silver => "Silver",
            Self::Gold => "Gold",
            Self::Platinum => "Platinum",
        }
    }

    /// Every tier at or below `self`'s rank, in ascending order.
    pub fn accessible_tiers(self) -> Vec<VipLevel> {
        [Self::Bronze, Self::Silver, Self::Gold, Self::Platinum]
            .into_iter()
            .filter(|t| t.rank() <= self.rank())
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_page: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_game: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vip_level: Option<VipLevel>,
}

impl SessionContext {
    pub fn is_empty(&self) -> bool {
        self.current_page.is_none() && self.current_game.is_none() && self.vip_level.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct ChatSession {
    pub id: Uuid,
    pub user_id: Option<String>,
    pub context: Option<SessionContext>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    #[serde(rename = "documentId")]
    pub document_id: Uuid,
    pub source: String,
    pub excerpt: String,
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: Uuid,
    pub session_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub citations: Vec<Citation>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct KbSource {
    pub id: Uuid,
    pub name: String,
    pub source_type: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct KbDocument {
    pub id: Uuid,
    pub source_id: Uuid,
    pub title: String,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct KbChunk {
    pub id: Uuid,
    pub document_id: Uuid,
    pub chunk_index: i32,
    pub content: String,
    pub vector_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Projection returned from a retrieval search: a chunk plus whatever
/// game-metadata payload fields Qdrant had for it.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub content: String,
    pub source: String,
    pub document_id: Uuid,
    pub score: f32,
    pub theme: Option<String>,
    pub vip_level: Option<String>,
    pub rtp: Option<String>,
    pub volatility: Option<String>,
    pub game_type: Option<String>,
}
