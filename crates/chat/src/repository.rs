//! Relational persistence for chat sessions/messages and the knowledge-base
//! hierarchy. JSON columns serialize absent values as SQL `NULL`, never the
//! literal string `"null"` or an empty JSON object — `sqlx`'s
//! `Option<serde_json::Value>` binding already gets this right, so callers
//! only need to route through `Option` rather than defaulting to `Value::Null`.

use crate::models::{
    ChatMessage, ChatSession, Citation, KbChunk, KbDocument, KbSource, MessageRole, SessionContext,
};
use async_trait::async_trait;
use casino_core::CasinoError;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

pub const MAX_HISTORY_MESSAGES: i64 = 10;

#[async_trait]
pub trait ChatRepository: Send + Sync {
    async fn create_session(
        &self,
        user_id: Option<String>,
        context: Option<SessionContext>,
    ) -> Result<ChatSession, CasinoError>;
    async fn get_session(&self, id: Uuid) -> Result<Option<ChatSession>, CasinoError>;
    async fn touch_session(&self, id: Uuid) -> Result<(), CasinoError>;

    async fn create_message(
        &self,
        session_id: Uuid,
        role: MessageRole,
        content: &str,
        citations: Vec<Citation>,
    ) -> Result<ChatMessage, CasinoError>;
    /// Returns the most recent `limit` messages in ascending (chronological) order.
    async fn recent_messages(
        &self,
        session_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, CasinoError>;

    async fn create_kb_source(&self, name: &str, source_type: &str) -> Result<KbSource, CasinoError>;
    async fn find_kb_source_by_name(&self, name: &str) -> Result<Option<KbSource>, CasinoError>;

    async fn create_kb_document(
        &self,
        source_id: Uuid,
        title: &str,
        content_hash: &str,
    ) -> Result<KbDocument, CasinoError>;
    async fn find_kb_document_by_hash(&self, hash: &str) -> Result<Option<KbDocument>, CasinoError>;

    async fn create_kb_chunk(
        &self,
        document_id: Uuid,
        chunk_index: i32,
        content: &str,
        vector_id: Uuid,
    ) -> Result<KbChunk, CasinoError>;
    async fn count_kb_entities(&self) -> Result<(i64, i64, i64), CasinoError>;
}

pub struct PostgresChatRepository {
    pool: PgPool,
}

impl PostgresChatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_role(role: &str) -> MessageRole {
    match role {
        "assistant" => MessageRole::Assistant,
        _ => MessageRole::User,
    }
}

fn role_str(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
    }
}

#[async_trait]
impl ChatRepository for PostgresChatRepository {
    async fn create_session(
        &self,
        user_id: Option<String>,
        context: Option<SessionContext>,
    ) -> Result<ChatSession, CasinoError> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let context_json = context
            .as_ref()
            .filter(|c| !c.is_empty())
            .map(|c| serde_json::to_value(c))
            .transpose()
            .map_err(|e| CasinoError::persistence(format!("serialize session context: {e}")))?;

        sqlx::query(
            "INSERT INTO chat_sessions (id, user_id, context, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(&user_id)
        .bind(&context_json)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(ChatSession {
            id,
            user_id,
            context,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<ChatSession>, CasinoError> {
        let row: Option<(Uuid, Option<String>, Option<serde_json::Value>, chrono::DateTime<Utc>, chrono::DateTime<Utc>)> =
            sqlx::query_as(
                "SELECT id, user_id, context, created_at, updated_at FROM chat_sessions WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(id, user_id, context_json, created_at, updated_at)| ChatSession {
            id,
            user_id,
            context: context_json.and_then(|v| serde_json::from_value(v).ok()),
            created_at,
            updated_at,
        }))
    }

    async fn touch_session(&self, id: Uuid) -> Result<(), CasinoError> {
        sqlx::query("UPDATE chat_sessions SET updated_at = $1 WHERE id = $2")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_message(
        &self,
        session_id: Uuid,
        role: MessageRole,
        content: &str,
        citations: Vec<Citation>,
    ) -> Result<ChatMessage, CasinoError> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let citations_json = if citations.is_empty() {
            None
        } else {
            Some(
                serde_json::to_value(&citations)
                    .map_err(|e| CasinoError::persistence(format!("serialize citations: {e}")))?,
            )
        };

        sqlx::query(
            "INSERT INTO chat_messages (id, session_id, role, content, citations, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(id)
        .bind(session_id)
        .bind(role_str(role))
        .bind(content)
        .bind(&citations_json)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(ChatMessage {
            id,
            session_id,
            role,
            content: content.to_string(),
            citations,
            created_at: now,
        })
    }

    async fn recent_messages(
        &self,
        session_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, CasinoError> {
        let rows: Vec<(Uuid, Uuid, String, String, Option<serde_json::Value>, chrono::DateTime<Utc>)> =
            sqlx::query_as(
                "SELECT id, session_id, role, content, citations, created_at
                 FROM chat_messages
                 WHERE session_id = $1
                 ORDER BY created_at DESC
                 LIMIT $2",
            )
            .bind(session_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        let mut messages: Vec<ChatMessage> = rows
            .into_iter()
            .map(|(id, session_id, role, content, citations_json, created_at)| ChatMessage {
                id,
                session_id,
                role: row_role(&role),
                content,
                citations: citations_json
                    .and_then(|v| serde_json::from_value(v).ok())
                    .unwrap_or_default(),
                created_at,
            })
            .collect();

        messages.reverse();
        Ok(messages)
    }

    async fn create_kb_source(&self, name: &str, source_type: &str) -> Result<KbSource, CasinoError> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO kb_sources (id, name, source_type, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(id)
        .bind(name)
        .bind(source_type)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(KbSource {
            id,
            name: name.to_string(),
            source_type: source_type.to_string(),
            created_at: now,
        })
    }

    async fn find_kb_source_by_name(&self, name: &str) -> Result<Option<KbSource>, CasinoError> {
        let row: Option<(Uuid, String, String, chrono::DateTime<Utc>)> = sqlx::query_as(
            "SELECT id, name, source_type, created_at FROM kb_sources WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, name, source_type, created_at)| KbSource {
            id,
            name,
            source_type,
            created_at,
        }))
    }

    async fn create_kb_document(
        &self,
        source_id: Uuid,
        title: &str,
        content_hash: &str,
    ) -> Result<KbDocument, CasinoError> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO kb_documents (id, source_id, title, content_hash, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(id)
        .bind(source_id)
        .bind(title)
        .bind(content_hash)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(KbDocument {
            id,
            source_id,
            title: title.to_string(),
            content_hash: content_hash.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn find_kb_document_by_hash(&self, hash: &str) -> Result<Option<KbDocument>, CasinoError> {
        let row: Option<(Uuid, Uuid, String, String, chrono::DateTime<Utc>, chrono::DateTime<Utc>)> =
            sqlx::query_as(
                "SELECT id, source_id, title, content_hash, created_at, updated_at
                 FROM kb_documents WHERE content_hash = $1",
            )
            .bind(hash)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(id, source_id, title, content_hash, created_at, updated_at)| KbDocument {
            id,
            source_id,
            title,
            content_hash,
            created_at,
            updated_at,
        }))
    }

    async fn create_kb_chunk(
        &self,
        document_id: Uuid,
        chunk_index: i32,
        content: &str,
        vector_id: Uuid,
    ) -> Result<KbChunk, CasinoError> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO kb_chunks (id, document_id, chunk_index, content, vector_id, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(id)
        .bind(document_id)
        .bind(chunk_index)
        .bind(content)
        .bind(vector_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(KbChunk {
            id,
            document_id,
            chunk_index,
            content: content.to_string(),
            vector_id,
            created_at: now,
        })
    }

    async fn count_kb_entities(&self) -> Result<(i64, i64, i64), CasinoError> {
        let sources: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM kb_sources")
            .fetch_one(&self.pool)
            .await?;
        let documents: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM kb_documents")
            .fetch_one(&self.pool)
            .await?;
        let chunks: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM kb_chunks")
            .fetch_one(&self.pool)
            .await?;
        Ok((sources.0, documents.0, chunks.0))
    }
}
