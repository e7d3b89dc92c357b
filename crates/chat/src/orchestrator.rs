//! Drives a single chat turn end-to-end. Steps 1, 2, 3, and 8 (session
//! load, user-message persistence, history fetch, assistant-message
//! persistence) are hard failures that abort the request. Steps 4-7
//! (RAG query construction, retrieval, prompt composition, generation)
//! degrade gracefully instead: a retrieval or generation failure still
//! produces a response, just a less-informed one.

use crate::llm::{fallback_response, log_degraded, Llm};
use crate::models::{Citation, MessageRole};
use crate::prompt::PromptComposer;
use crate::repository::{ChatRepository, MAX_HISTORY_MESSAGES};
use crate::retriever::Retriever;
use casino_core::CasinoError;
use std::sync::Arc;
use uuid::Uuid;

pub const MAX_CONTEXT_CHUNKS: i64 = 5;
const CITATION_SCORE_THRESHOLD: f32 = 0.7;
const EXCERPT_MAX_CODE_POINTS: usize = 100;

pub struct ChatResponse {
    pub message_id: Uuid,
    pub content: String,
    pub citations: Vec<Citation>,
}

pub struct ChatOrchestrator {
    repository: Arc<dyn ChatRepository>,
    retriever: Arc<Retriever>,
    llm: Arc<dyn Llm>,
}

impl ChatOrchestrator {
    pub fn new(repository: Arc<dyn ChatRepository>, retriever: Arc<Retriever>, llm: Arc<dyn Llm>) -> Self {
        Self {
            repository,
            retriever,
            llm,
        }
    }

    pub async fn process_message(
        &self,
        session_id: Uuid,
        user_text: &str,
    ) -> Result<ChatResponse, CasinoError> {
        // 1. Load session.
        let session = self
            .repository
            .get_session(session_id)
            .await?
            .ok_or_else(|| CasinoError::not_found(format!("session {session_id} not found")))?;

        // 2. Persist the user message.
        self.repository
            .create_message(session_id, MessageRole::User, user_text, Vec::new())
            .await?;

        // 3. Fetch recent history, ascending.
        let history = self
            .repository
            .recent_messages(session_id, MAX_HISTORY_MESSAGES)
            .await?;

        // 4. Build the RAG query.
        let rag_query = match session.context.as_ref().and_then(|c| c.current_game.as_ref()) {
            Some(game) => format!("{game} {user_text}"),
            None => user_text.to_string(),
        };

        // 5. Retrieve context, degrading to none on failure.
        let chunks = self
            .retriever
            .retrieve_context(&rag_query, MAX_CONTEXT_CHUNKS)
            .await;

        // 6. Compose the prompt and generate, degrading to a fallback string.
        let prompt = PromptComposer::compose(user_text, session.context.as_ref(), &chunks, &history);
        let content = match self.llm.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                log_degraded(&e);
                fallback_response(user_text)
            }
        };

        // 7. Build citations from high-relevance chunks.
        let citations: Vec<Citation> = chunks
            .iter()
            .filter(|c| c.score > CITATION_SCORE_THRESHOLD)
            .map(|c| Citation {
                document_id: c.document_id,
                source: c.source.clone(),
                excerpt: truncate_code_points(&c.content, EXCERPT_MAX_CODE_POINTS),
            })
            .collect();

        // 8. Persist the assistant message and bump the session timestamp.
        let assistant_message = self
            .repository
            .create_message(session_id, MessageRole::Assistant, &content, citations.clone())
            .await?;
        self.repository.touch_session(session_id).await?;

        // 9. Return the response.
        Ok(ChatResponse {
            message_id: assistant_message.id,
            content,
            citations,
        })
    }
}

fn truncate_code_points(s: &str, max: usize) -> String {
    let count = s.chars().count();
    if count <= max {
        return s.to_string();
    }
    let truncated: String = s.chars().take(max).collect();
    format!("{truncated}...")
}
