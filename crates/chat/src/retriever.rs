//! Embeds a query, runs a top-k similarity search against `kb_chunks`, and
//! renders the hits into the fixed, grep-stable format the prompt composer
//! expects.

use crate::models::RetrievedChunk;
use casino_core::Embedder;
use casino_vectorstore::{VectorStore, KB_CHUNKS_COLLECTION};
use std::sync::Arc;
use uuid::Uuid;

pub const DEFAULT_TOP_K: usize = 5;

const NO_CONTEXT_SENTINEL: &str = "No relevant information found in the knowledge base.";

pub struct Retriever {
    vector_store: Arc<VectorStore>,
    embedder: Arc<dyn Embedder>,
}

impl Retriever {
    pub fn new(vector_store: Arc<VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            vector_store,
            embedder,
        }
    }

    /// `k <= 0` is coerced to [`DEFAULT_TOP_K`].
    pub async fn retrieve_context(&self, query: &str, k: i64) -> Vec<RetrievedChunk> {
        let k = if k <= 0 { DEFAULT_TOP_K } else { k as usize };
        let query_vector = self.embedder.embed(query).await;

        self.vector_store
            .search(KB_CHUNKS_COLLECTION, &query_vector, k, None)
            .await
            .into_iter()
            .filter_map(|scored| {
                let document_id = Uuid::parse_str(scored.payload.get("document_id")?).ok()?;
                Some(RetrievedChunk {
                    content: scored.payload.get("content").cloned().unwrap_or_default(),
                    source: scored.payload.get("source").cloned().unwrap_or_default(),
                    document_id,
                    score: scored.score,
                    theme: scored.payload.get("theme").cloned(),
                    vip_level: scored.payload.get("vip_level").cloned(),
                    rtp: scored.payload.get("rtp").cloned(),
                    volatility: scored.payload.get("volatility").cloned(),
                    game_type: scored.payload.get("game_type").cloned(),
                })
            })
            .collect()
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Deterministically renders chunks for the prompt. Returns a fixed
/// sentinel when `chunks` is empty.
pub fn format_for_prompt(chunks: &[RetrievedChunk]) -> String {
    if chunks.is_empty() {
        return NO_CONTEXT_SENTINEL.to_string();
    }

    chunks
        .iter()
        .map(|chunk| {
            let mut block = String::new();
            block.push_str("---\n");
            block.push_str(&format!("Source: {}\n", chunk.source));

            if let Some(theme) = &chunk.theme {
                block.push_str(&format!("Theme: {theme}\n"));
            }
            if let Some(vip) = &chunk.vip_level {
                block.push_str(&format!("VIP Tier Required: {}\n", capitalize(vip)));
            }
            if let Some(rtp) = &chunk.rtp {
                block.push_str(&format!("RTP: {rtp}%\n"));
            }
            if let Some(volatility) = &chunk.volatility {
                block.push_str(&format!("Volatility: {}\n", capitalize(volatility)));
            }
            if let Some(game_type) = &chunk.game_type {
                block.push_str(&format!("Game Type: {game_type}\n"));
            }

            block.push_str(&chunk.content);
            block.push('\n');
            block
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(source: &str, content: &str) -> RetrievedChunk {
        RetrievedChunk {
            content: content.to_string(),
            source: source.to_string(),
            document_id: Uuid::new_v4(),
            score: 0.9,
            theme: None,
            vip_level: None,
            rtp: None,
            volatility: None,
            game_type: None,
        }
    }

    #[test]
    fn empty_input_returns_sentinel() {
        assert_eq!(format_for_prompt(&[]), NO_CONTEXT_SENTINEL);
    }

    #[test]
    fn renders_source_and_content() {
        let rendered = format_for_prompt(&[chunk("Sapphire Dragon Guide", "RTP 96.5%")]);
        assert!(rendered.starts_with("---\nSource: Sapphire Dragon Guide\n"));
        assert!(rendered.contains("RTP 96.5%"));
    }

    #[test]
    fn renders_optional_metadata_fields_when_present() {
        let mut c = chunk("Guide", "content");
        c.theme = Some("Mythology".to_string());
        c.vip_level = Some("gold".to_string());
        c.rtp = Some("96.5".to_string());
        c.volatility = Some("high".to_string());
        c.game_type = Some("slot".to_string());

        let rendered = format_for_prompt(&[c]);
        assert!(rendered.contains("Theme: Mythology\n"));
        assert!(rendered.contains("VIP Tier Required: Gold\n"));
        assert!(rendered.contains("RTP: 96.5%\n"));
        assert!(rendered.contains("Volatility: High\n"));
        assert!(rendered.contains("Game Type: slot\n"));
    }

    #[test]
    fn multiple_chunks_joined_by_blank_line() {
        let rendered = format_for_prompt(&[chunk("A", "one"), chunk("B", "two")]);
        assert!(rendered.contains("one\n\n---\nSource: B"));
    }
}
