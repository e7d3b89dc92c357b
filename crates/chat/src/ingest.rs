//! Knowledge-base ingestion: hash-dedup, title derivation, chunk, embed,
//! and upsert. Document content hashing makes reingestion idempotent;
//! per-chunk failures are logged and skipped rather than aborting the
//! whole document.

use crate::chunker::chunk_text;
use crate::repository::ChatRepository;
use casino_core::{CasinoError, Embedder};
use casino_vectorstore::{VectorStore, KB_CHUNKS_COLLECTION};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Optional game metadata carried alongside a document, stored verbatim in
/// each of its chunks' vector payloads.
#[derive(Debug, Clone, Default)]
pub struct GameMetadata {
    pub theme: Option<String>,
    pub vip_level: Option<String>,
    pub rtp: Option<String>,
    pub volatility: Option<String>,
    pub game_type: Option<String>,
}

pub struct IngestInput<'a> {
    pub source_name: &'a str,
    pub title: Option<&'a str>,
    pub filename_stem: &'a str,
    pub bytes: &'a [u8],
    pub game_metadata: GameMetadata,
}

#[derive(Debug, Default)]
pub struct IngestOutcome {
    pub document_id: Option<Uuid>,
    pub chunks_created: usize,
    pub skipped_existing: bool,
}

pub struct KbIngester {
    repository: Arc<dyn ChatRepository>,
    vector_store: Arc<VectorStore>,
    embedder: Arc<dyn Embedder>,
}

impl KbIngester {
    pub fn new(
        repository: Arc<dyn ChatRepository>,
        vector_store: Arc<VectorStore>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            repository,
            vector_store,
            embedder,
        }
    }

    pub async fn ingest_document(
        &self,
        input: IngestInput<'_>,
    ) -> Result<IngestOutcome, CasinoError> {
        let content_hash = hex_sha256(input.bytes);

        if self
            .repository
            .find_kb_document_by_hash(&content_hash)
            .await?
            .is_some()
        {
            info!(hash = %content_hash, "document already ingested, skipping");
            return Ok(IngestOutcome {
                skipped_existing: true,
                ..Default::default()
            });
        }

        let source = match self.repository.find_kb_source_by_name(input.source_name).await? {
            Some(s) => s,
            None => self.repository.create_kb_source(input.source_name, "file").await?,
        };

        let text = String::from_utf8_lossy(input.bytes);
        let title = derive_title(&text, input.title, input.filename_stem);

        let document = self
            .repository
            .create_kb_document(source.id, &title, &content_hash)
            .await?;

        let chunks = chunk_text(&text);
        let mut created = 0usize;

        for (index, chunk_content) in chunks.iter().enumerate() {
            let vector_id = Uuid::new_v4();
            let vector = self.embedder.embed(chunk_content).await;

            let persisted = self
                .repository
                .create_kb_chunk(document.id, index as i32, chunk_content, vector_id)
                .await;

            if let Err(e) = persisted {
                warn!(document_id = %document.id, index, error = %e, "failed to persist chunk, skipping");
                continue;
            }

            let payload = build_payload(chunk_content, &title, document.id, &input.game_metadata);
            self.vector_store
                .upsert_point(KB_CHUNKS_COLLECTION, &vector_id.to_string(), vector, payload)
                .await;

            created += 1;
        }

        info!(document_id = %document.id, chunks = created, "ingested document");

        Ok(IngestOutcome {
            document_id: Some(document.id),
            chunks_created: created,
            skipped_existing: false,
        })
    }
}

fn hex_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn derive_title(text: &str, explicit_title: Option<&str>, filename_stem: &str) -> String {
    if let Some(title) = explicit_title {
        return title.to_string();
    }

    if let Some(first_line) = text.lines().next() {
        if let Some(stripped) = first_line.strip_prefix("Title: ") {
            return stripped.to_string();
        }
    }

    filename_stem.to_string()
}

fn build_payload(
    content: &str,
    title: &str,
    document_id: Uuid,
    game: &GameMetadata,
) -> HashMap<String, String> {
    let mut payload = HashMap::new();
    payload.insert("content".to_string(), content.to_string());
    payload.insert("source".to_string(), title.to_string());
    payload.insert("document_id".to_string(), document_id.to_string());

    if let Some(theme) = &game.theme {
        payload.insert("theme".to_string(), theme.clone());
    }
    if let Some(vip_level) = &game.vip_level {
        payload.insert("vip_level".to_string(), vip_level.clone());
    }
    if let Some(rtp) = &game.rtp {
        payload.insert("rtp".to_string(), rtp.clone());
    }
    if let Some(volatility) = &game.volatility {
        payload.insert("volatility".to_string(), volatility.clone());
    }
    if let Some(game_type) = &game.game_type {
        payload.insert("game_type".to_string(), game_type.clone());
    }

    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_64_hex_chars() {
        let h = hex_sha256(b"hello world");
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(h, hex_sha256(b"hello world"));
    }

    #[test]
    fn title_prefers_explicit_title() {
        assert_eq!(derive_title("Title: From Body", Some("Explicit"), "stem"), "Explicit");
    }

    #[test]
    fn title_strips_title_prefix_from_first_line() {
        assert_eq!(derive_title("Title: Sapphire Dragon\nbody", None, "stem"), "Sapphire Dragon");
    }

    #[test]
    fn title_falls_back_to_filename_stem() {
        assert_eq!(derive_title("no prefix here", None, "sapphire-dragon"), "sapphire-dragon");
    }

    #[test]
    fn payload_carries_only_present_metadata() {
        let id = Uuid::new_v4();
        let payload = build_payload("chunk body", "Guide", id, &GameMetadata::default());
        assert_eq!(payload.get("source").unwrap(), "Guide");
        assert_eq!(payload.get("content").unwrap(), "chunk body");
        assert!(!payload.contains_key("theme"));
    }
}
