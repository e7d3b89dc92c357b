//! KB ingestion coverage: hash-dedup idempotence and chunk/vector fan-out,
//! against in-memory fakes for the relational store and vector index.

use async_trait::async_trait;
use casino_chat::{
    ChatMessage, ChatRepository, ChatSession, Citation, GameMetadata, IngestInput, KbChunk,
    KbDocument, KbIngester, KbSource, MessageRole, SessionContext,
};
use casino_core::{CasinoError, Embedder, SentimentError};
use casino_vectorstore::VectorStore;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Default)]
struct FakeKbRepository {
    sources: Mutex<Vec<KbSource>>,
    documents: Mutex<Vec<KbDocument>>,
    chunks: Mutex<Vec<KbChunk>>,
}

#[async_trait]
impl ChatRepository for FakeKbRepository {
    async fn create_session(&self, _u: Option<String>, _c: Option<SessionContext>) -> Result<ChatSession, CasinoError> {
        unimplemented!()
    }
    async fn get_session(&self, _id: Uuid) -> Result<Option<ChatSession>, CasinoError> {
        unimplemented!()
    }
    async fn touch_session(&self, _id: Uuid) -> Result<(), CasinoError> {
        unimplemented!()
    }
    async fn create_message(
        &self,
        _s: Uuid,
        _r: MessageRole,
        _c: &str,
        _ci: Vec<Citation>,
    ) -> Result<ChatMessage, CasinoError> {
        unimplemented!()
    }
    async fn recent_messages(&self, _s: Uuid, _l: i64) -> Result<Vec<ChatMessage>, CasinoError> {
        unimplemented!()
    }

    async fn create_kb_source(&self, name: &str, source_type: &str) -> Result<KbSource, CasinoError> {
        let source = KbSource {
            id: Uuid::new_v4(),
            name: name.to_string(),
            source_type: source_type.to_string(),
            created_at: chrono::Utc::now(),
        };
        self.sources.lock().unwrap().push(source.clone());
        Ok(source)
    }

    async fn find_kb_source_by_name(&self, name: &str) -> Result<Option<KbSource>, CasinoError> {
        Ok(self.sources.lock().unwrap().iter().find(|s| s.name == name).cloned())
    }

    async fn create_kb_document(
        &self,
        source_id: Uuid,
        title: &str,
        content_hash: &str,
    ) -> Result<KbDocument, CasinoError> {
        let doc = KbDocument {
            id: Uuid::new_v4(),
            source_id,
            title: title.to_string(),
            content_hash: content_hash.to_string(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        self.documents.lock().unwrap().push(doc.clone());
        Ok(doc)
    }

    async fn find_kb_document_by_hash(&self, hash: &str) -> Result<Option<KbDocument>, CasinoError> {
        Ok(self
            .documents
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.content_hash == hash)
            .cloned())
    }

    async fn create_kb_chunk(
        &self,
        document_id: Uuid,
        chunk_index: i32,
        content: &str,
        vector_id: Uuid,
    ) -> Result<KbChunk, CasinoError> {
        let chunk = KbChunk {
            id: Uuid::new_v4(),
            document_id,
            chunk_index,
            content: content.to_string(),
            vector_id,
            created_at: chrono::Utc::now(),
        };
        self.chunks.lock().unwrap().push(chunk.clone());
        Ok(chunk)
    }

    async fn count_kb_entities(&self) -> Result<(i64, i64, i64), CasinoError> {
        Ok((
            self.sources.lock().unwrap().len() as i64,
            self.documents.lock().unwrap().len() as i64,
            self.chunks.lock().unwrap().len() as i64,
        ))
    }
}

struct StubEmbedder;

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0; casino_core::EMBEDDING_DIM];
        v[0] = text.len() as f32;
        v
    }

    async fn analyze_sentiment(&self, _text: &str) -> Result<f32, SentimentError> {
        Err(SentimentError("not configured".to_string()))
    }
}

fn sapphire_dragon_text() -> Vec<u8> {
    let mut body = "Title: Sapphire Dragon\n\n".to_string();
    body.push_str(&"A mythic slot with bonus wilds. ".repeat(40));
    body.push_str("Sapphire Dragon has RTP 96.5% and high volatility, with free spins and expanding wilds.");
    body.push_str(&" More flavor text about the dragon theme and its mechanics.".repeat(10));
    body.into_bytes()
}

#[tokio::test]
async fn ingesting_the_same_bytes_twice_creates_exactly_one_document() {
    let repository: Arc<dyn ChatRepository> = Arc::new(FakeKbRepository::default());
    let vector_store = Arc::new(VectorStore::new("http://127.0.0.1:1").await);
    let embedder: Arc<dyn Embedder> = Arc::new(StubEmbedder);
    let ingester = KbIngester::new(repository.clone(), vector_store, embedder);

    let bytes = sapphire_dragon_text();
    let make_input = || IngestInput {
        source_name: "Casino Knowledge Base",
        title: None,
        filename_stem: "sapphire-dragon",
        bytes: &bytes,
        game_metadata: GameMetadata {
            theme: Some("Mythology".to_string()),
            vip_level: Some("gold".to_string()),
            rtp: Some("96.5".to_string()),
            volatility: Some("high".to_string()),
            game_type: Some("slot".to_string()),
        },
    };

    let first = ingester.ingest_document(make_input()).await.unwrap();
    assert!(!first.skipped_existing);
    assert!(first.chunks_created > 0);

    let second = ingester.ingest_document(make_input()).await.unwrap();
    assert!(second.skipped_existing);

    let (_sources, documents, _chunks) = repository.count_kb_entities().await.unwrap();
    assert_eq!(documents, 1);
}

#[tokio::test]
async fn title_is_derived_from_the_title_prefix_line() {
    let repository = Arc::new(FakeKbRepository::default());
    let repository_dyn: Arc<dyn ChatRepository> = repository.clone();
    let vector_store = Arc::new(VectorStore::new("http://127.0.0.1:1").await);
    let embedder: Arc<dyn Embedder> = Arc::new(StubEmbedder);
    let ingester = KbIngester::new(repository_dyn, vector_store, embedder);

    let bytes = sapphire_dragon_text();
    ingester
        .ingest_document(IngestInput {
            source_name: "Casino Knowledge Base",
            title: None,
            filename_stem: "sapphire-dragon",
            bytes: &bytes,
            game_metadata: GameMetadata::default(),
        })
        .await
        .unwrap();

    let documents = repository.documents.lock().unwrap();
    assert_eq!(documents[0].title, "Sapphire Dragon");
}
