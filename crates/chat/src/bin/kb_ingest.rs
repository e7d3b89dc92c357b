//! Ingests every `.txt` file in a directory into the knowledge base.
//! Usage: `kb-ingest [directory]`, defaulting to `./kb`.

use casino_chat::{GameMetadata, IngestInput, KbIngester, PostgresChatRepository};
use casino_core::{init_logging, ConfigLoader, DatabasePool, Embedder, LogConfig, OllamaConfig, OllamaEmbedder, QdrantConfig};
use casino_vectorstore::VectorStore;
use std::sync::Arc;
use tracing::{error, info};

const DEFAULT_SOURCE_NAME: &str = "Casino Knowledge Base";

#[tokio::main]
async fn main() {
    casino_core::config::load_dotenv();
    init_logging(&LogConfig::from_env());

    let kb_dir = std::env::args().nth(1).unwrap_or_else(|| "./kb".to_string());
    info!(kb_dir, "starting kb ingestion");

    let ollama_config = OllamaConfig::from_env().expect("invalid ollama configuration");
    let qdrant_config = QdrantConfig::from_env().expect("invalid qdrant configuration");
    let db_pool = DatabasePool::from_env()
        .await
        .expect("failed to connect to postgres");

    let vector_store = Arc::new(VectorStore::new(&qdrant_config.url).await);
    let embedder: Arc<dyn Embedder> = Arc::new(OllamaEmbedder::new(
        ollama_config.url,
        ollama_config.embedding_model,
        ollama_config.generation_model,
    ));
    let repository = Arc::new(PostgresChatRepository::new(db_pool.pool().clone()));
    let ingester = KbIngester::new(repository, vector_store, embedder);

    let entries = match std::fs::read_dir(&kb_dir) {
        Ok(entries) => entries,
        Err(e) => {
            error!(kb_dir, error = %e, "failed to read kb directory");
            std::process::exit(1);
        }
    };

    let mut documents = 0usize;
    let mut chunks = 0usize;

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("txt") {
            continue;
        }

        let filename_stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("untitled")
            .to_string();

        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(file = %path.display(), error = %e, "failed to read file");
                continue;
            }
        };

        info!(file = %path.display(), "processing");

        let outcome = ingester
            .ingest_document(IngestInput {
                source_name: DEFAULT_SOURCE_NAME,
                title: None,
                filename_stem: &filename_stem,
                bytes: &bytes,
                game_metadata: GameMetadata::default(),
            })
            .await;

        match outcome {
            Ok(outcome) if outcome.skipped_existing => {
                info!(file = %path.display(), "already ingested, skipping");
            }
            Ok(outcome) => {
                documents += 1;
                chunks += outcome.chunks_created;
                info!(file = %path.display(), chunks = outcome.chunks_created, "ingested");
            }
            Err(e) => {
                error!(file = %path.display(), error = %e, "failed to ingest document");
            }
        }
    }

    info!(documents, chunks, "ingestion complete");
}
