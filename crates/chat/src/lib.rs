//! Chat service library: session/message persistence, retrieval-augmented
//! prompt composition, and LLM-backed response generation.
//!
//! ## Modules
//!
//! - `models`: session, message, and knowledge-base entity types
//! - `chunker`: pure text-chunking function
//! - `llm`: generation client with keyword-matched fallback
//! - `repository`: `ChatRepository` over Postgres
//! - `ingest`: knowledge-base ingestion pipeline
//! - `retriever`: query embedding + top-k search + prompt rendering
//! - `prompt`: prompt assembly
//! - `orchestrator`: end-to-end chat-turn driver

pub mod chunker;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod orchestrator;
pub mod prompt;
pub mod repository;
pub mod retriever;

pub use chunker::chunk_text;
pub use ingest::{GameMetadata, IngestInput, IngestOutcome, KbIngester};
pub use llm::{fallback_response, Llm, LlmError, OllamaLlm};
pub use models::{
    ChatMessage, ChatSession, Citation, KbChunk, KbDocument, KbSource, MessageRole, RetrievedChunk,
    SessionContext, VipLevel,
};
pub use orchestrator::{ChatOrchestrator, ChatResponse};
pub use prompt::PromptComposer;
pub use repository::{ChatRepository, PostgresChatRepository, MAX_HISTORY_MESSAGES};
pub use retriever::{format_for_prompt, Retriever, DEFAULT_TOP_K};
