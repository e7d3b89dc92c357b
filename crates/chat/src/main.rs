use actix_web::{web, App, HttpResponse, HttpServer};
use casino_chat::{ChatOrchestrator, ChatRepository, PostgresChatRepository, Retriever, SessionContext};
use casino_core::{
    init_logging, CasinoError, ConfigLoader, DatabasePool, Embedder, LogConfig, OllamaConfig,
    OllamaEmbedder, QdrantConfig, ServiceConfig,
};
use casino_vectorstore::VectorStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

struct AppState {
    repository: Arc<dyn ChatRepository>,
    orchestrator: ChatOrchestrator,
}

#[derive(Debug, Deserialize)]
struct CreateSessionRequest {
    #[serde(rename = "userId")]
    user_id: Option<String>,
    context: Option<SessionContext>,
}

#[derive(Debug, Serialize)]
struct CreateSessionResponse {
    id: Uuid,
    #[serde(rename = "userId")]
    user_id: Option<String>,
    #[serde(rename = "createdAt")]
    created_at: chrono::DateTime<chrono::Utc>,
    #[serde(rename = "updatedAt")]
    updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize)]
struct SendMessageRequest {
    content: String,
}

#[derive(Debug, Serialize)]
struct SendMessageResponse {
    #[serde(rename = "messageId")]
    message_id: Uuid,
    content: String,
    citations: Vec<casino_chat::Citation>,
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("OK")
}

async fn create_session(
    state: web::Data<AppState>,
    body: web::Json<CreateSessionRequest>,
) -> Result<HttpResponse, ApiError> {
    let session = state
        .repository
        .create_session(body.user_id.clone(), body.context.clone())
        .await?;

    Ok(HttpResponse::Created().json(CreateSessionResponse {
        id: session.id,
        user_id: session.user_id,
        created_at: session.created_at,
        updated_at: session.updated_at,
    }))
}

async fn send_message(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, ApiError> {
    let session_id = Uuid::parse_str(&path.into_inner())
        .map_err(|_| ApiError::from(CasinoError::validation("malformed session id")))?;

    if body.content.trim().is_empty() {
        return Err(ApiError::from(CasinoError::validation("content must not be empty")));
    }

    let response = state
        .orchestrator
        .process_message(session_id, &body.content)
        .await?;

    Ok(HttpResponse::Ok().json(SendMessageResponse {
        message_id: response.message_id,
        content: response.content,
        citations: response.citations,
    }))
}

struct ApiError(CasinoError);

impl From<CasinoError> for ApiError {
    fn from(e: CasinoError) -> Self {
        Self(e)
    }
}

impl std::fmt::Debug for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl actix_web::ResponseError for ApiError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        actix_web::http::StatusCode::from_u16(self.0.status_code()).unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({ "error": self.0.to_string() }))
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    casino_core::config::load_dotenv();
    init_logging(&LogConfig::from_env());

    info!("starting chat service");

    let service_config = ServiceConfig::from_env(8080).expect("invalid service configuration");
    service_config.validate().expect("invalid service configuration");
    let ollama_config = OllamaConfig::from_env().expect("invalid ollama configuration");
    let qdrant_config = QdrantConfig::from_env().expect("invalid qdrant configuration");
    let db_pool = DatabasePool::from_env()
        .await
        .expect("failed to connect to postgres");
    let vector_store = Arc::new(VectorStore::new(&qdrant_config.url).await);
    let embedder: Arc<dyn Embedder> = Arc::new(OllamaEmbedder::new(
        ollama_config.url.clone(),
        ollama_config.embedding_model.clone(),
        ollama_config.generation_model.clone(),
    ));
    let llm: Arc<dyn casino_chat::Llm> = Arc::new(casino_chat::OllamaLlm::new(
        ollama_config.url,
        ollama_config.generation_model,
    ));

    let repository: Arc<dyn ChatRepository> = Arc::new(PostgresChatRepository::new(db_pool.pool().clone()));
    let retriever = Arc::new(Retriever::new(vector_store.clone(), embedder));
    let orchestrator = ChatOrchestrator::new(repository.clone(), retriever, llm);

    let state = web::Data::new(AppState {
        repository,
        orchestrator,
    });

    let bind_addr = format!("0.0.0.0:{}", service_config.port);
    info!(bind_addr, "chat service listening");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .route("/health", web::get().to(health))
            .route("/v1/chat/sessions", web::post().to(create_session))
            .route("/v1/chat/sessions/{sessionId}/messages", web::post().to(send_message))
            .wrap(actix_web::middleware::Logger::default())
    })
    .bind(&bind_addr)?
    .run()
    .await
}
