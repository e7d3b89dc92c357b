use actix_web::{web, App, HttpResponse, HttpServer};
use casino_core::{
    init_logging, CasinoError, ConfigLoader, DatabasePool, Embedder, LogConfig, OllamaConfig,
    OllamaEmbedder, QdrantConfig, ServiceConfig,
};
use casino_recommendation::{EventType, HybridRanker, PostgresRelStore, PreferenceVectorEngine, RelStore};
use casino_vectorstore::{VectorStore, VipLevel};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

struct AppState {
    rel_store: Arc<dyn RelStore>,
    preference_engine: Arc<PreferenceVectorEngine>,
    ranker: Arc<HybridRanker>,
    embedder: Arc<dyn Embedder>,
}

#[derive(Debug, Deserialize)]
struct TrackEventRequest {
    #[serde(rename = "userId")]
    user_id: String,
    #[serde(rename = "gameSlug")]
    game_slug: String,
    #[serde(rename = "eventType")]
    event_type: String,
    #[serde(rename = "durationSeconds")]
    duration_seconds: Option<i32>,
    metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct SubmitRatingRequest {
    #[serde(rename = "userId")]
    user_id: String,
    #[serde(rename = "gameSlug")]
    game_slug: String,
    rating: i32,
}

#[derive(Debug, Deserialize)]
struct SubmitReviewRequest {
    #[serde(rename = "userId")]
    user_id: String,
    #[serde(rename = "gameSlug")]
    game_slug: String,
    rating: i32,
    #[serde(rename = "reviewText")]
    review_text: Option<String>,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    status: &'static str,
}

#[derive(Debug, Deserialize)]
struct ReviewsQuery {
    #[serde(rename = "gameSlug")]
    game_slug: String,
}

#[derive(Debug, Deserialize)]
struct UserReviewQuery {
    #[serde(rename = "userId")]
    user_id: String,
    #[serde(rename = "gameSlug")]
    game_slug: String,
}

#[derive(Debug, Deserialize)]
struct RecommendationsQuery {
    #[serde(rename = "userId")]
    user_id: String,
    placement: Option<String>,
    limit: Option<usize>,
    #[serde(rename = "vipLevel")]
    vip_level: Option<String>,
}

#[derive(Debug, Serialize)]
struct RecommendationsResponse {
    recommendations: Vec<String>,
}

const DEFAULT_RECOMMENDATION_LIMIT: usize = 10;
const GAME_REVIEWS_LIMIT: i64 = 50;

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("OK")
}

async fn track_event(
    state: web::Data<AppState>,
    body: web::Json<TrackEventRequest>,
) -> Result<HttpResponse, ApiError> {
    if body.user_id.is_empty() || body.game_slug.is_empty() || body.event_type.is_empty() {
        return Err(ApiError::from(CasinoError::validation("missing required fields")));
    }

    let event_type = EventType::parse(&body.event_type)
        .ok_or_else(|| ApiError::from(CasinoError::validation("invalid event type")))?;

    state
        .rel_store
        .create_event(
            &body.user_id,
            &body.game_slug,
            event_type,
            body.duration_seconds,
            body.metadata.clone(),
        )
        .await?;

    if matches!(event_type, EventType::GameTime | EventType::PlayEnd | EventType::Click) {
        let engine = state.preference_engine.clone();
        let user_id = body.user_id.clone();
        tokio::spawn(async move {
            if let Err(e) = engine.update_user_vector(&user_id).await {
                warn!(user_id, error = %e, "background preference vector update failed");
            }
        });
    }

    Ok(HttpResponse::Created().json(StatusResponse { status: "ok" }))
}

async fn submit_rating(
    state: web::Data<AppState>,
    body: web::Json<SubmitRatingRequest>,
) -> Result<HttpResponse, ApiError> {
    if body.user_id.is_empty() || body.game_slug.is_empty() {
        return Err(ApiError::from(CasinoError::validation("missing required fields")));
    }
    if !(1..=5).contains(&body.rating) {
        return Err(ApiError::from(CasinoError::validation("rating must be between 1 and 5")));
    }

    state.rel_store.upsert_rating(&body.user_id, &body.game_slug, body.rating).await?;

    spawn_vector_update(&state, &body.user_id);

    Ok(HttpResponse::Created().json(StatusResponse { status: "ok" }))
}

async fn submit_review(
    state: web::Data<AppState>,
    body: web::Json<SubmitReviewRequest>,
) -> Result<HttpResponse, ApiError> {
    if body.user_id.is_empty() || body.game_slug.is_empty() {
        return Err(ApiError::from(CasinoError::validation("missing required fields")));
    }
    if !(1..=5).contains(&body.rating) {
        return Err(ApiError::from(CasinoError::validation("rating must be between 1 and 5")));
    }

    let sentiment_score = match &body.review_text {
        Some(text) if !text.trim().is_empty() => state.embedder.analyze_sentiment(text).await.ok(),
        _ => None,
    };

    let review = state
        .rel_store
        .upsert_review(&body.user_id, &body.game_slug, body.rating, body.review_text.clone(), sentiment_score)
        .await?;

    // Mirrored into user_ratings for backwards compatibility with callers
    // that only read ratings.
    if let Err(e) = state.rel_store.upsert_rating(&body.user_id, &body.game_slug, body.rating).await {
        warn!(user_id = %body.user_id, error = %e, "failed to mirror review into ratings");
    }

    spawn_vector_update(&state, &body.user_id);

    Ok(HttpResponse::Created().json(review))
}

async fn get_game_reviews(
    state: web::Data<AppState>,
    query: web::Query<ReviewsQuery>,
) -> Result<HttpResponse, ApiError> {
    let reviews = state.rel_store.game_reviews(&query.game_slug, GAME_REVIEWS_LIMIT).await?;
    Ok(HttpResponse::Ok().json(reviews))
}

async fn get_user_review(
    state: web::Data<AppState>,
    query: web::Query<UserReviewQuery>,
) -> Result<HttpResponse, ApiError> {
    match state.rel_store.user_review(&query.user_id, &query.game_slug).await? {
        Some(review) => Ok(HttpResponse::Ok().json(review)),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({ "message": "Review not found" }))),
    }
}

async fn get_recommendations(
    state: web::Data<AppState>,
    query: web::Query<RecommendationsQuery>,
) -> Result<HttpResponse, ApiError> {
    if query.user_id.is_empty() {
        return Err(ApiError::from(CasinoError::validation("userId is required")));
    }

    let limit = query.limit.filter(|&l| l > 0).unwrap_or(DEFAULT_RECOMMENDATION_LIMIT);
    let vip_level = query.vip_level.as_deref().and_then(VipLevel::parse);

    let recommendations = state
        .ranker
        .get_recommendations(&query.user_id, query.placement.as_deref(), limit, vip_level)
        .await?;

    Ok(HttpResponse::Ok().json(RecommendationsResponse { recommendations }))
}

fn spawn_vector_update(state: &web::Data<AppState>, user_id: &str) {
    let engine = state.preference_engine.clone();
    let user_id = user_id.to_string();
    tokio::spawn(async move {
        if let Err(e) = engine.update_user_vector(&user_id).await {
            warn!(user_id, error = %e, "background preference vector update failed");
        }
    });
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

    info!("starting recommendation service");

    let service_config = ServiceConfig::from_env(8081).expect("invalid service configuration");
    service_config.validate().expect("invalid service configuration");
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
    let rel_store: Arc<dyn RelStore> = Arc::new(PostgresRelStore::new(db_pool.pool().clone()));

    let preference_engine = Arc::new(PreferenceVectorEngine::new(
        rel_store.clone(),
        vector_store.clone(),
        embedder.clone(),
    ));
    let ranker = Arc::new(HybridRanker::new(
        service_config.ml_url.as_deref(),
        vector_store.clone(),
    ));

    if !service_config.ml_enabled() {
        info!("ML_URL not configured, hybrid ranker runs content-only");
    }

    let state = web::Data::new(AppState {
        rel_store,
        preference_engine,
        ranker,
        embedder,
    });

    let bind_addr = format!("0.0.0.0:{}", service_config.port);
    info!(bind_addr, "recommendation service listening");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .route("/health", web::get().to(health))
            .route("/v1/events", web::post().to(track_event))
            .route("/v1/feedback/rating", web::post().to(submit_rating))
            .route("/v1/feedback/review", web::post().to(submit_review))
            .route("/v1/feedback/reviews", web::get().to(get_game_reviews))
            .route("/v1/feedback/review", web::get().to(get_user_review))
            .route("/v1/recommendations", web::get().to(get_recommendations))
            .wrap(actix_web::middleware::Logger::default())
    })
    .bind(&bind_addr)?
    .run()
    .await
}
