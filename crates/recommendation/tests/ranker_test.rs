//! Hybrid ranker coverage against a degraded (unreachable) vector store and
//! no configured ML backends -- the minimal-collaborator path every
//! deployment without `ML_URL` set actually runs.

use casino_recommendation::HybridRanker;
use casino_vectorstore::VectorStore;
use std::sync::Arc;

#[tokio::test]
async fn no_ml_backend_and_no_user_vector_returns_empty_not_error() {
    let vector_store = Arc::new(VectorStore::new("http://127.0.0.1:1").await);
    let ranker = HybridRanker::new(None, vector_store);

    let recommendations = ranker
        .get_recommendations("u1", Some("homepage"), 10, None)
        .await
        .expect("content fallback never errors when nothing is available");

    assert!(recommendations.is_empty());
}

#[tokio::test]
async fn hybrid_recommendations_degrade_to_empty_without_any_backend() {
    let vector_store = Arc::new(VectorStore::new("http://127.0.0.1:1").await);
    let ranker = HybridRanker::new(None, vector_store);

    let recommendations = ranker
        .get_hybrid_recommendations("u1", 10, None)
        .await
        .expect("blend never errors when both sides are empty");

    assert!(recommendations.is_empty());
}
