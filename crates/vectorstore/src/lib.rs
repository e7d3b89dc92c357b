//! Qdrant-backed vector index shared by the chat and recommendation
//! services: three cosine-distance collections (`games`, `users`,
//! `kb_chunks`), each created on first use.
//!
//! A connection failure at construction never propagates: the store is left
//! in a degraded mode where every operation becomes a no-op, so the two
//! services stay available even when the index is unreachable.

use qdrant_client::prelude::*;
use qdrant_client::qdrant::{
    point_id::PointIdOptions, vectors_config::Config, Condition, CreateCollection, Distance,
    FieldCondition, Filter, IsEmptyCondition, Match, PointId, Value as QdrantValue, VectorParams,
    VectorsConfig,
};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Dimension of every dense vector stored in this index.
pub const VECTOR_DIM: u64 = 768;

pub const GAMES_COLLECTION: &str = "games";
pub const USERS_COLLECTION: &str = "users";
pub const KB_CHUNKS_COLLECTION: &str = "kb_chunks";

/// VIP tier, ranked for the `games` collection's `minVipLevel` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VipLevel {
    Bronze = 1,
    Silver = 2,
    Gold = 3,
    Platinum = 4,
}

impl VipLevel {
    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "bronze" => Some(Self::Bronze),
            "silver" => Some(Self::Silver),
            "gold" => Some(Self::Gold),
            "platinum" => Some(Self::Platinum),
            _ => None,
        }
    }
}

impl Default for VipLevel {
    /// Games missing a `minVipLevel` payload field default to bronze.
    fn default() -> Self {
        Self::Bronze
    }
}

/// A point returned from [`VectorStore::search`].
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    pub id: String,
    pub score: f32,
    pub payload: HashMap<String, String>,
}

/// Search filter grammar. Currently only the `games` collection's
/// `minVipLevel ≤ callerVipLevel` predicate is defined; `None` means no
/// filtering.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub caller_vip_level: Option<VipLevel>,
}

pub struct VectorStore {
    client: Option<QdrantClient>,
    known_collections: Mutex<std::collections::HashSet<String>>,
}

impl VectorStore {
    /// Connects to Qdrant at `url`. A malformed URL or an unreachable server
    /// never returns an error here — the store degrades to no-op mode
    /// instead, matching the failure policy every caller relies on.
    pub async fn new(url: &str) -> Self {
        match QdrantClient::from_url(url).build() {
            Ok(client) => {
                info!(url, "connected to qdrant");
                Self {
                    client: Some(client),
                    known_collections: Mutex::new(std::collections::HashSet::new()),
                }
            }
            Err(e) => {
                warn!(url, error = %e, "failed to build qdrant client, degrading to no-op");
                Self {
                    client: None,
                    known_collections: Mutex::new(std::collections::HashSet::new()),
                }
            }
        }
    }

    async fn ensure_collection(&self, client: &QdrantClient, collection: &str) {
        {
            let known = self.known_collections.lock().await;
            if known.contains(collection) {
                return;
            }
        }

        let exists = match client.list_collections().await {
            Ok(resp) => resp.collections.iter().any(|c| c.name == collection),
            Err(e) => {
                warn!(collection, error = %e, "failed to list collections");
                return;
            }
        };

        if !exists {
            let created = client
                .create_collection(&CreateCollection {
                    collection_name: collection.to_string(),
                    vectors_config: Some(VectorsConfig {
                        config: Some(Config::Params(VectorParams {
                            size: VECTOR_DIM,
                            distance: Distance::Cosine.into(),
                            ..Default::default()
                        })),
                    }),
                    ..Default::default()
                })
                .await;

            match created {
                Ok(_) => info!(collection, "created collection"),
                Err(e) => {
                    warn!(collection, error = %e, "failed to create collection");
                    return;
                }
            }
        }

        self.known_collections
            .lock()
            .await
            .insert(collection.to_string());
    }

    /// Upsert a single point. No-op (logged) if the store is degraded or
    /// the request fails.
    pub async fn upsert_point(
        &self,
        collection: &str,
        id: &str,
        vector: Vec<f32>,
        payload: HashMap<String, String>,
    ) {
        let Some(client) = &self.client else {
            debug!(collection, id, "vector store degraded, dropping upsert");
            return;
        };

        self.ensure_collection(client, collection).await;

        let qdrant_payload: HashMap<String, QdrantValue> = payload
            .into_iter()
            .map(|(k, v)| (k, QdrantValue::from(v)))
            .collect();
        let point = PointStruct::new(id.to_string(), vector, Payload::from(qdrant_payload));

        if let Err(e) = client
            .upsert_points_blocking(collection, None, vec![point], None)
            .await
        {
            warn!(collection, id, error = %e, "upsert failed");
        }
    }

    /// Fetch the raw vector for a point, or `None` if absent/degraded.
    pub async fn get_vector(&self, collection: &str, id: &str) -> Option<Vec<f32>> {
        let client = self.client.as_ref()?;

        let response = client
            .get_points(
                collection,
                None,
                &[PointId {
                    point_id_options: Some(PointIdOptions::Uuid(id.to_string())),
                }],
                Some(true),
                Some(false),
                None,
            )
            .await
            .map_err(|e| warn!(collection, id, error = %e, "get_vector failed"))
            .ok()?;

        let point = response.result.into_iter().next()?;
        let vectors = point.vectors?;
        match vectors.vectors_options? {
            qdrant_client::qdrant::vectors::VectorsOptions::Vector(v) => Some(v.data),
            qdrant_client::qdrant::vectors::VectorsOptions::Vectors(_) => None,
        }
    }

    /// Top-k cosine similarity search, ordered by descending score. Returns
    /// an empty vector if the store is degraded or the request fails.
    pub async fn search(
        &self,
        collection: &str,
        query: &[f32],
        k: usize,
        filter: Option<SearchFilter>,
    ) -> Vec<ScoredPoint> {
        let Some(client) = &self.client else {
            debug!(collection, "vector store degraded, search returns empty");
            return Vec::new();
        };

        let qdrant_filter = filter
            .and_then(|f| f.caller_vip_level)
            .map(|caller_level| build_vip_filter(caller_level));

        let result = client
            .search_points(&SearchPoints {
                collection_name: collection.to_string(),
                vector: query.to_vec(),
                filter: qdrant_filter,
                limit: k as u64,
                with_payload: Some(true.into()),
                ..Default::default()
            })
            .await;

        let search_result = match result {
            Ok(r) => r,
            Err(e) => {
                warn!(collection, error = %e, "search failed");
                return Vec::new();
            }
        };

        search_result
            .result
            .into_iter()
            .filter_map(|scored| {
                let id = point_id_to_string(scored.id?)?;
                let payload = scored
                    .payload
                    .into_iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k, s.to_string())))
                    .collect();
                Some(ScoredPoint {
                    id,
                    score: scored.score,
                    payload,
                })
            })
            .collect()
    }
}

/// `minVipLevel` is stored as a string payload field (e.g. `"gold"`); this
/// builds the permissive "caller's tier is at least the game's minimum"
/// predicate by allowing any tier at or below the caller's own rank. A game
/// row with no `min_vip_level` payload field defaults to bronze, so it must
/// match too -- the field-match and the is-empty check are OR'd together via
/// `should` rather than both being required via `must`.
fn build_vip_filter(caller_level: VipLevel) -> Filter {
    let allowed: Vec<String> = [
        VipLevel::Bronze,
        VipLevel::Silver,
        VipLevel::Gold,
        VipLevel::Platinum,
    ]
    .into_iter()
    .filter(|tier| tier.rank() <= caller_level.rank())
    .map(|tier| vip_level_str(tier).to_string())
    .collect();

    let matches_allowed_tier = Condition {
        condition_one_of: Some(qdrant_client::qdrant::condition::ConditionOneOf::Field(
            FieldCondition {
                key: "min_vip_level".to_string(),
                r#match: Some(Match {
                    match_value: Some(qdrant_client::qdrant::r#match::MatchValue::Keywords(
                        qdrant_client::qdrant::RepeatedStrings { strings: allowed },
                    )),
                }),
                ..Default::default()
            },
        )),
    };

    let field_unset = Condition {
        condition_one_of: Some(qdrant_client::qdrant::condition::ConditionOneOf::IsEmpty(
            IsEmptyCondition {
                key: "min_vip_level".to_string(),
            },
        )),
    };

    Filter {
        should: vec![matches_allowed_tier, field_unset],
        ..Default::default()
    }
}

fn vip_level_str(level: VipLevel) -> &'static str {
    match level {
        VipLevel::Bronze => "bronze",
        VipLevel::Silver => "silver",
        VipLevel::Gold => "gold",
        VipLevel::Platinum => "platinum",
    }
}

fn point_id_to_string(id: PointId) -> Option<String> {
    match id.point_id_options? {
        PointIdOptions::Uuid(s) => Some(s),
        PointIdOptions::Num(n) => Some(n.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vip_level_rank_ordering() {
        assert!(VipLevel::Bronze < VipLevel::Silver);
        assert!(VipLevel::Silver < VipLevel::Gold);
        assert!(VipLevel::Gold < VipLevel::Platinum);
    }

    #[test]
    fn vip_level_parse_case_insensitive() {
        assert_eq!(VipLevel::parse("GOLD"), Some(VipLevel::Gold));
        assert_eq!(VipLevel::parse("bronze"), Some(VipLevel::Bronze));
        assert_eq!(VipLevel::parse("nonsense"), None);
    }

    #[test]
    fn vip_level_default_is_bronze() {
        assert_eq!(VipLevel::default(), VipLevel::Bronze);
    }

    #[tokio::test]
    async fn degraded_store_from_malformed_url_never_panics() {
        let store = VectorStore::new("not a url").await;
        assert!(store.client.is_none());
        assert!(store.search("games", &[0.0; 768], 5, None).await.is_empty());
        assert!(store.get_vector("games", "x").await.is_none());
        store
            .upsert_point("games", "x", vec![0.0; 768], HashMap::new())
            .await;
    }
}
