//! Recommendation service library: interaction-signal persistence, the
//! preference-vector engine, and the hybrid ranker.

pub mod models;
pub mod preference;
pub mod ranker;
pub mod repository;

pub use models::{EventType, UserEvent, UserPreference, UserRating, UserReview};
pub use preference::PreferenceVectorEngine;
pub use ranker::HybridRanker;
pub use repository::{PostgresRelStore, RelStore};
