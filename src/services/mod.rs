//! Recommendation engine.
//!
//! Each component is a pure function over already-fetched data, wrapped by an
//! async function that reads what it needs from a [`CatalogStore`](crate::db::CatalogStore).

pub mod content_based;
pub mod peers;
pub mod preferences;
pub mod recommendations;
pub mod trending;

pub use content_based::content_based_recommendations;
pub use peers::find_similar_users;
pub use preferences::analyze_preferences;
pub use recommendations::{recommend_for_user, BlendWeights, PersonalizedRecommendations};
pub use trending::{similar_content, trending_content};
