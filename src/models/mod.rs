mod content;
mod recommendation;

pub use content::{ContentItem, ContentType, InteractionKind, Rating, GENRES};
pub use recommendation::{
    CountryScore, GenreScore, PeerSimilarityRecord, RecommendationType, ScoredRecommendation,
    SimilarContent, TastePreferenceProfile, TimePeriod, TrendingContent,
};
