use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use uuid::Uuid;

use super::ContentItem;

/// A genre the user likes, with the aggregate that ranked it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenreScore {
    pub genre: String,
    pub count: usize,
    pub avg_rating: f64,
    /// `count * avg_rating`
    pub score: f64,
}

/// A production country the user likes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CountryScore {
    pub country: String,
    pub count: usize,
    pub avg_rating: f64,
    /// Equal to `count`
    pub score: f64,
}

/// Taste profile derived from a user's liked ratings.
///
/// Built fresh for every request and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TastePreferenceProfile {
    pub favorite_genres: Vec<GenreScore>,
    pub favorite_countries: Vec<CountryScore>,
    pub min_rating_threshold: f64,
}

impl TastePreferenceProfile {
    pub fn is_empty(&self) -> bool {
        self.favorite_genres.is_empty() && self.favorite_countries.is_empty()
    }

    /// The `n` best-ranked genre names
    pub fn top_genres(&self, n: usize) -> Vec<&str> {
        self.favorite_genres
            .iter()
            .take(n)
            .map(|g| g.genre.as_str())
            .collect()
    }

    /// The `n` best-ranked country names
    pub fn top_countries(&self, n: usize) -> Vec<&str> {
        self.favorite_countries
            .iter()
            .take(n)
            .map(|c| c.country.as_str())
            .collect()
    }
}

/// Another user whose ratings correlate with the target user's
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeerSimilarityRecord {
    pub peer_user_id: Uuid,
    /// Pearson correlation clamped to `[0, 1]`
    pub similarity_score: f64,
    pub shared_rating_count: usize,
}

/// Which source produced a recommendation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationType {
    Collaborative,
    ContentBased,
    Trending,
}

/// A catalog item proposed to a user, serialized with the item's fields inline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredRecommendation {
    #[serde(flatten)]
    pub content: ContentItem,
    pub recommendation_type: RecommendationType,
    pub confidence_score: f64,
}

impl ScoredRecommendation {
    pub fn content_id(&self) -> Uuid {
        self.content.id
    }
}

/// A catalog item ranked against a reference item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimilarContent {
    #[serde(flatten)]
    pub content: ContentItem,
    pub similarity_score: f64,
}

/// A catalog item ranked by recent activity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendingContent {
    #[serde(flatten)]
    pub content: ContentItem,
    pub trending_score: f64,
    pub recent_reviews: u64,
    pub recent_watchlist_updates: u64,
}

/// Window over which trending activity is counted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimePeriod {
    Day,
    #[default]
    Week,
    Month,
}

impl TimePeriod {
    pub fn window(&self) -> Duration {
        match self {
            TimePeriod::Day => Duration::days(1),
            TimePeriod::Week => Duration::days(7),
            TimePeriod::Month => Duration::days(30),
        }
    }

    /// Start of the window ending at `now`
    pub fn since(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.window()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimePeriod::Day => "day",
            TimePeriod::Week => "week",
            TimePeriod::Month => "month",
        }
    }
}

impl Display for TimePeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimePeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(TimePeriod::Day),
            "week" => Ok(TimePeriod::Week),
            "month" => Ok(TimePeriod::Month),
            other => Err(format!("unknown time period '{}'", other)),
        }
    }
}
