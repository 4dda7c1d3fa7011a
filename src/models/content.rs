use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt::Display, str::FromStr};
use uuid::Uuid;

/// Genres offered by the catalog
pub const GENRES: [&str; 12] = [
    "romance",
    "comedy",
    "action",
    "thriller",
    "horror",
    "fantasy",
    "drama",
    "mystery",
    "slice_of_life",
    "historical",
    "crime",
    "adventure",
];

/// Kind of catalog entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Drama,
    Movie,
    Series,
    Anime,
}

impl ContentType {
    pub const ALL: [ContentType; 4] = [
        ContentType::Drama,
        ContentType::Movie,
        ContentType::Series,
        ContentType::Anime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Drama => "drama",
            ContentType::Movie => "movie",
            ContentType::Series => "series",
            ContentType::Anime => "anime",
        }
    }
}

impl Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "drama" => Ok(ContentType::Drama),
            "movie" => Ok(ContentType::Movie),
            "series" => Ok(ContentType::Series),
            "anime" => Ok(ContentType::Anime),
            other => Err(format!("unknown content type '{}'", other)),
        }
    }
}

/// A title in the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentItem {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    pub country: String,
    pub content_type: ContentType,
    pub genres: Vec<String>,
    /// Editorial rating on a 0-10 scale
    pub rating: f64,
    #[serde(default)]
    pub poster_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ContentItem {
    pub fn new(
        title: impl Into<String>,
        country: impl Into<String>,
        content_type: ContentType,
        genres: &[&str],
        rating: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            year: None,
            country: country.into(),
            content_type,
            genres: genres.iter().map(|g| g.to_string()).collect(),
            rating,
            poster_url: None,
            created_at: Utc::now(),
        }
    }

    pub fn has_genre(&self, genre: &str) -> bool {
        self.genres.iter().any(|g| g == genre)
    }

    /// Size of the set intersection between this item's genres and `genres`
    pub fn genre_overlap<'a, I>(&self, genres: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mine: HashSet<&str> = self.genres.iter().map(String::as_str).collect();
        let wanted: HashSet<&str> = genres.into_iter().collect();
        mine.intersection(&wanted).count()
    }
}

/// A user's score for one catalog item. Unique per (user, content).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rating {
    pub user_id: Uuid,
    pub content_id: Uuid,
    pub rating: f64,
    pub created_at: DateTime<Utc>,
}

impl Rating {
    pub fn new(user_id: Uuid, content_id: Uuid, rating: f64) -> Self {
        Self {
            user_id,
            content_id,
            rating,
            created_at: Utc::now(),
        }
    }
}

/// Interactions counted by the trending view
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Review,
    WatchlistUpdate,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::Review => "review",
            InteractionKind::WatchlistUpdate => "watchlist_update",
        }
    }
}
