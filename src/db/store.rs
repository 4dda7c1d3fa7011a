//! Storage abstraction the recommendation services read from.
//!
//! The services never hold state between calls. Everything they need is
//! fetched through [`CatalogStore`] on each request.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{ContentItem, ContentType, InteractionKind, Rating},
};

/// Criteria for selecting catalog items. All set fields must hold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentFilter {
    pub ids: Option<Vec<Uuid>>,
    /// Item must carry at least one of these genres
    pub genres_any: Vec<String>,
    pub country: Option<String>,
    pub content_type: Option<ContentType>,
    pub min_rating: Option<f64>,
    pub max_rating: Option<f64>,
    pub year: Option<i32>,
    /// Case-insensitive substring of the title
    pub search: Option<String>,
}

impl ContentFilter {
    pub fn ids(ids: Vec<Uuid>) -> Self {
        Self {
            ids: Some(ids),
            ..Default::default()
        }
    }

    pub fn with_genres_any<I, S>(mut self, genres: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.genres_any = genres.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn with_min_rating(mut self, min_rating: f64) -> Self {
        self.min_rating = Some(min_rating);
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    /// Evaluates the filter against a single item
    pub fn matches(&self, item: &ContentItem) -> bool {
        if let Some(ids) = &self.ids {
            if !ids.contains(&item.id) {
                return false;
            }
        }
        if !self.genres_any.is_empty() && !self.genres_any.iter().any(|g| item.has_genre(g)) {
            return false;
        }
        if let Some(country) = &self.country {
            if &item.country != country {
                return false;
            }
        }
        if let Some(content_type) = self.content_type {
            if item.content_type != content_type {
                return false;
            }
        }
        if let Some(min) = self.min_rating {
            if item.rating < min {
                return false;
            }
        }
        if let Some(max) = self.max_rating {
            if item.rating > max {
                return false;
            }
        }
        if self.year.is_some() && item.year != self.year {
            return false;
        }
        if let Some(term) = &self.search {
            if !item.title.to_lowercase().contains(&term.to_lowercase()) {
                return false;
            }
        }
        true
    }
}

/// Trait for catalog and interaction storage backends
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    /// All ratings given by a user
    async fn get_ratings(&self, user_id: Uuid) -> AppResult<Vec<Rating>>;

    /// Ratings of any of `content_ids` by users other than `exclude_user`
    async fn get_ratings_for_content(
        &self,
        content_ids: &[Uuid],
        exclude_user: Uuid,
    ) -> AppResult<Vec<Rating>>;

    async fn get_content_item(&self, id: Uuid) -> AppResult<Option<ContentItem>>;

    async fn get_content_items(&self, filter: &ContentFilter) -> AppResult<Vec<ContentItem>>;

    /// One page of matching items, newest first
    async fn list_content(
        &self,
        filter: &ContentFilter,
        offset: usize,
        limit: usize,
    ) -> AppResult<Vec<ContentItem>>;

    /// Number of items matching `filter`
    async fn count_content(&self, filter: &ContentFilter) -> AppResult<u64>;

    /// Adds a catalog item, replacing any item with the same id
    async fn insert_content(&self, item: ContentItem) -> AppResult<()>;

    /// Number of interactions of `kind` on an item at or after `since`
    async fn count_interactions_since(
        &self,
        content_id: Uuid,
        since: DateTime<Utc>,
        kind: InteractionKind,
    ) -> AppResult<u64>;

    /// Interaction counts for many items at once
    ///
    /// Default implementation issues one `count_interactions_since` per item.
    /// Backends that can group in a single query should override it.
    async fn count_interactions_since_batch(
        &self,
        content_ids: &[Uuid],
        since: DateTime<Utc>,
        kind: InteractionKind,
    ) -> AppResult<HashMap<Uuid, u64>> {
        let mut counts = HashMap::with_capacity(content_ids.len());
        for id in content_ids {
            let count = self.count_interactions_since(*id, since, kind).await?;
            counts.insert(*id, count);
        }
        Ok(counts)
    }

    /// Inserts or replaces the rating for `(user_id, content_id)`
    async fn upsert_rating(&self, rating: Rating) -> AppResult<()>;

    /// Distinct production countries, sorted
    async fn list_countries(&self) -> AppResult<Vec<String>>;
}
