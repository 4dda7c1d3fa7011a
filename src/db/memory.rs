use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    db::{CatalogStore, ContentFilter},
    error::AppResult,
    models::{ContentItem, InteractionKind, Rating},
};

/// Catalog store held entirely in process memory.
///
/// Used when no database is configured and by the HTTP tests.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<InMemoryStoreInner>>,
}

#[derive(Default)]
struct InMemoryStoreInner {
    /// Insertion order, so listings are stable
    content_order: Vec<Uuid>,
    content: HashMap<Uuid, ContentItem>,
    ratings: HashMap<(Uuid, Uuid), Rating>,
    interactions: Vec<Interaction>,
}

struct Interaction {
    content_id: Uuid,
    kind: InteractionKind,
    occurred_at: DateTime<Utc>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a review or watchlist status change against an item
    pub async fn record_interaction(
        &self,
        content_id: Uuid,
        kind: InteractionKind,
        occurred_at: DateTime<Utc>,
    ) {
        let mut inner = self.inner.write().await;
        inner.interactions.push(Interaction {
            content_id,
            kind,
            occurred_at,
        });
    }
}

#[async_trait::async_trait]
impl CatalogStore for InMemoryStore {
    async fn get_ratings(&self, user_id: Uuid) -> AppResult<Vec<Rating>> {
        let inner = self.inner.read().await;
        let mut ratings: Vec<Rating> = inner
            .ratings
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        ratings.sort_by_key(|r| (r.created_at, r.content_id));
        Ok(ratings)
    }

    async fn get_ratings_for_content(
        &self,
        content_ids: &[Uuid],
        exclude_user: Uuid,
    ) -> AppResult<Vec<Rating>> {
        let inner = self.inner.read().await;
        let mut ratings: Vec<Rating> = inner
            .ratings
            .values()
            .filter(|r| r.user_id != exclude_user && content_ids.contains(&r.content_id))
            .cloned()
            .collect();
        ratings.sort_by_key(|r| (r.user_id, r.created_at, r.content_id));
        Ok(ratings)
    }

    async fn get_content_item(&self, id: Uuid) -> AppResult<Option<ContentItem>> {
        let inner = self.inner.read().await;
        Ok(inner.content.get(&id).cloned())
    }

    async fn get_content_items(&self, filter: &ContentFilter) -> AppResult<Vec<ContentItem>> {
        let inner = self.inner.read().await;
        Ok(inner
            .content_order
            .iter()
            .filter_map(|id| inner.content.get(id))
            .filter(|item| filter.matches(item))
            .cloned()
            .collect())
    }

    async fn list_content(
        &self,
        filter: &ContentFilter,
        offset: usize,
        limit: usize,
    ) -> AppResult<Vec<ContentItem>> {
        let mut matching = self.get_content_items(filter).await?;
        // Stable, so items created together keep insertion order
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching.into_iter().skip(offset).take(limit).collect())
    }

    async fn count_content(&self, filter: &ContentFilter) -> AppResult<u64> {
        let inner = self.inner.read().await;
        Ok(inner.content.values().filter(|item| filter.matches(item)).count() as u64)
    }

    async fn insert_content(&self, item: ContentItem) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if !inner.content.contains_key(&item.id) {
            inner.content_order.push(item.id);
        }
        inner.content.insert(item.id, item);
        Ok(())
    }

    async fn count_interactions_since(
        &self,
        content_id: Uuid,
        since: DateTime<Utc>,
        kind: InteractionKind,
    ) -> AppResult<u64> {
        let inner = self.inner.read().await;
        let count = inner
            .interactions
            .iter()
            .filter(|i| i.content_id == content_id && i.kind == kind && i.occurred_at >= since)
            .count();
        Ok(count as u64)
    }

    async fn count_interactions_since_batch(
        &self,
        content_ids: &[Uuid],
        since: DateTime<Utc>,
        kind: InteractionKind,
    ) -> AppResult<HashMap<Uuid, u64>> {
        let inner = self.inner.read().await;
        let mut counts: HashMap<Uuid, u64> = content_ids.iter().map(|id| (*id, 0)).collect();
        for interaction in inner
            .interactions
            .iter()
            .filter(|i| i.kind == kind && i.occurred_at >= since)
        {
            if let Some(count) = counts.get_mut(&interaction.content_id) {
                *count += 1;
            }
        }
        Ok(counts)
    }

    async fn upsert_rating(&self, rating: Rating) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner
            .ratings
            .insert((rating.user_id, rating.content_id), rating);
        Ok(())
    }

    async fn list_countries(&self) -> AppResult<Vec<String>> {
        let inner = self.inner.read().await;
        let countries: BTreeSet<&str> = inner.content.values().map(|c| c.country.as_str()).collect();
        Ok(countries.into_iter().map(str::to_string).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentType;
    use chrono::Duration;

    #[tokio::test]
    async fn test_upsert_rating_replaces_existing() {
        let store = InMemoryStore::new();
        let user = Uuid::new_v4();
        let content = Uuid::new_v4();

        store.upsert_rating(Rating::new(user, content, 4.0)).await.unwrap();
        store.upsert_rating(Rating::new(user, content, 9.0)).await.unwrap();

        let ratings = store.get_ratings(user).await.unwrap();
        assert_eq!(ratings.len(), 1);
        assert_eq!(ratings[0].rating, 9.0);
    }

    #[tokio::test]
    async fn test_ratings_for_content_excludes_user() {
        let store = InMemoryStore::new();
        let me = Uuid::new_v4();
        let peer = Uuid::new_v4();
        let shared = Uuid::new_v4();
        let other = Uuid::new_v4();

        store.upsert_rating(Rating::new(me, shared, 8.0)).await.unwrap();
        store.upsert_rating(Rating::new(peer, shared, 7.0)).await.unwrap();
        store.upsert_rating(Rating::new(peer, other, 3.0)).await.unwrap();

        let ratings = store.get_ratings_for_content(&[shared], me).await.unwrap();
        assert_eq!(ratings.len(), 1);
        assert_eq!(ratings[0].user_id, peer);
        assert_eq!(ratings[0].content_id, shared);
    }

    #[tokio::test]
    async fn test_content_items_keep_insertion_order() {
        let store = InMemoryStore::new();
        let first = ContentItem::new("First", "KR", ContentType::Drama, &["romance"], 8.0);
        let second = ContentItem::new("Second", "JP", ContentType::Anime, &["action"], 7.0);
        store.insert_content(first.clone()).await.unwrap();
        store.insert_content(second.clone()).await.unwrap();

        let all = store.get_content_items(&ContentFilter::default()).await.unwrap();
        assert_eq!(all, vec![first, second.clone()]);

        let anime = store
            .get_content_items(&ContentFilter::default().with_content_type(ContentType::Anime))
            .await
            .unwrap();
        assert_eq!(anime, vec![second]);
    }

    #[tokio::test]
    async fn test_interaction_counts_respect_window_and_kind() {
        let store = InMemoryStore::new();
        let content = Uuid::new_v4();
        let now = Utc::now();

        store.record_interaction(content, InteractionKind::Review, now).await;
        store
            .record_interaction(content, InteractionKind::Review, now - Duration::days(10))
            .await;
        store
            .record_interaction(content, InteractionKind::WatchlistUpdate, now)
            .await;

        let since = now - Duration::days(7);
        let reviews = store
            .count_interactions_since(content, since, InteractionKind::Review)
            .await
            .unwrap();
        assert_eq!(reviews, 1);

        let batch = store
            .count_interactions_since_batch(&[content], since, InteractionKind::WatchlistUpdate)
            .await
            .unwrap();
        assert_eq!(batch.get(&content), Some(&1));
    }

    #[tokio::test]
    async fn test_list_content_pages_newest_first() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        for (i, title) in ["Oldest", "Middle", "Newest"].iter().enumerate() {
            let mut item = ContentItem::new(*title, "KR", ContentType::Drama, &["romance"], 8.0);
            item.created_at = now + Duration::minutes(i as i64);
            store.insert_content(item).await.unwrap();
        }
        store
            .insert_content(ContentItem::new("Elsewhere", "JP", ContentType::Anime, &[], 7.0))
            .await
            .unwrap();

        let korean = ContentFilter::default().with_country("KR");
        let first = store.list_content(&korean, 0, 2).await.unwrap();
        let titles: Vec<&str> = first.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Newest", "Middle"]);

        let second = store.list_content(&korean, 2, 2).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].title, "Oldest");

        assert_eq!(store.count_content(&korean).await.unwrap(), 3);
        assert_eq!(store.count_content(&ContentFilter::default()).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_list_countries_sorted_distinct() {
        let store = InMemoryStore::new();
        store.insert_content(ContentItem::new("a", "KR", ContentType::Drama, &[], 8.0)).await.unwrap();
        store.insert_content(ContentItem::new("b", "JP", ContentType::Anime, &[], 8.0)).await.unwrap();
        store.insert_content(ContentItem::new("c", "KR", ContentType::Movie, &[], 8.0)).await.unwrap();

        assert_eq!(store.list_countries().await.unwrap(), vec!["JP", "KR"]);
    }
}
