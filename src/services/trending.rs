use std::collections::HashSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    db::{CatalogStore, ContentFilter},
    error::{AppError, AppResult},
    models::{ContentItem, InteractionKind, SimilarContent, TimePeriod, TrendingContent},
};

const SHARED_GENRE_WEIGHT: f64 = 0.4;
const SAME_COUNTRY_WEIGHT: f64 = 0.3;
const SAME_TYPE_WEIGHT: f64 = 0.2;
const RATING_PROXIMITY_WEIGHT: f64 = 0.1;

/// Ratings live on a 0-10 scale
const RATING_SCALE: f64 = 10.0;

const REVIEW_WEIGHT: f64 = 3.0;
const WATCHLIST_WEIGHT: f64 = 2.0;
const TRENDING_RATING_WEIGHT: f64 = 0.5;

/// Similarity of `candidate` to `reference`.
///
/// The rating-proximity term uses the rating gap normalized to `[0, 1]`, so it
/// always contributes between 0 and 0.1.
pub fn item_similarity(reference: &ContentItem, candidate: &ContentItem) -> f64 {
    let shared_genres = candidate.genre_overlap(reference.genres.iter().map(String::as_str));
    let same_country = candidate.country == reference.country;
    let same_type = candidate.content_type == reference.content_type;
    let rating_gap = ((candidate.rating - reference.rating).abs() / RATING_SCALE).clamp(0.0, 1.0);

    shared_genres as f64 * SHARED_GENRE_WEIGHT
        + if same_country { SAME_COUNTRY_WEIGHT } else { 0.0 }
        + if same_type { SAME_TYPE_WEIGHT } else { 0.0 }
        + (1.0 - rating_gap) * RATING_PROXIMITY_WEIGHT
}

/// Whether `candidate` shares a genre, the country, or the type with `reference`
fn is_related(reference: &ContentItem, candidate: &ContentItem) -> bool {
    candidate.genre_overlap(reference.genres.iter().map(String::as_str)) > 0
        || candidate.country == reference.country
        || candidate.content_type == reference.content_type
}

/// Ranks related items by `(similarity desc, rating desc)`
pub fn rank_similar(
    reference: &ContentItem,
    candidates: Vec<ContentItem>,
    limit: usize,
) -> Vec<SimilarContent> {
    let mut seen = HashSet::new();
    let mut ranked: Vec<SimilarContent> = candidates
        .into_iter()
        .filter(|c| c.id != reference.id && is_related(reference, c))
        .filter(|c| seen.insert(c.id))
        .map(|content| SimilarContent {
            similarity_score: item_similarity(reference, &content),
            content,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.similarity_score
            .total_cmp(&a.similarity_score)
            .then_with(|| b.content.rating.total_cmp(&a.content.rating))
    });
    ranked.truncate(limit);
    ranked
}

/// Loads `content_id` and the items most similar to it.
///
/// Returns [`AppError::NotFound`] when the reference item does not exist.
pub async fn similar_content(
    store: &dyn CatalogStore,
    content_id: Uuid,
    limit: usize,
) -> AppResult<(ContentItem, Vec<SimilarContent>)> {
    let reference = store
        .get_content_item(content_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Content {} not found", content_id)))?;

    let mut candidates = Vec::new();
    if !reference.genres.is_empty() {
        let by_genre = ContentFilter::default().with_genres_any(reference.genres.iter().cloned());
        candidates.extend(store.get_content_items(&by_genre).await?);
    }
    let by_country = ContentFilter::default().with_country(reference.country.clone());
    candidates.extend(store.get_content_items(&by_country).await?);
    let by_type = ContentFilter::default().with_content_type(reference.content_type);
    candidates.extend(store.get_content_items(&by_type).await?);

    let similar = rank_similar(&reference, candidates, limit);

    tracing::debug!(
        content_id = %content_id,
        count = similar.len(),
        "Ranked similar content"
    );

    Ok((reference, similar))
}

/// `3 * reviews + 2 * watchlist updates + 0.5 * rating`
pub fn trending_score(recent_reviews: u64, recent_watchlist_updates: u64, rating: f64) -> f64 {
    REVIEW_WEIGHT * recent_reviews as f64
        + WATCHLIST_WEIGHT * recent_watchlist_updates as f64
        + TRENDING_RATING_WEIGHT * rating
}

/// Scores items from their windowed interaction counts.
///
/// Each entry is `(item, recent reviews, recent watchlist updates)`. Items
/// scoring 0 or less are dropped; the rest are sorted by score.
pub fn rank_trending(entries: Vec<(ContentItem, u64, u64)>, limit: usize) -> Vec<TrendingContent> {
    let mut ranked: Vec<TrendingContent> = entries
        .into_iter()
        .map(|(content, reviews, updates)| TrendingContent {
            trending_score: trending_score(reviews, updates, content.rating),
            recent_reviews: reviews,
            recent_watchlist_updates: updates,
            content,
        })
        .filter(|t| t.trending_score > 0.0)
        .collect();

    ranked.sort_by(|a, b| b.trending_score.total_cmp(&a.trending_score));
    ranked.truncate(limit);
    ranked
}

/// Most active catalog items over the window ending at `now`
pub async fn trending_content(
    store: &dyn CatalogStore,
    period: TimePeriod,
    limit: usize,
    now: DateTime<Utc>,
) -> AppResult<Vec<TrendingContent>> {
    trending_matching(store, &ContentFilter::default(), period, limit, now).await
}

/// Trending view restricted to items passing `filter`
pub async fn trending_matching(
    store: &dyn CatalogStore,
    filter: &ContentFilter,
    period: TimePeriod,
    limit: usize,
    now: DateTime<Utc>,
) -> AppResult<Vec<TrendingContent>> {
    let items = store.get_content_items(filter).await?;
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let since = period.since(now);
    let ids: Vec<Uuid> = items.iter().map(|item| item.id).collect();

    let reviews = store
        .count_interactions_since_batch(&ids, since, InteractionKind::Review)
        .await?;
    let updates = store
        .count_interactions_since_batch(&ids, since, InteractionKind::WatchlistUpdate)
        .await?;

    let entries = items
        .into_iter()
        .map(|item| {
            let review_count = reviews.get(&item.id).copied().unwrap_or(0);
            let update_count = updates.get(&item.id).copied().unwrap_or(0);
            (item, review_count, update_count)
        })
        .collect();

    let trending = rank_trending(entries, limit);

    tracing::debug!(
        period = %period,
        since = %since,
        count = trending.len(),
        "Computed trending content"
    );

    Ok(trending)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::MockCatalogStore;
    use crate::models::ContentType;
    use std::collections::HashMap;

    fn item(country: &str, content_type: ContentType, genres: &[&str], rating: f64) -> ContentItem {
        ContentItem::new("t", country, content_type, genres, rating)
    }

    #[test]
    fn test_item_similarity_worked_example() {
        let a = item("KR", ContentType::Drama, &["thriller", "drama"], 8.5);
        let b = item("KR", ContentType::Movie, &["thriller"], 8.0);

        // 0.4 * 1 + 0.3 + 0 + 0.1 * (1 - 0.05)
        assert!((item_similarity(&a, &b) - 0.795).abs() < 1e-9);
    }

    #[test]
    fn test_rating_term_never_negative() {
        let a = item("KR", ContentType::Drama, &[], 10.0);
        let b = item("US", ContentType::Movie, &[], 0.0);
        assert!(item_similarity(&a, &b).abs() < 1e-12);
    }

    #[test]
    fn test_rank_similar_excludes_reference_and_unrelated() {
        let reference = item("KR", ContentType::Drama, &["romance"], 8.0);
        let unrelated = item("US", ContentType::Movie, &["horror"], 8.0);
        let related = item("US", ContentType::Movie, &["romance"], 8.0);

        let ranked = rank_similar(
            &reference,
            vec![reference.clone(), unrelated, related.clone(), related.clone()],
            10,
        );

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].content.id, related.id);
    }

    #[test]
    fn test_rank_similar_ties_broken_by_rating() {
        let reference = item("KR", ContentType::Drama, &["romance"], 5.0);
        // Same distance from the reference rating, so similarity is equal
        let lower = item("JP", ContentType::Anime, &["romance"], 4.0);
        let higher = item("JP", ContentType::Anime, &["romance"], 6.0);

        let ranked = rank_similar(&reference, vec![lower.clone(), higher.clone()], 10);
        assert_eq!(ranked[0].content.id, higher.id);
        assert_eq!(ranked[1].content.id, lower.id);
    }

    #[test]
    fn test_trending_score_worked_example() {
        assert!((trending_score(4, 2, 7.0) - 19.5).abs() < 1e-9);
    }

    #[test]
    fn test_rank_trending_drops_non_positive_and_sorts() {
        let quiet = item("KR", ContentType::Drama, &[], 0.0);
        let busy = item("KR", ContentType::Drama, &[], 7.0);
        let steady = item("KR", ContentType::Drama, &[], 9.0);

        let ranked = rank_trending(
            vec![(quiet, 0, 0), (steady.clone(), 0, 1), (busy.clone(), 4, 2)],
            10,
        );

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].content.id, busy.id);
        assert_eq!(ranked[0].recent_reviews, 4);
        assert_eq!(ranked[1].content.id, steady.id);
    }

    #[tokio::test]
    async fn test_similar_content_unknown_id_is_not_found() {
        let mut store = MockCatalogStore::new();
        store.expect_get_content_item().returning(|_| Ok(None));

        let result = similar_content(&store, Uuid::new_v4(), 10).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_trending_content_uses_window_counts() {
        let now = Utc::now();
        let hot = item("KR", ContentType::Drama, &["romance"], 7.0);
        let hot_id = hot.id;
        let catalog = vec![hot, item("JP", ContentType::Anime, &["action"], 6.0)];

        let mut store = MockCatalogStore::new();
        store
            .expect_get_content_items()
            .returning(move |filter| {
                Ok(catalog.iter().filter(|c| filter.matches(c)).cloned().collect())
            });
        store
            .expect_count_interactions_since_batch()
            .withf(move |_, since, _| *since == now - chrono::Duration::days(7))
            .returning(move |ids, _, kind| {
                let per_item = match kind {
                    InteractionKind::Review => 4,
                    InteractionKind::WatchlistUpdate => 2,
                };
                Ok(ids
                    .iter()
                    .map(|id| (*id, if *id == hot_id { per_item } else { 0 }))
                    .collect::<HashMap<Uuid, u64>>())
            });

        let trending = trending_content(&store, TimePeriod::Week, 10, now).await.unwrap();

        assert_eq!(trending.len(), 2);
        assert_eq!(trending[0].content.id, hot_id);
        assert!((trending[0].trending_score - 19.5).abs() < 1e-9);
        assert!((trending[1].trending_score - 3.0).abs() < 1e-9);
    }
}
