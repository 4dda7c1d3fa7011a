use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::{CatalogStore, ContentFilter},
    error::AppResult,
    models::{
        PeerSimilarityRecord, Rating, RecommendationType, ScoredRecommendation,
        TastePreferenceProfile, TimePeriod,
    },
    services::{content_based, peers, preferences, trending},
};

/// Tunable weights for the blended "for you" list
#[derive(Debug, Clone, Copy)]
pub struct BlendWeights {
    /// Multiplied by the peer's similarity score
    pub collaborative: f64,
    /// Flat confidence for trending items in a favorite genre
    pub trending: f64,
}

impl Default for BlendWeights {
    fn default() -> Self {
        Self {
            collaborative: 0.7,
            trending: 0.6,
        }
    }
}

const PEER_LIMIT: usize = 10;
const TRENDING_PERIOD: TimePeriod = TimePeriod::Week;

/// Personalized recommendations plus the profile that produced them
#[derive(Debug, Clone, Serialize)]
pub struct PersonalizedRecommendations {
    pub recommendations: Vec<ScoredRecommendation>,
    pub user_preferences: TastePreferenceProfile,
}

/// Merges candidate lists into one ranked list.
///
/// The combined list is sorted by confidence (stable, so earlier sources win
/// ties) and the first occurrence of each content id is kept.
pub fn merge_recommendations(
    sources: Vec<Vec<ScoredRecommendation>>,
    limit: usize,
) -> Vec<ScoredRecommendation> {
    let mut combined: Vec<ScoredRecommendation> = sources.into_iter().flatten().collect();
    combined.sort_by(|a, b| b.confidence_score.total_cmp(&a.confidence_score));

    let mut seen = HashSet::new();
    combined.retain(|rec| seen.insert(rec.content_id()));
    combined.truncate(limit);
    combined
}

/// Items liked by similar users that the target user has not rated
pub async fn collaborative_recommendations(
    store: &dyn CatalogStore,
    similar_users: &[PeerSimilarityRecord],
    rated: &HashSet<Uuid>,
    limit: usize,
    weights: BlendWeights,
) -> AppResult<Vec<ScoredRecommendation>> {
    let mut recommendations = Vec::new();

    for peer in similar_users.iter().filter(|p| p.similarity_score > 0.0) {
        let mut liked: Vec<_> = store
            .get_ratings(peer.peer_user_id)
            .await?
            .into_iter()
            .filter(|r| r.rating >= preferences::LIKED_RATING && !rated.contains(&r.content_id))
            .collect();
        if liked.is_empty() {
            continue;
        }
        liked.sort_by(|a, b| b.rating.total_cmp(&a.rating));
        liked.truncate(limit);

        let ids: Vec<Uuid> = liked.iter().map(|r| r.content_id).collect();
        let items = store.get_content_items(&ContentFilter::ids(ids.clone())).await?;

        // Keep the peer's preference order
        for id in ids {
            if let Some(item) = items.iter().find(|item| item.id == id) {
                recommendations.push(ScoredRecommendation {
                    content: item.clone(),
                    recommendation_type: RecommendationType::Collaborative,
                    confidence_score: weights.collaborative * peer.similarity_score,
                });
            }
        }
    }

    Ok(recommendations)
}

/// Finds similar users, then collects what they liked
async fn collaborative_for_user(
    store: &dyn CatalogStore,
    user_id: Uuid,
    ratings: &[Rating],
    rated: &HashSet<Uuid>,
    limit: usize,
    weights: BlendWeights,
) -> AppResult<Vec<ScoredRecommendation>> {
    let similar_users = peers::find_similar_users_for(store, user_id, ratings, PEER_LIMIT).await?;
    collaborative_recommendations(store, &similar_users, rated, limit, weights).await
}

/// Trending items in the user's favorite genres
pub async fn trending_recommendations(
    store: &dyn CatalogStore,
    profile: &TastePreferenceProfile,
    rated: &HashSet<Uuid>,
    limit: usize,
    now: DateTime<Utc>,
    weights: BlendWeights,
) -> AppResult<Vec<ScoredRecommendation>> {
    if profile.favorite_genres.is_empty() {
        return Ok(Vec::new());
    }

    let filter = ContentFilter::default()
        .with_genres_any(profile.favorite_genres.iter().map(|g| g.genre.clone()));
    let candidates =
        trending::trending_matching(store, &filter, TRENDING_PERIOD, limit + rated.len(), now)
            .await?;

    Ok(candidates
        .into_iter()
        .filter(|t| !rated.contains(&t.content.id))
        .take(limit)
        .map(|t| ScoredRecommendation {
            content: t.content,
            recommendation_type: RecommendationType::Trending,
            confidence_score: weights.trending,
        })
        .collect())
}

/// Builds the blended "for you" list for a user.
///
/// The three sources only share the taste profile and run concurrently. A
/// source with nothing to offer contributes an empty list; a storage failure
/// in any of them fails the request.
pub async fn recommend_for_user(
    store: &dyn CatalogStore,
    user_id: Uuid,
    limit: usize,
    now: DateTime<Utc>,
    weights: BlendWeights,
) -> AppResult<PersonalizedRecommendations> {
    let ratings = store.get_ratings(user_id).await?;
    let rated: HashSet<Uuid> = ratings.iter().map(|r| r.content_id).collect();
    let profile = preferences::analyze_ratings(store, &ratings).await?;

    let collaborative = collaborative_for_user(store, user_id, &ratings, &rated, limit, weights);
    let content = content_based::recommend_for_profile(store, &profile, &rated, limit);
    let trending = trending_recommendations(store, &profile, &rated, limit, now, weights);

    let (collaborative, content, trending) = tokio::join!(collaborative, content, trending);
    let sources = vec![collaborative?, content?, trending?];

    tracing::info!(
        user_id = %user_id,
        collaborative = sources[0].len(),
        content_based = sources[1].len(),
        trending = sources[2].len(),
        "Collected recommendation candidates"
    );

    let recommendations = merge_recommendations(sources, limit);

    Ok(PersonalizedRecommendations {
        recommendations,
        user_preferences: profile,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::MockCatalogStore;
    use crate::models::{ContentItem, ContentType};

    fn rec(content: &ContentItem, kind: RecommendationType, confidence: f64) -> ScoredRecommendation {
        ScoredRecommendation {
            content: content.clone(),
            recommendation_type: kind,
            confidence_score: confidence,
        }
    }

    fn item(genres: &[&str], rating: f64) -> ContentItem {
        ContentItem::new("t", "KR", ContentType::Drama, genres, rating)
    }

    #[test]
    fn test_merge_keeps_highest_confidence_per_item() {
        let a = item(&["romance"], 8.0);
        let b = item(&["romance"], 8.0);

        let merged = merge_recommendations(
            vec![
                vec![rec(&a, RecommendationType::Collaborative, 0.35)],
                vec![
                    rec(&a, RecommendationType::ContentBased, 0.9),
                    rec(&b, RecommendationType::ContentBased, 0.8),
                ],
                vec![rec(&b, RecommendationType::Trending, 0.6)],
            ],
            10,
        );

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].content_id(), a.id);
        assert_eq!(merged[0].recommendation_type, RecommendationType::ContentBased);
        assert_eq!(merged[1].content_id(), b.id);
        assert_eq!(merged[1].confidence_score, 0.8);
    }

    #[test]
    fn test_merge_never_repeats_content() {
        let items: Vec<ContentItem> = (0..4).map(|_| item(&[], 7.0)).collect();
        let sources: Vec<Vec<ScoredRecommendation>> = (0..3)
            .map(|s| {
                items
                    .iter()
                    .map(|i| rec(i, RecommendationType::Trending, 0.1 * s as f64))
                    .collect()
            })
            .collect();

        let merged = merge_recommendations(sources, 50);
        let unique: HashSet<Uuid> = merged.iter().map(|r| r.content_id()).collect();
        assert_eq!(merged.len(), 4);
        assert_eq!(unique.len(), 4);
    }

    #[test]
    fn test_merge_tolerates_empty_sources_and_truncates() {
        let items: Vec<ContentItem> = (0..3).map(|_| item(&[], 7.0)).collect();
        let only = items
            .iter()
            .map(|i| rec(i, RecommendationType::ContentBased, 0.5))
            .collect();

        assert!(merge_recommendations(vec![vec![], vec![], vec![]], 10).is_empty());
        assert_eq!(merge_recommendations(vec![vec![], only], 2).len(), 2);
    }

    #[tokio::test]
    async fn test_collaborative_scales_by_similarity_and_skips_rated() {
        let peer = Uuid::new_v4();
        let seen = item(&["romance"], 8.0);
        let unseen = item(&["romance"], 8.0);
        let disliked = item(&["romance"], 8.0);
        let peer_ratings = vec![
            Rating::new(peer, seen.id, 9.0),
            Rating::new(peer, unseen.id, 8.0),
            Rating::new(peer, disliked.id, 3.0),
        ];
        let catalog = vec![seen.clone(), unseen.clone(), disliked];

        let mut store = MockCatalogStore::new();
        store
            .expect_get_ratings()
            .returning(move |_| Ok(peer_ratings.clone()));
        store
            .expect_get_content_items()
            .returning(move |filter| {
                Ok(catalog.iter().filter(|c| filter.matches(c)).cloned().collect())
            });

        let similar = vec![PeerSimilarityRecord {
            peer_user_id: peer,
            similarity_score: 0.5,
            shared_rating_count: 3,
        }];
        let rated: HashSet<Uuid> = [seen.id].into_iter().collect();

        let recs = collaborative_recommendations(&store, &similar, &rated, 10, BlendWeights::default())
            .await
            .unwrap();

        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].content_id(), unseen.id);
        assert!((recs[0].confidence_score - 0.35).abs() < 1e-9);
        assert_eq!(recs[0].recommendation_type, RecommendationType::Collaborative);
    }

    #[tokio::test]
    async fn test_collaborative_ignores_uncorrelated_peers() {
        let mut store = MockCatalogStore::new();
        store.expect_get_ratings().never();

        let similar = vec![PeerSimilarityRecord {
            peer_user_id: Uuid::new_v4(),
            similarity_score: 0.0,
            shared_rating_count: 4,
        }];

        let recs = collaborative_recommendations(
            &store,
            &similar,
            &HashSet::new(),
            10,
            BlendWeights::default(),
        )
        .await
        .unwrap();
        assert!(recs.is_empty());
    }

    #[tokio::test]
    async fn test_new_user_gets_empty_list_and_profile() {
        let mut store = MockCatalogStore::new();
        store.expect_get_ratings().returning(|_| Ok(vec![]));
        store.expect_get_content_items().never();

        let result = recommend_for_user(&store, Uuid::new_v4(), 10, Utc::now(), BlendWeights::default())
            .await
            .unwrap();

        assert!(result.recommendations.is_empty());
        assert!(result.user_preferences.favorite_genres.is_empty());
        assert_eq!(result.user_preferences.min_rating_threshold, 6.0);
    }
}
