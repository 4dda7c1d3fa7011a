use std::collections::HashSet;

use uuid::Uuid;

use crate::{
    db::{CatalogStore, ContentFilter},
    error::AppResult,
    models::{ContentItem, RecommendationType, ScoredRecommendation, TastePreferenceProfile},
    services::preferences,
};

const MATCH_GENRES: usize = 3;
const MATCH_COUNTRIES: usize = 2;

const GENRE_WEIGHT: f64 = 0.3;
const COUNTRY_WEIGHT: f64 = 0.4;
const RATING_WEIGHT: f64 = 0.1;

/// Confidence for a matched item, clamped to `[0, 1]`
pub fn confidence(item: &ContentItem, profile: &TastePreferenceProfile) -> f64 {
    let genre_overlap = item.genre_overlap(profile.favorite_genres.iter().map(|g| g.genre.as_str()));
    let country_match = profile
        .favorite_countries
        .iter()
        .any(|c| c.country == item.country);

    let score = genre_overlap as f64 * GENRE_WEIGHT
        + if country_match { COUNTRY_WEIGHT } else { 0.0 }
        + item.rating * RATING_WEIGHT;

    score.clamp(0.0, 1.0)
}

/// Ranks unseen catalog items against a taste profile.
///
/// An item qualifies when it carries one of the top 3 genres or comes from one
/// of the top 2 countries, is rated at least `min_rating_threshold`, and is not
/// in `rated`. Qualifying items are ordered by rating.
pub fn match_content(
    profile: &TastePreferenceProfile,
    candidates: Vec<ContentItem>,
    rated: &HashSet<Uuid>,
    limit: usize,
) -> Vec<ScoredRecommendation> {
    if profile.favorite_genres.is_empty() {
        return Vec::new();
    }

    let genres = profile.top_genres(MATCH_GENRES);
    let countries = profile.top_countries(MATCH_COUNTRIES);

    let mut seen = HashSet::new();
    let mut matched: Vec<ContentItem> = candidates
        .into_iter()
        .filter(|item| !rated.contains(&item.id))
        .filter(|item| item.rating >= profile.min_rating_threshold)
        .filter(|item| {
            item.genre_overlap(genres.iter().copied()) > 0
                || countries.contains(&item.country.as_str())
        })
        .filter(|item| seen.insert(item.id))
        .collect();

    matched.sort_by(|a, b| b.rating.total_cmp(&a.rating));
    matched.truncate(limit);

    matched
        .into_iter()
        .map(|content| ScoredRecommendation {
            confidence_score: confidence(&content, profile),
            content,
            recommendation_type: RecommendationType::ContentBased,
        })
        .collect()
}

/// Content-based recommendations for a user, computed from scratch
pub async fn content_based_recommendations(
    store: &dyn CatalogStore,
    user_id: Uuid,
    limit: usize,
) -> AppResult<Vec<ScoredRecommendation>> {
    let ratings = store.get_ratings(user_id).await?;
    let profile = preferences::analyze_ratings(store, &ratings).await?;
    let rated: HashSet<Uuid> = ratings.iter().map(|r| r.content_id).collect();

    recommend_for_profile(store, &profile, &rated, limit).await
}

/// Content-based recommendations for an already-derived profile
pub async fn recommend_for_profile(
    store: &dyn CatalogStore,
    profile: &TastePreferenceProfile,
    rated: &HashSet<Uuid>,
    limit: usize,
) -> AppResult<Vec<ScoredRecommendation>> {
    if profile.favorite_genres.is_empty() {
        return Ok(Vec::new());
    }

    let by_genre = ContentFilter::default()
        .with_genres_any(profile.top_genres(MATCH_GENRES))
        .with_min_rating(profile.min_rating_threshold);
    let mut candidates = store.get_content_items(&by_genre).await?;

    for country in profile.top_countries(MATCH_COUNTRIES) {
        let by_country = ContentFilter::default()
            .with_country(country)
            .with_min_rating(profile.min_rating_threshold);
        candidates.extend(store.get_content_items(&by_country).await?);
    }

    let recommendations = match_content(profile, candidates, rated, limit);

    tracing::debug!(count = recommendations.len(), "Content-based matches");

    Ok(recommendations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::MockCatalogStore;
    use crate::models::{ContentType, CountryScore, GenreScore, Rating};

    fn profile(genres: &[&str], countries: &[&str]) -> TastePreferenceProfile {
        TastePreferenceProfile {
            favorite_genres: genres
                .iter()
                .map(|g| GenreScore {
                    genre: g.to_string(),
                    count: 1,
                    avg_rating: 8.0,
                    score: 8.0,
                })
                .collect(),
            favorite_countries: countries
                .iter()
                .map(|c| CountryScore {
                    country: c.to_string(),
                    count: 1,
                    avg_rating: 8.0,
                    score: 1.0,
                })
                .collect(),
            min_rating_threshold: 6.0,
        }
    }

    fn item(country: &str, genres: &[&str], rating: f64) -> ContentItem {
        ContentItem::new("t", country, ContentType::Drama, genres, rating)
    }

    #[test]
    fn test_empty_profile_matches_nothing() {
        let candidates = vec![item("KR", &["romance"], 9.0)];
        let recs = match_content(&profile(&[], &["KR"]), candidates, &HashSet::new(), 10);
        assert!(recs.is_empty());
    }

    #[test]
    fn test_excludes_rated_and_low_rated_items() {
        let p = profile(&["romance"], &["KR"]);
        let rated_item = item("KR", &["romance"], 9.0);
        let low = item("KR", &["romance"], 5.9);
        let good = item("JP", &["romance"], 7.0);
        let rated: HashSet<Uuid> = [rated_item.id].into_iter().collect();

        let recs = match_content(&p, vec![rated_item, low, good.clone()], &rated, 10);

        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].content_id(), good.id);
        assert_eq!(recs[0].recommendation_type, RecommendationType::ContentBased);
    }

    #[test]
    fn test_matches_on_country_alone() {
        let p = profile(&["romance"], &["KR"]);
        let by_country = item("KR", &["horror"], 8.0);
        let neither = item("US", &["horror"], 8.0);

        let recs = match_content(&p, vec![by_country.clone(), neither], &HashSet::new(), 10);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].content_id(), by_country.id);
    }

    #[test]
    fn test_only_top_three_genres_select() {
        let p = profile(&["a", "b", "c", "d"], &[]);
        let fourth_only = item("KR", &["d"], 9.0);
        let recs = match_content(&p, vec![fourth_only], &HashSet::new(), 10);
        assert!(recs.is_empty());
    }

    #[test]
    fn test_sorted_by_rating_and_truncated() {
        let p = profile(&["romance"], &[]);
        let items = vec![
            item("KR", &["romance"], 7.0),
            item("KR", &["romance"], 9.5),
            item("KR", &["romance"], 8.0),
        ];

        let recs = match_content(&p, items, &HashSet::new(), 2);
        let ratings: Vec<f64> = recs.iter().map(|r| r.content.rating).collect();
        assert_eq!(ratings, vec![9.5, 8.0]);
    }

    #[test]
    fn test_duplicate_candidates_collapse() {
        let p = profile(&["romance"], &["KR"]);
        let both = item("KR", &["romance"], 8.0);
        let recs = match_content(&p, vec![both.clone(), both], &HashSet::new(), 10);
        assert_eq!(recs.len(), 1);
    }

    #[test]
    fn test_confidence_formula_and_clamp() {
        let p = profile(&["romance", "comedy"], &["KR"]);

        // 1 * 0.3 + 0 + 6.0 * 0.1
        let weak = item("JP", &["romance"], 6.0);
        assert!((confidence(&weak, &p) - 0.9).abs() < 1e-9);

        // 2 * 0.3 + 0.4 + 0.9 saturates
        let strong = item("KR", &["romance", "comedy"], 9.0);
        assert_eq!(confidence(&strong, &p), 1.0);

        for rec in match_content(&p, vec![weak, strong], &HashSet::new(), 10) {
            assert!((0.0..=1.0).contains(&rec.confidence_score));
        }
    }

    #[tokio::test]
    async fn test_user_without_ratings_gets_nothing() {
        let mut store = MockCatalogStore::new();
        store.expect_get_ratings().returning(|_| Ok(vec![]));
        store.expect_get_content_items().never();

        let recs = content_based_recommendations(&store, Uuid::new_v4(), 10)
            .await
            .unwrap();
        assert!(recs.is_empty());
    }

    #[tokio::test]
    async fn test_recommendations_skip_rated_items() {
        let user = Uuid::new_v4();
        let liked = item("KR", &["thriller"], 8.5);
        let fresh = item("KR", &["thriller", "crime"], 8.0);
        let ratings = vec![Rating::new(user, liked.id, 9.0)];
        let catalog = vec![liked, fresh.clone()];

        let mut store = MockCatalogStore::new();
        store
            .expect_get_ratings()
            .returning(move |_| Ok(ratings.clone()));
        store
            .expect_get_content_items()
            .returning(move |filter| {
                Ok(catalog.iter().filter(|c| filter.matches(c)).cloned().collect())
            });

        let recs = content_based_recommendations(&store, user, 10).await.unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].content_id(), fresh.id);
    }
}
