use std::collections::{BTreeMap, HashMap};

use uuid::Uuid;

use crate::{
    db::{CatalogStore, ContentFilter},
    error::AppResult,
    models::{ContentItem, CountryScore, GenreScore, Rating, TastePreferenceProfile},
};

/// Ratings at or above this count as "liked"
pub const LIKED_RATING: f64 = 7.0;

/// Recommendation floor handed to downstream matchers
pub const MIN_RATING_THRESHOLD: f64 = 6.0;

const TOP_GENRES: usize = 5;
const TOP_COUNTRIES: usize = 3;

#[derive(Default)]
struct Tally {
    count: usize,
    rating_sum: f64,
}

impl Tally {
    fn add(&mut self, rating: f64) {
        self.count += 1;
        self.rating_sum += rating;
    }

    fn avg(&self) -> f64 {
        self.rating_sum / self.count as f64
    }
}

/// Builds a taste profile from a user's liked ratings joined to their items.
///
/// Genres are ranked by `(count desc, avg_rating desc)` and countries by count;
/// remaining ties fall back to name order so the result is deterministic.
pub fn build_profile(liked: &[(f64, &ContentItem)]) -> TastePreferenceProfile {
    let mut genres: BTreeMap<&str, Tally> = BTreeMap::new();
    let mut countries: BTreeMap<&str, Tally> = BTreeMap::new();

    for (rating, item) in liked {
        for genre in &item.genres {
            genres.entry(genre.as_str()).or_default().add(*rating);
        }
        countries.entry(item.country.as_str()).or_default().add(*rating);
    }

    let mut favorite_genres: Vec<GenreScore> = genres
        .into_iter()
        .map(|(genre, tally)| GenreScore {
            genre: genre.to_string(),
            count: tally.count,
            avg_rating: tally.avg(),
            score: tally.count as f64 * tally.avg(),
        })
        .collect();
    favorite_genres.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| b.avg_rating.total_cmp(&a.avg_rating))
    });
    favorite_genres.truncate(TOP_GENRES);

    let mut favorite_countries: Vec<CountryScore> = countries
        .into_iter()
        .map(|(country, tally)| CountryScore {
            country: country.to_string(),
            count: tally.count,
            avg_rating: tally.avg(),
            score: tally.count as f64,
        })
        .collect();
    favorite_countries.sort_by(|a, b| b.count.cmp(&a.count));
    favorite_countries.truncate(TOP_COUNTRIES);

    TastePreferenceProfile {
        favorite_genres,
        favorite_countries,
        min_rating_threshold: MIN_RATING_THRESHOLD,
    }
}

/// Joins liked ratings to their catalog items, skipping items that no longer exist
pub fn liked_items<'a>(
    ratings: &[Rating],
    items: &'a HashMap<Uuid, ContentItem>,
) -> Vec<(f64, &'a ContentItem)> {
    ratings
        .iter()
        .filter(|r| r.rating >= LIKED_RATING)
        .filter_map(|r| items.get(&r.content_id).map(|item| (r.rating, item)))
        .collect()
}

/// Derives a user's taste profile from their rating history.
///
/// A user with no liked ratings gets an empty profile, not an error.
pub async fn analyze_preferences(
    store: &dyn CatalogStore,
    user_id: Uuid,
) -> AppResult<TastePreferenceProfile> {
    let ratings = store.get_ratings(user_id).await?;
    analyze_ratings(store, &ratings).await
}

/// Same as [`analyze_preferences`] for an already-loaded rating history
pub async fn analyze_ratings(
    store: &dyn CatalogStore,
    ratings: &[Rating],
) -> AppResult<TastePreferenceProfile> {
    let liked_ids: Vec<Uuid> = ratings
        .iter()
        .filter(|r| r.rating >= LIKED_RATING)
        .map(|r| r.content_id)
        .collect();

    if liked_ids.is_empty() {
        return Ok(build_profile(&[]));
    }

    let items: HashMap<Uuid, ContentItem> = store
        .get_content_items(&ContentFilter::ids(liked_ids))
        .await?
        .into_iter()
        .map(|item| (item.id, item))
        .collect();

    let profile = build_profile(&liked_items(ratings, &items));

    tracing::debug!(
        liked = items.len(),
        genres = profile.favorite_genres.len(),
        countries = profile.favorite_countries.len(),
        "Derived taste profile"
    );

    Ok(profile)
}
