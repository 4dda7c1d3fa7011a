//! Starter catalog for fresh deployments.

use crate::{
    db::{CatalogStore, ContentFilter},
    error::AppResult,
    models::{ContentItem, ContentType},
};

fn entry(
    title: &str,
    year: i32,
    country: &str,
    content_type: ContentType,
    genres: &[&str],
    rating: f64,
) -> ContentItem {
    let mut item = ContentItem::new(title, country, content_type, genres, rating);
    item.year = Some(year);
    item
}

/// A handful of well-known titles across countries and content types
pub fn sample_catalog() -> Vec<ContentItem> {
    vec![
        entry("Squid Game", 2021, "South Korea", ContentType::Series, &["thriller", "drama", "mystery"], 8.7),
        entry("Parasite", 2019, "South Korea", ContentType::Movie, &["thriller", "drama", "comedy"], 8.5),
        entry("Your Name", 2016, "Japan", ContentType::Anime, &["romance", "fantasy", "drama"], 8.4),
        entry("3 Idiots", 2009, "India", ContentType::Movie, &["comedy", "drama"], 8.4),
        entry("The Handmaiden", 2016, "South Korea", ContentType::Movie, &["thriller", "drama", "mystery"], 8.1),
        entry("Money Heist", 2017, "Spain", ContentType::Series, &["crime", "thriller", "drama"], 8.2),
        entry("Crash Landing on You", 2019, "South Korea", ContentType::Drama, &["romance", "comedy", "drama"], 8.7),
        entry("Spirited Away", 2001, "Japan", ContentType::Anime, &["fantasy", "adventure"], 8.6),
    ]
}

/// Loads [`sample_catalog`] when the store holds no content.
///
/// Returns the number of items inserted, 0 if the catalog was already populated.
pub async fn seed_if_empty(store: &dyn CatalogStore) -> AppResult<usize> {
    if store.count_content(&ContentFilter::default()).await? > 0 {
        return Ok(0);
    }

    let catalog = sample_catalog();
    let count = catalog.len();
    for item in catalog {
        store.insert_content(item).await?;
    }

    tracing::info!(count, "Seeded empty catalog with sample content");
    Ok(count)
}
