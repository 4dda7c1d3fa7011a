use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    db::{CatalogStore, ContentFilter},
    error::{AppError, AppResult},
    models::{ContentItem, InteractionKind, Rating},
};

const CONTENT_COLUMNS: &str =
    "SELECT id, title, year, country, content_type, genres, rating, poster_url, created_at FROM content";

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the schema in `migrations/`
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[derive(Debug, sqlx::FromRow)]
struct ContentRow {
    id: Uuid,
    title: String,
    year: Option<i32>,
    country: String,
    content_type: String,
    genres: Vec<String>,
    rating: f64,
    poster_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ContentRow> for ContentItem {
    type Error = AppError;

    fn try_from(row: ContentRow) -> Result<Self, Self::Error> {
        let content_type = row.content_type.parse().map_err(AppError::Internal)?;
        Ok(ContentItem {
            id: row.id,
            title: row.title,
            year: row.year,
            country: row.country,
            content_type,
            genres: row.genres,
            rating: row.rating,
            poster_url: row.poster_url,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RatingRow {
    user_id: Uuid,
    content_id: Uuid,
    rating: f64,
    created_at: DateTime<Utc>,
}

impl From<RatingRow> for Rating {
    fn from(row: RatingRow) -> Self {
        Rating {
            user_id: row.user_id,
            content_id: row.content_id,
            rating: row.rating,
            created_at: row.created_at,
        }
    }
}

/// Escapes `%`, `_` and `\` so a search term matches literally
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Catalog store backed by PostgreSQL
#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_filter<'a>(builder: &mut QueryBuilder<'a, Postgres>, filter: &'a ContentFilter) {
        builder.push(" WHERE TRUE");
        if let Some(ids) = &filter.ids {
            builder.push(" AND id = ANY(").push_bind(ids).push(")");
        }
        if !filter.genres_any.is_empty() {
            builder.push(" AND genres && ").push_bind(&filter.genres_any);
        }
        if let Some(country) = &filter.country {
            builder.push(" AND country = ").push_bind(country);
        }
        if let Some(content_type) = filter.content_type {
            builder
                .push(" AND content_type = ")
                .push_bind(content_type.as_str());
        }
        if let Some(min) = filter.min_rating {
            builder.push(" AND rating >= ").push_bind(min);
        }
        if let Some(max) = filter.max_rating {
            builder.push(" AND rating <= ").push_bind(max);
        }
        if let Some(year) = filter.year {
            builder.push(" AND year = ").push_bind(year);
        }
        if let Some(term) = &filter.search {
            builder
                .push(" AND title ILIKE ")
                .push_bind(format!("%{}%", escape_like(term)));
        }
    }
}

#[async_trait::async_trait]
impl CatalogStore for PgCatalogStore {
    async fn get_ratings(&self, user_id: Uuid) -> AppResult<Vec<Rating>> {
        let rows: Vec<RatingRow> = sqlx::query_as(
            "SELECT user_id, content_id, rating, created_at FROM ratings \
             WHERE user_id = $1 ORDER BY created_at, content_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Rating::from).collect())
    }

    async fn get_ratings_for_content(
        &self,
        content_ids: &[Uuid],
        exclude_user: Uuid,
    ) -> AppResult<Vec<Rating>> {
        if content_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<RatingRow> = sqlx::query_as(
            "SELECT user_id, content_id, rating, created_at FROM ratings \
             WHERE content_id = ANY($1) AND user_id <> $2 \
             ORDER BY user_id, created_at, content_id",
        )
        .bind(content_ids)
        .bind(exclude_user)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Rating::from).collect())
    }

    async fn get_content_item(&self, id: Uuid) -> AppResult<Option<ContentItem>> {
        let row: Option<ContentRow> = sqlx::query_as(&format!("{} WHERE id = $1", CONTENT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(ContentItem::try_from).transpose()
    }

    async fn get_content_items(&self, filter: &ContentFilter) -> AppResult<Vec<ContentItem>> {
        let mut builder = QueryBuilder::<Postgres>::new(CONTENT_COLUMNS);
        Self::push_filter(&mut builder, filter);
        builder.push(" ORDER BY created_at, id");

        let rows: Vec<ContentRow> = builder.build_query_as().fetch_all(&self.pool).await?;

        tracing::debug!(count = rows.len(), "Loaded content items");

        rows.into_iter().map(ContentItem::try_from).collect()
    }

    async fn list_content(
        &self,
        filter: &ContentFilter,
        offset: usize,
        limit: usize,
    ) -> AppResult<Vec<ContentItem>> {
        let mut builder = QueryBuilder::<Postgres>::new(CONTENT_COLUMNS);
        Self::push_filter(&mut builder, filter);
        builder
            .push(" ORDER BY created_at DESC, id LIMIT ")
            .push_bind(limit as i64)
            .push(" OFFSET ")
            .push_bind(offset as i64);

        let rows: Vec<ContentRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(ContentItem::try_from).collect()
    }

    async fn count_content(&self, filter: &ContentFilter) -> AppResult<u64> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM content");
        Self::push_filter(&mut builder, filter);

        let count = builder.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }

    async fn insert_content(&self, item: ContentItem) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO content \
             (id, title, year, country, content_type, genres, rating, poster_url, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (id) DO UPDATE SET \
             title = EXCLUDED.title, year = EXCLUDED.year, country = EXCLUDED.country, \
             content_type = EXCLUDED.content_type, genres = EXCLUDED.genres, \
             rating = EXCLUDED.rating, poster_url = EXCLUDED.poster_url",
        )
        .bind(item.id)
        .bind(&item.title)
        .bind(item.year)
        .bind(&item.country)
        .bind(item.content_type.as_str())
        .bind(&item.genres)
        .bind(item.rating)
        .bind(&item.poster_url)
        .bind(item.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn count_interactions_since(
        &self,
        content_id: Uuid,
        since: DateTime<Utc>,
        kind: InteractionKind,
    ) -> AppResult<u64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM interactions \
             WHERE content_id = $1 AND kind = $2 AND occurred_at >= $3",
        )
        .bind(content_id)
        .bind(kind.as_str())
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as u64)
    }

    async fn count_interactions_since_batch(
        &self,
        content_ids: &[Uuid],
        since: DateTime<Utc>,
        kind: InteractionKind,
    ) -> AppResult<HashMap<Uuid, u64>> {
        let rows: Vec<(Uuid, i64)> = sqlx::query_as(
            "SELECT content_id, COUNT(*) FROM interactions \
             WHERE content_id = ANY($1) AND kind = $2 AND occurred_at >= $3 \
             GROUP BY content_id",
        )
        .bind(content_ids)
        .bind(kind.as_str())
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        let mut counts: HashMap<Uuid, u64> = content_ids.iter().map(|id| (*id, 0)).collect();
        for (id, count) in rows {
            counts.insert(id, count.max(0) as u64);
        }
        Ok(counts)
    }

    async fn upsert_rating(&self, rating: Rating) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO ratings (user_id, content_id, rating, created_at) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id, content_id) \
             DO UPDATE SET rating = EXCLUDED.rating, created_at = EXCLUDED.created_at",
        )
        .bind(rating.user_id)
        .bind(rating.content_id)
        .bind(rating.rating)
        .bind(rating.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_countries(&self) -> AppResult<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT DISTINCT country FROM content ORDER BY country")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(|(country,)| country).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentType;

    fn row(content_type: &str) -> ContentRow {
        ContentRow {
            id: Uuid::new_v4(),
            title: "Crash Landing on You".to_string(),
            year: Some(2019),
            country: "KR".to_string(),
            content_type: content_type.to_string(),
            genres: vec!["romance".to_string(), "comedy".to_string()],
            rating: 9.0,
            poster_url: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_content_row_conversion() {
        let item = ContentItem::try_from(row("drama")).unwrap();
        assert_eq!(item.content_type, ContentType::Drama);
        assert_eq!(item.genres, vec!["romance", "comedy"]);
        assert_eq!(item.year, Some(2019));
    }

    #[test]
    fn test_content_row_unknown_type_is_internal_error() {
        let result = ContentItem::try_from(row("podcast"));
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[test]
    fn test_search_term_is_escaped() {
        assert_eq!(escape_like("100%_sure\\"), "100\\%\\_sure\\\\");
        assert_eq!(escape_like("Signal"), "Signal");
    }

    #[test]
    fn test_filter_sql_year_and_search() {
        let filter = ContentFilter::default().with_year(2021).with_search("squid");

        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM content");
        PgCatalogStore::push_filter(&mut builder, &filter);

        assert_eq!(
            builder.sql(),
            "SELECT COUNT(*) FROM content WHERE TRUE AND year = $1 AND title ILIKE $2"
        );
    }

    #[test]
    fn test_filter_sql() {
        let filter = ContentFilter::default()
            .with_genres_any(["thriller"])
            .with_country("KR")
            .with_content_type(ContentType::Drama)
            .with_min_rating(6.0);

        let mut builder = QueryBuilder::<Postgres>::new(CONTENT_COLUMNS);
        PgCatalogStore::push_filter(&mut builder, &filter);

        assert_eq!(
            builder.sql(),
            format!(
                "{} WHERE TRUE AND genres && $1 AND country = $2 AND content_type = $3 AND rating >= $4",
                CONTENT_COLUMNS
            )
        );
    }
}
