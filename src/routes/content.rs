use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::ContentFilter,
    error::{AppError, AppResult},
    models::{ContentItem, ContentType, GENRES},
    routes::AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct ContentQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub search: Option<String>,
    pub country: Option<String>,
    pub content_type: Option<String>,
    pub genre: Option<String>,
    pub year: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContentPage {
    pub contents: Vec<ContentItem>,
    pub total: u64,
    pub page: usize,
    pub limit: usize,
}

impl ContentQuery {
    fn to_filter(&self) -> AppResult<ContentFilter> {
        let mut filter = ContentFilter::default();

        if let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            filter = filter.with_search(term);
        }
        if let Some(country) = &self.country {
            filter = filter.with_country(country.clone());
        }
        if let Some(raw) = &self.content_type {
            let content_type = raw.parse::<ContentType>().map_err(AppError::InvalidInput)?;
            filter = filter.with_content_type(content_type);
        }
        if let Some(genre) = &self.genre {
            if !GENRES.contains(&genre.as_str()) {
                return Err(AppError::InvalidInput(format!("unknown genre '{}'", genre)));
            }
            filter = filter.with_genres_any([genre.clone()]);
        }
        if let Some(year) = self.year {
            filter = filter.with_year(year);
        }

        Ok(filter)
    }
}

/// Handler for browsing the catalog, newest first
pub async fn list_content(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ContentQuery>,
) -> AppResult<Json<ContentPage>> {
    let page = params.page.unwrap_or(1);
    if page == 0 {
        return Err(AppError::InvalidInput("page starts at 1".to_string()));
    }
    let limit = state.config.clamp_limit(params.limit);
    let filter = params.to_filter()?;
    let offset = (page - 1).saturating_mul(limit);

    let (contents, total) = tokio::join!(
        state.store.list_content(&filter, offset, limit),
        state.store.count_content(&filter)
    );
    let (contents, total) = (contents?, total?);

    tracing::debug!(page, limit, total, returned = contents.len(), "Listed content");

    Ok(Json(ContentPage {
        contents,
        total,
        page,
        limit,
    }))
}

/// Handler for a single catalog item
pub async fn get_content(
    State(state): State<Arc<AppState>>,
    Path(content_id): Path<Uuid>,
) -> AppResult<Json<ContentItem>> {
    let item = state
        .store
        .get_content_item(content_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Content {} not found", content_id)))?;

    Ok(Json(item))
}

pub async fn genres() -> Json<Value> {
    Json(json!({ "genres": GENRES }))
}

pub async fn content_types() -> Json<Value> {
    let types: Vec<&str> = ContentType::ALL.iter().map(ContentType::as_str).collect();
    Json(json!({ "content_types": types }))
}

/// Handler listing the production countries present in the catalog
pub async fn countries(State(state): State<Arc<AppState>>) -> AppResult<Json<Value>> {
    let countries = state.store.list_countries().await?;
    Ok(Json(json!({ "countries": countries })))
}
