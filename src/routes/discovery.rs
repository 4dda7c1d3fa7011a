use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    db::CacheKey,
    error::{AppError, AppResult},
    models::{TimePeriod, TrendingContent},
    routes::AppState,
    services,
};

#[derive(Debug, Deserialize)]
pub struct TrendingQuery {
    pub time_period: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TrendingResponse {
    pub time_period: TimePeriod,
    pub trending_content: Vec<TrendingContent>,
}

/// Handler for the trending view
pub async fn trending(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TrendingQuery>,
) -> AppResult<Json<TrendingResponse>> {
    let period = match params.time_period.as_deref() {
        Some(raw) => raw.parse::<TimePeriod>().map_err(AppError::InvalidInput)?,
        None => TimePeriod::default(),
    };
    let limit = state.config.clamp_limit(params.limit);

    let response: AppResult<TrendingResponse> = crate::cached!(
        state.cache.as_ref(),
        CacheKey::Trending { period, limit },
        state.config.cache_ttl_secs,
        async {
            let trending_content =
                services::trending_content(state.store.as_ref(), period, limit, Utc::now()).await?;
            Ok::<_, AppError>(TrendingResponse {
                time_period: period,
                trending_content,
            })
        }
    );

    Ok(Json(response?))
}
