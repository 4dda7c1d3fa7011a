use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::CacheKey,
    error::{AppError, AppResult},
    middleware::{CurrentUser, RequestId},
    models::{ContentItem, SimilarContent},
    routes::AppState,
    services::{self, PersonalizedRecommendations},
};

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SimilarResponse {
    pub original_content: ContentItem,
    pub similar_content: Vec<SimilarContent>,
}

/// Handler for personalized recommendations
pub async fn for_you(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    CurrentUser(user_id): CurrentUser,
    Query(params): Query<LimitQuery>,
) -> AppResult<Json<PersonalizedRecommendations>> {
    let limit = state.config.clamp_limit(params.limit);

    tracing::info!(
        request_id = %request_id,
        user_id = %user_id,
        limit,
        "Processing recommendation request"
    );

    let response = services::recommend_for_user(
        state.store.as_ref(),
        user_id,
        limit,
        Utc::now(),
        state.weights,
    )
    .await?;

    tracing::info!(
        request_id = %request_id,
        returned = response.recommendations.len(),
        "Recommendations completed"
    );

    Ok(Json(response))
}

/// Handler for content similar to a given item
pub async fn similar(
    State(state): State<Arc<AppState>>,
    Path(content_id): Path<Uuid>,
    Query(params): Query<LimitQuery>,
) -> AppResult<Json<SimilarResponse>> {
    let limit = state.config.clamp_limit(params.limit);

    let response: AppResult<SimilarResponse> = crate::cached!(
        state.cache.as_ref(),
        CacheKey::Similar { content_id, limit },
        state.config.cache_ttl_secs,
        async {
            let (original_content, similar_content) =
                services::similar_content(state.store.as_ref(), content_id, limit).await?;
            Ok::<_, AppError>(SimilarResponse {
                original_content,
                similar_content,
            })
        }
    );

    Ok(Json(response?))
}
