use axum::{extract::State, Json};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    middleware::CurrentUser,
    models::Rating,
    routes::AppState,
};

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub content_id: Uuid,
    pub rating: f64,
}

/// Rejects ratings that are not finite or fall outside 0-10
pub fn validate_rating(rating: f64) -> AppResult<f64> {
    if rating.is_finite() && (0.0..=10.0).contains(&rating) {
        Ok(rating)
    } else {
        Err(AppError::InvalidInput(format!(
            "Rating must be between 0 and 10, got {}",
            rating
        )))
    }
}

/// Handler that records or replaces the caller's rating for an item
pub async fn rate_content(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Json(request): Json<RateRequest>,
) -> AppResult<Json<Rating>> {
    let rating = validate_rating(request.rating)?;

    if state.store.get_content_item(request.content_id).await?.is_none() {
        return Err(AppError::NotFound(format!(
            "Content {} not found",
            request.content_id
        )));
    }

    let rating = Rating::new(user_id, request.content_id, rating);
    state.store.upsert_rating(rating.clone()).await?;

    tracing::info!(
        user_id = %user_id,
        content_id = %rating.content_id,
        rating = rating.rating,
        "Rating recorded"
    );

    Ok(Json(rating))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rating_bounds() {
        assert!(validate_rating(0.0).is_ok());
        assert!(validate_rating(10.0).is_ok());
        assert!(validate_rating(-0.1).is_err());
        assert!(validate_rating(10.5).is_err());
        assert!(validate_rating(f64::NAN).is_err());
    }
}
