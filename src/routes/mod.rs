use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::Config,
    db::{Cache, CatalogStore},
    middleware::{make_span_with_request_id, request_id_middleware},
    services::BlendWeights,
};

pub mod content;
pub mod discovery;
pub mod ratings;
pub mod recommendations;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CatalogStore>,
    /// Response cache for caller-independent endpoints, if Redis is configured
    pub cache: Option<Cache>,
    pub config: Arc<Config>,
    pub weights: BlendWeights,
}

impl AppState {
    pub fn new(store: Arc<dyn CatalogStore>, config: Config) -> Self {
        Self {
            store,
            cache: None,
            config: Arc::new(config),
            weights: BlendWeights::default(),
        }
    }

    pub fn with_cache(mut self, cache: Cache) -> Self {
        self.cache = Some(cache);
        self
    }
}

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .with_state(Arc::new(state))
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
}

/// API routes under /api
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/content", get(content::list_content))
        .route("/content/:content_id", get(content::get_content))
        .route("/genres", get(content::genres))
        .route("/content-types", get(content::content_types))
        .route("/countries", get(content::countries))
        .route("/ratings", post(ratings::rate_content))
        .route("/recommendations/for-you", get(recommendations::for_you))
        .route(
            "/recommendations/similar/:content_id",
            get(recommendations::similar),
        )
        .route("/discovery/trending", get(discovery::trending))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
