use std::sync::Arc;

use gdvg_api::{
    config::Config,
    db::{self, CacheWriterHandle, CatalogStore, InMemoryStore, PgCatalogStore},
    routes::{create_router, AppState},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gdvg_api=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn CatalogStore> = match &config.database_url {
        Some(url) => {
            let pool = db::create_pool(url).await?;
            db::run_migrations(&pool).await?;
            tracing::info!("Using PostgreSQL catalog store");
            Arc::new(PgCatalogStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using an in-memory catalog store");
            Arc::new(InMemoryStore::new())
        }
    };

    if config.seed_sample_data {
        db::seed_if_empty(store.as_ref()).await?;
    }

    let mut state = AppState::new(store, config.clone());
    let mut cache_handle: Option<CacheWriterHandle> = None;
    if let Some(url) = &config.redis_url {
        let client = db::create_redis_client(url)?;
        let (cache, handle) = db::Cache::new(client).await;
        state = state.with_cache(cache);
        cache_handle = Some(handle);
        tracing::info!("Response caching enabled");
    }

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = cache_handle {
        handle.shutdown().await;
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
