pub mod memory;
pub mod postgres;
pub mod redis;
pub mod seed;
pub mod store;

pub use memory::InMemoryStore;
pub use postgres::{create_pool, run_migrations, PgCatalogStore};
pub use redis::create_redis_client;
pub use redis::Cache;
pub use redis::CacheKey;
pub use redis::CacheWriterHandle;
pub use seed::{sample_catalog, seed_if_empty};
pub use store::{CatalogStore, ContentFilter};
