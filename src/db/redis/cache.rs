use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::AppError;
use crate::error::AppResult;
use crate::models::TimePeriod;

/// Keys for cached responses that do not depend on the caller
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Trending { period: TimePeriod, limit: usize },
    Similar { content_id: Uuid, limit: usize },
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Trending { period, limit } => write!(f, "trending:{}:{}", period, limit),
            CacheKey::Similar { content_id, limit } => {
                write!(f, "similar:{}:{}", content_id, limit)
            }
        }
    }
}

/// Creates a Redis client for response caching
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Message for asynchronous cache writes
struct CacheWriteMessage {
    key: String,
    value: String,
    ttl: u64,
}

/// Cache handler for storing and retrieving data from Redis
#[derive(Clone)]
pub struct Cache {
    redis_client: Client,
    write_tx: mpsc::UnboundedSender<CacheWriteMessage>,
}

/// Owns the background writer; [`shutdown`](Self::shutdown) flushes and joins it
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
    writer: JoinHandle<()>,
}

impl CacheWriterHandle {
    /// Signals the writer, then waits until every queued write has been attempted
    pub async fn shutdown(self) {
        if self.shutdown_tx.send(()).await.is_err() {
            tracing::warn!("Cache writer already stopped");
        }
        if let Err(e) = self.writer.await {
            tracing::error!(error = %e, "Cache writer task failed");
        }
        tracing::info!("Cache writer stopped");
    }
}

impl Cache {
    /// Creates a cache and spawns its background writer task
    pub async fn new(redis_client: Client) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let writer = tokio::spawn(Self::run_writer(redis_client.clone(), write_rx, shutdown_rx));

        let cache = Self {
            redis_client,
            write_tx,
        };

        (cache, CacheWriterHandle { shutdown_tx, writer })
    }

    async fn run_writer(
        client: Client,
        mut write_rx: mpsc::UnboundedReceiver<CacheWriteMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::debug!("Cache writer started");

        loop {
            tokio::select! {
                Some(msg) = write_rx.recv() => Self::store(&client, msg).await,
                _ = shutdown_rx.recv() => break,
            }
        }

        // Every Cache clone holds a sender, so the channel never closes on its own
        let mut flushed = 0usize;
        while let Ok(msg) = write_rx.try_recv() {
            Self::store(&client, msg).await;
            flushed += 1;
        }
        tracing::info!(flushed, "Cache writer flushed pending writes");
    }

    async fn store(client: &Client, msg: CacheWriteMessage) {
        let key = msg.key.clone();
        if let Err(e) = Self::write_to_redis(client, msg).await {
            tracing::error!(error = %e, key = %key, "Cache write failed");
        }
    }

    async fn write_to_redis(client: &Client, msg: CacheWriteMessage) -> AppResult<()> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(msg.key, msg.value, msg.ttl).await?;
        Ok(())
    }

    /// Cached value for `key`, `None` on a miss
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(key.to_string()).await?;

        cached
            .map(|json| {
                serde_json::from_str(&json)
                    .map_err(|e| AppError::Internal(format!("Corrupt cache entry {}: {}", key, e)))
            })
            .transpose()
    }

    /// Queues a value for the background writer and returns immediately.
    ///
    /// Failures are logged, never reported to the caller.
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let value = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, key = %key, "Cache serialization failed");
                return;
            }
        };

        let msg = CacheWriteMessage {
            key: key.to_string(),
            value,
            ttl,
        };
        if self.write_tx.send(msg).is_err() {
            tracing::warn!(key = %key, "Cache writer stopped, dropping write");
        }
    }
}
