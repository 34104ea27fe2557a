use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use redis::Client;

use crate::db::ResultCache;
use crate::error::{AppError, AppResult};

/// Creates a Redis client for caching
///
/// Establishes a connection to Redis for fast data caching.
/// Uses connection pooling via the connection-manager feature.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Redis-backed result cache
///
/// Writes are awaited rather than queued so that an invalidation issued after a
/// write can never be overtaken by it.
#[derive(Clone)]
pub struct RedisCache {
    redis_client: Client,
}

impl RedisCache {
    pub fn new(redis_client: Client) -> Self {
        Self { redis_client }
    }

    /// Unreachable servers surface as `CacheUnavailable`; command errors stay `Cache`
    async fn connection(&self) -> AppResult<MultiplexedConnection> {
        self.redis_client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::CacheUnavailable(e.to_string()))
    }
}

#[async_trait]
impl ResultCache for RedisCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.connection().await?;
        let cached: Option<String> = conn.get(key).await?;
        Ok(cached)
    }

    async fn set(&self, key: &str, value: String, ttl: u64) -> AppResult<()> {
        let mut conn = self.connection().await?;
        let _: () = conn.set_ex(key, value, ttl).await?;
        Ok(())
    }

    /// Uses SCAN rather than KEYS so large keyspaces don't block the server
    async fn delete_matching(&self, pattern: &str) -> AppResult<u64> {
        let mut conn = self.connection().await?;

        let keys: Vec<String> = {
            let mut iter: redis::AsyncIter<String> = conn.scan_match(pattern).await?;
            let mut keys = Vec::new();
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
            keys
        };

        if keys.is_empty() {
            return Ok(0);
        }

        let deleted: u64 = conn.del(&keys).await?;
        tracing::debug!(pattern = %pattern, deleted, "Deleted matching cache keys");
        Ok(deleted)
    }
}
