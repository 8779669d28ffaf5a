use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands};
use tokio::sync::RwLock;
use tracing::{debug, trace, warn};

use super::{cache_key, decode, encode, LinkCache, Result};
use crate::{error::CacheError, models::LinkConfig};

/// Redis-backed resolution cache.
///
/// The multiplexed connection is opened lazily and shared by every request.
/// Any Redis error drops it, so the next call reconnects; a restarted or
/// briefly unreachable server only costs cache misses.
#[derive(Clone)]
pub struct RedisLinkCache {
    client: redis::Client,
    connection: Arc<RwLock<Option<MultiplexedConnection>>>,
    ttl: Duration,
    op_timeout: Duration,
}

fn map_redis_error(operation: &str, err: redis::RedisError) -> CacheError {
    let message = format!("{operation}: {err}");
    let lowered = message.to_ascii_lowercase();
    if lowered.contains("timed out") {
        CacheError::Timeout(message)
    } else if lowered.contains("connection refused") || lowered.contains("broken pipe") {
        CacheError::Unavailable(message)
    } else {
        CacheError::Operation(message)
    }
}

impl RedisLinkCache {
    /// Build a cache for `url`. No connection is made here; only a malformed
    /// URL is an error.
    pub fn new(url: &str, ttl: Duration, op_timeout: Duration) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| CacheError::Unavailable(format!("invalid Redis URL: {e}")))?;

        Ok(Self {
            client,
            connection: Arc::new(RwLock::new(None)),
            ttl,
            op_timeout,
        })
    }

    /// Open the shared connection now instead of on first use.
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.get_connection().await?;
        let result = self
            .bounded::<String>("PING failed", redis::cmd("PING").query_async(&mut conn))
            .await;
        if result.is_err() {
            self.reset_connection().await;
        }
        result.map(|_| ())
    }

    async fn get_connection(&self) -> Result<MultiplexedConnection> {
        {
            let guard = self.connection.read().await;
            if let Some(conn) = guard.as_ref() {
                return Ok(conn.clone());
            }
        }

        let mut guard = self.connection.write().await;
        // Another task may have connected while we waited for the lock.
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }

        let conn = self
            .bounded(
                "failed to connect to Redis",
                self.client.get_multiplexed_async_connection(),
            )
            .await?;
        debug!("Connected to Redis");
        *guard = Some(conn.clone());
        Ok(conn)
    }

    async fn reset_connection(&self) {
        *self.connection.write().await = None;
        debug!("Redis connection reset due to error");
    }

    /// Bound a single Redis round trip by the configured timeout.
    async fn bounded<T>(
        &self,
        operation: &str,
        fut: impl Future<Output = redis::RedisResult<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => result.map_err(|e| map_redis_error(operation, e)),
            Err(_) => Err(CacheError::Timeout(format!(
                "{operation}: no reply within {:?}",
                self.op_timeout
            ))),
        }
    }
}

#[async_trait]
impl LinkCache for RedisLinkCache {
    async fn get_link(&self, short_code: &str) -> Result<Option<LinkConfig>> {
        let key = cache_key(short_code);
        let mut conn = self.get_connection().await?;

        let cached: Option<String> = match self
            .bounded("failed to fetch value from Redis", conn.get(&key))
            .await
        {
            Ok(cached) => cached,
            Err(e) => {
                self.reset_connection().await;
                return Err(e);
            }
        };

        match cached {
            Some(raw) => decode(&key, &raw).map(Some).inspect_err(|e| {
                warn!(short_code, error = %e, "Failed to deserialize cached link");
            }),
            None => {
                trace!(short_code, "Cache miss in Redis");
                Ok(None)
            }
        }
    }

    async fn put_link(&self, link: &LinkConfig) -> Result<()> {
        let key = cache_key(&link.short_code);
        let json = encode(link)?;
        let mut conn = self.get_connection().await?;

        let result = self
            .bounded::<()>(
                "failed to write value to Redis",
                conn.set_ex(&key, json, self.ttl.as_secs()),
            )
            .await;
        if result.is_err() {
            self.reset_connection().await;
        }
        result
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Nothing listens on port 1, so every connection attempt is refused.
    const UNREACHABLE: &str = "redis://127.0.0.1:1";

    fn unreachable_cache() -> RedisLinkCache {
        RedisLinkCache::new(
            UNREACHABLE,
            Duration::from_secs(60),
            Duration::from_millis(200),
        )
        .unwrap()
    }

    #[test]
    fn malformed_url_is_rejected() {
        let err = RedisLinkCache::new("not a url", Duration::from_secs(60), Duration::from_millis(200))
            .err()
            .unwrap();
        assert!(matches!(err, CacheError::Unavailable(_)));
    }

    #[tokio::test]
    async fn construction_does_not_connect() {
        let cache = unreachable_cache();
        assert!(cache.connection.read().await.is_none());
    }

    #[tokio::test]
    async fn unreachable_server_is_an_error_not_a_dead_cache() {
        let cache = unreachable_cache();

        assert!(cache.get_link("aB3dE9f").await.is_err());
        assert!(cache.connection.read().await.is_none());

        // Each call tries to connect again rather than reusing a broken handle.
        assert!(cache.get_link("aB3dE9f").await.is_err());
        assert!(cache.ping().await.is_err());
        assert!(cache.connection.read().await.is_none());
    }
}
