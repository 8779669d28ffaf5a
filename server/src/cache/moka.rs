use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tracing::trace;

use super::{cache_key, decode, encode, LinkCache, Result};
use crate::models::LinkConfig;

/// In-process resolution cache backed by moka.
///
/// Used when no Redis URL is configured. Values are stored serialized so the
/// cache behaves like the Redis backend: a copy, not a shared reference.
#[derive(Debug, Clone)]
pub struct MokaLinkCache {
    cache: Cache<String, String>,
}

impl MokaLinkCache {
    /// Entries expire `ttl` after their last write.
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }
}

#[async_trait]
impl LinkCache for MokaLinkCache {
    async fn get_link(&self, short_code: &str) -> Result<Option<LinkConfig>> {
        let key = cache_key(short_code);
        match self.cache.get(&key).await {
            Some(raw) => decode(&key, &raw).map(Some),
            None => {
                trace!(short_code, "Cache miss in moka");
                Ok(None)
            }
        }
    }

    async fn put_link(&self, link: &LinkConfig) -> Result<()> {
        let json = encode(link)?;
        self.cache.insert(cache_key(&link.short_code), json).await;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "moka"
    }
}
