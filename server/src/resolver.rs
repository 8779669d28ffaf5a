use std::sync::Arc;

use crate::{cache::LinkCache, error::StoreError, models::LinkConfig, store::LinkStore};

/// Cache-aside lookup of link configurations.
///
/// The cache is only an optimisation: every cache failure is logged and
/// treated as a miss (reads) or a no-op (writes). The store is authoritative
/// and its errors are the only ones returned.
#[derive(Clone)]
pub struct LinkResolver {
    store: Arc<dyn LinkStore>,
    cache: Arc<dyn LinkCache>,
}

impl LinkResolver {
    pub fn new(store: Arc<dyn LinkStore>, cache: Arc<dyn LinkCache>) -> Self {
        Self { store, cache }
    }

    pub fn store(&self) -> &dyn LinkStore {
        self.store.as_ref()
    }

    /// Resolve a short code. `Ok(None)` means it exists in neither the cache
    /// nor the store.
    ///
    /// A hit is returned as-is without re-checking the store. On a miss the
    /// store is queried and, if found, the cache is populated by a detached
    /// task so the caller never waits on it.
    pub async fn resolve(&self, short_code: &str) -> Result<Option<LinkConfig>, StoreError> {
        match self.cache.get_link(short_code).await {
            Ok(Some(link)) => {
                tracing::info!(short_code, "[Cache HIT] Found link in cache");
                return Ok(Some(link));
            }
            Ok(None) => {
                tracing::info!(short_code, "[Cache MISS] Link not in cache");
            }
            Err(e) => {
                tracing::warn!(
                    short_code,
                    backend = self.cache.backend(),
                    error = %e,
                    "[Cache Error] Read failed, falling back to store"
                );
            }
        }

        match self.store.find_by_code(short_code).await? {
            Some(link) => {
                tracing::info!(short_code, "[DB Success] Found link in store");
                self.spawn_cache_fill(link.clone());
                Ok(Some(link))
            }
            None => {
                tracing::info!(short_code, "[Not Found] Link not found in store");
                Ok(None)
            }
        }
    }

    /// Best-effort write-through after a create or update. Never fails; a
    /// cache error only produces a log line.
    pub async fn write_through(&self, link: &LinkConfig) {
        put_and_log(self.cache.as_ref(), link).await;
    }

    fn spawn_cache_fill(&self, link: LinkConfig) {
        let cache = Arc::clone(&self.cache);
        tokio::spawn(async move {
            put_and_log(cache.as_ref(), &link).await;
        });
    }
}

async fn put_and_log(cache: &dyn LinkCache, link: &LinkConfig) {
    match cache.put_link(link).await {
        Ok(()) => tracing::debug!(short_code = %link.short_code, "[Cache SET] Link cached"),
        Err(e) => tracing::error!(
            short_code = %link.short_code,
            backend = cache.backend(),
            error = %e,
            "[Cache Error] Failed to cache link"
        ),
    }
}
