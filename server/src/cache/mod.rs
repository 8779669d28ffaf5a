//! Resolution cache: a derived, expiring copy of link configurations kept
//! ahead of the store.
//!
//! Entries live under `link:{shortCode}` as the JSON form of [`LinkConfig`].
//! Every write refreshes the TTL; reads never do.

mod moka;
mod redis;

pub use self::moka::MokaLinkCache;
pub use self::redis::RedisLinkCache;

use async_trait::async_trait;

use crate::{error::CacheError, models::LinkConfig};

pub type Result<T> = std::result::Result<T, CacheError>;

pub const KEY_PREFIX: &str = "link:";

/// Cache key for a short code.
pub fn cache_key(short_code: &str) -> String {
    format!("{KEY_PREFIX}{short_code}")
}

#[async_trait]
pub trait LinkCache: Send + Sync + 'static {
    /// Look up a cached configuration. `Ok(None)` is a miss.
    async fn get_link(&self, short_code: &str) -> Result<Option<LinkConfig>>;

    /// Store (or overwrite) a configuration with the configured TTL.
    async fn put_link(&self, link: &LinkConfig) -> Result<()>;

    /// Short name used in log lines.
    fn backend(&self) -> &'static str;
}

fn encode(link: &LinkConfig) -> Result<String> {
    serde_json::to_string(link)
        .map_err(|e| CacheError::Serialization(format!("failed to serialize cache value: {e}")))
}

fn decode(key: &str, raw: &str) -> Result<LinkConfig> {
    serde_json::from_str(raw)
        .map_err(|e| CacheError::InvalidData(format!("invalid cached value for key '{key}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_prefixed() {
        assert_eq!(cache_key("aB3dE9f"), "link:aB3dE9f");
    }

    #[test]
    fn garbage_is_invalid_data() {
        let err = decode("link:x", "{not json").unwrap_err();
        assert!(matches!(err, CacheError::InvalidData(_)));
    }
}
