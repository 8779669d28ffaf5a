use std::time::Duration;

use anyhow::{Context, Result};

pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite connection string, e.g. "sqlite:./linkhop.db", or "memory" for
    /// a throwaway in-process store.
    pub database_url: String,

    /// Host to bind the HTTP server to, e.g. "0.0.0.0"
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Public base URL of short links, e.g. "https://go.example.com", without
    /// a trailing slash. When unset it is taken from each request's headers.
    pub base_url: Option<String>,

    /// Redis connection string. Without it the cache is in-process.
    pub redis_url: Option<String>,

    /// Lifetime of a cache entry, refreshed on every write.
    pub cache_ttl: Duration,

    /// Entry bound for the in-process cache.
    pub cache_max_capacity: u64,

    /// Upper bound on a single Redis round trip.
    pub cache_timeout: Duration,

    /// Dashboard origin allowed by CORS on the API routes.
    pub client_url: Option<String>,
}

impl AppConfig {
    /// Load configuration from environment variables (populated by dotenvy before this is called).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |name: &str| var(name).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let port = non_empty("PORT")
            .unwrap_or_else(|| "5001".into())
            .parse::<u16>()
            .context("PORT must be a valid port number (1–65535)")?;

        let cache_ttl_secs = non_empty("CACHE_TTL_SECONDS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_CACHE_TTL_SECS);

        let cache_max_capacity = non_empty("CACHE_MAX_CAPACITY")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(10_000);

        let cache_timeout_ms = non_empty("CACHE_TIMEOUT_MS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(500);

        Ok(Self {
            database_url: non_empty("DATABASE_URL").unwrap_or_else(|| "sqlite:./linkhop.db".into()),
            host: non_empty("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            base_url: non_empty("BASE_URL").map(|url| url.trim_end_matches('/').to_owned()),
            redis_url: non_empty("REDIS_URL"),
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            cache_max_capacity,
            cache_timeout: Duration::from_millis(cache_timeout_ms),
            client_url: non_empty("CLIENT_URL"),
        })
    }

    /// A configuration for tests and embedding: in-memory store and cache,
    /// default timings.
    pub fn in_memory() -> Self {
        Self {
            database_url: "memory".into(),
            host: "127.0.0.1".into(),
            port: 0,
            base_url: None,
            redis_url: None,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            cache_max_capacity: 10_000,
            cache_timeout: Duration::from_millis(500),
            client_url: None,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.database_url, "sqlite:./linkhop.db");
        assert_eq!(config.bind_addr(), "0.0.0.0:5001");
        assert_eq!(config.cache_ttl, Duration::from_secs(3600));
        assert_eq!(config.cache_timeout, Duration::from_millis(500));
        assert!(config.redis_url.is_none());
        assert!(config.base_url.is_none());
    }

    #[test]
    fn base_url_loses_trailing_slash() {
        let config = load(&[("BASE_URL", "https://go.ex.com/")]).unwrap();
        assert_eq!(config.base_url.as_deref(), Some("https://go.ex.com"));
    }

    #[test]
    fn bad_ttl_falls_back_to_default() {
        for ttl in ["abc", "0", "-5"] {
            let config = load(&[("CACHE_TTL_SECONDS", ttl)]).unwrap();
            assert_eq!(config.cache_ttl, Duration::from_secs(DEFAULT_CACHE_TTL_SECS));
        }
        let config = load(&[("CACHE_TTL_SECONDS", "60")]).unwrap();
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
    }

    #[test]
    fn invalid_port_is_an_error() {
        assert!(load(&[("PORT", "not-a-port")]).is_err());
        assert!(load(&[("PORT", "70000")]).is_err());
    }

    #[test]
    fn blank_redis_url_means_no_redis() {
        let config = load(&[("REDIS_URL", "  ")]).unwrap();
        assert!(config.redis_url.is_none());
    }
}
