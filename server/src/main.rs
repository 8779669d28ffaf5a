use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use linkhop::{
    cache::{LinkCache, MokaLinkCache, RedisLinkCache},
    config::AppConfig,
    resolver::LinkResolver,
    store::{LinkStore, MemoryLinkStore, SqliteLinkStore},
    AppState,
};

// ── Entry point ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env; a missing file is fine
    dotenvy::dotenv().ok();

    // Initialise structured logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "linkhop=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env()?;
    tracing::info!("Starting linkhop on {}", config.bind_addr());
    match &config.base_url {
        Some(base) => tracing::info!("Base URL: {}", base),
        None => tracing::info!("Base URL: taken from request headers"),
    }

    // ── Store ──────────────────────────────────────────────────────────────
    let sqlite = if config.database_url == "memory" {
        tracing::warn!("DATABASE_URL=memory: links will not survive a restart");
        None
    } else {
        Some(SqliteLinkStore::connect(&config.database_url).await?)
    };
    let store: Arc<dyn LinkStore> = match &sqlite {
        Some(db) => Arc::new(db.clone()),
        None => Arc::new(MemoryLinkStore::new()),
    };

    // ── Cache ──────────────────────────────────────────────────────────────
    let cache: Arc<dyn LinkCache> = match &config.redis_url {
        Some(url) => {
            let redis = RedisLinkCache::new(url, config.cache_ttl, config.cache_timeout)?;
            if let Err(e) = redis.ping().await {
                // Serve from the store until Redis comes back.
                tracing::warn!(error = %e, "Redis not reachable at startup, will retry on use");
            }
            Arc::new(redis)
        }
        None => Arc::new(MokaLinkCache::new(
            config.cache_max_capacity,
            config.cache_ttl,
        )),
    };
    tracing::info!(
        backend = cache.backend(),
        ttl_secs = config.cache_ttl.as_secs(),
        "Resolution cache ready"
    );

    // Build shared state
    let resolver = LinkResolver::new(store, Arc::clone(&cache));
    let bind_addr = config.bind_addr();
    let app = linkhop::router(AppState::new(config, resolver));

    // ── Serve ──────────────────────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // ── Teardown ───────────────────────────────────────────────────────────
    tracing::info!("Server stopped, releasing resources");
    drop(cache);
    tracing::info!("Cache handle released");
    if let Some(db) = sqlite {
        db.close().await;
        tracing::info!("Database pool closed");
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
