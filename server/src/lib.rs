use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    routing::{get, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod cache;
pub mod classifier;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod resolver;
pub mod shortcode;
pub mod store;
pub mod strategy;

use config::AppConfig;
use resolver::LinkResolver;

// ── Shared application state ───────────────────────────────────────────────

pub struct AppState {
    pub config: AppConfig,
    /// Owns the store and the cache handle for the lifetime of the server.
    pub resolver: LinkResolver,
}

impl AppState {
    pub fn new(config: AppConfig, resolver: LinkResolver) -> Arc<Self> {
        Arc::new(Self { config, resolver })
    }
}

// ── Router ─────────────────────────────────────────────────────────────────

pub fn router(state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route(
            "/links",
            get(handlers::links::list_links).post(handlers::links::create_link),
        )
        .route("/links/:id", put(handlers::links::update_link))
        .route("/deferred/:device_id", get(handlers::links::deferred_link))
        .layer(cors_layer(state.config.client_url.as_deref()));

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(|| async { StatusCode::OK }))
        // Dashboard API (all under /api/*)
        .nest("/api", api_router)
        // Short-link resolution; static routes above take priority
        .route("/:code", get(handlers::redirect::resolve_link))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(client_url: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::CONTENT_TYPE]);

    match client_url.map(HeaderValue::from_str) {
        Some(Ok(origin)) => layer.allow_origin(origin),
        Some(Err(e)) => {
            tracing::warn!("CLIENT_URL is not a valid origin ({}), allowing any origin", e);
            layer.allow_origin(Any)
        }
        None => layer.allow_origin(Any),
    }
}
