use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use linkhop::{
    cache::{self, LinkCache, MokaLinkCache},
    config::AppConfig,
    error::{CacheError, StoreError},
    models::{LinkConfig, LinkFields},
    resolver::LinkResolver,
    store::{self, LinkStore, MemoryLinkStore},
    AppState,
};

const DESKTOP_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

// ── Test doubles ───────────────────────────────────────────────────────────

/// A store whose database is gone.
struct DownStore;

fn pool_timeout() -> StoreError {
    StoreError::Database(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl LinkStore for DownStore {
    async fn find_by_code(&self, _: &str) -> store::Result<Option<LinkConfig>> {
        Err(pool_timeout())
    }
    async fn find_by_id(&self, _: i64) -> store::Result<Option<LinkConfig>> {
        Err(pool_timeout())
    }
    async fn insert(&self, _: &str, _: &LinkFields) -> store::Result<LinkConfig> {
        Err(pool_timeout())
    }
    async fn update(&self, _: i64, _: &LinkFields) -> store::Result<Option<LinkConfig>> {
        Err(pool_timeout())
    }
    async fn list(&self) -> store::Result<Vec<LinkConfig>> {
        Err(pool_timeout())
    }
}

/// A cache whose backend refuses every call.
struct DownCache;

#[async_trait]
impl LinkCache for DownCache {
    async fn get_link(&self, _: &str) -> cache::Result<Option<LinkConfig>> {
        Err(CacheError::Unavailable("connection refused".into()))
    }
    async fn put_link(&self, _: &LinkConfig) -> cache::Result<()> {
        Err(CacheError::Unavailable("connection refused".into()))
    }
    fn backend(&self) -> &'static str {
        "down"
    }
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn app(store: Arc<dyn LinkStore>, cache: Arc<dyn LinkCache>) -> Router {
    let resolver = LinkResolver::new(store, cache);
    linkhop::router(AppState::new(AppConfig::in_memory(), resolver))
}

fn moka() -> Arc<dyn LinkCache> {
    Arc::new(MokaLinkCache::new(100, Duration::from_secs(60)))
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Option<String>, String) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let location = response
        .headers()
        .get(header::LOCATION)
        .map(|v| v.to_str().unwrap().to_owned());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, location, String::from_utf8(bytes.to_vec()).unwrap())
}

fn visit(code: &str) -> Request<Body> {
    Request::builder()
        .uri(format!("/{code}"))
        .header(header::USER_AGENT, DESKTOP_UA)
        .body(Body::empty())
        .unwrap()
}

fn create_request(body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/links")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// ── Store failures ─────────────────────────────────────────────────────────

#[tokio::test]
async fn resolution_store_failure_is_500() {
    let router = app(Arc::new(DownStore), moka());

    let (status, location, body) = send(&router, visit("aB3dE9f")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Error resolving link");
    assert!(location.is_none());
}

#[tokio::test]
async fn listing_store_failure_is_500_json() {
    let router = app(Arc::new(DownStore), moka());

    let request = Request::builder().uri("/api/links").body(Body::empty()).unwrap();
    let (status, _, text) = send(&router, request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["message"], "Server error.");
}

// ── Cache failures ─────────────────────────────────────────────────────────

#[tokio::test]
async fn create_succeeds_when_cache_is_down() {
    let router = app(Arc::new(MemoryLinkStore::new()), Arc::new(DownCache));

    let (status, _, text) = send(
        &router,
        create_request(json!({ "webFallbackUrl": "https://ex.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let link: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(link["webFallbackUrl"], "https://ex.com");
}

#[tokio::test]
async fn resolution_falls_back_to_store_when_cache_is_down() {
    let router = app(Arc::new(MemoryLinkStore::new()), Arc::new(DownCache));

    let (_, _, text) = send(
        &router,
        create_request(json!({ "webFallbackUrl": "https://ex.com/landing" })),
    )
    .await;
    let link: Value = serde_json::from_str(&text).unwrap();
    let code = link["shortCode"].as_str().unwrap();

    let (status, location, _) = send(&router, visit(code)).await;
    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(location.as_deref(), Some("https://ex.com/landing"));
}
