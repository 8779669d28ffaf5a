use crate::{
    classifier::{self, Platform},
    config::AppConfig,
    strategy, AppState,
};
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// GET /:code
///
/// 1. Classify the requester from its User-Agent (pure, cannot fail).
/// 2. Resolve the configuration: cache first, store on a miss. The cache
///    backfill runs in the background so the response never waits on it.
/// 3. Log the click.
/// 4. Answer with a preview document, an interstitial, or a 302.
pub async fn resolve_link(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    headers: HeaderMap,
) -> Response {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok());
    let platform = classifier::classify(user_agent);

    // ── 1. Resolve configuration ───────────────────────────────────────────
    let link = match state.resolver.resolve(&code).await {
        Ok(Some(link)) => link,
        Ok(None) => return (StatusCode::NOT_FOUND, "Link not found").into_response(),
        Err(e) => {
            tracing::error!("Error resolving link '{}': {:?}", code, e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Error resolving link").into_response();
        }
    };

    // ── 2. Analytics (a single log line) ───────────────────────────────────
    tracing::info!(
        short_code = %code,
        user_agent = user_agent.unwrap_or_default(),
        "[Analytics] Link click"
    );

    // ── 3. Respond ─────────────────────────────────────────────────────────
    if platform == Platform::Crawler {
        tracing::info!(short_code = %code, "[Crawler Detect] Serving meta tags");
    } else {
        tracing::info!(short_code = %code, %platform, "[Routing] Detected platform");
    }

    let short_url = short_url(&state.config, &headers, &code);
    strategy::decide(&link, platform, &short_url).into_response()
}

// ── Helpers ────────────────────────────────────────────────────────────────

/// Public URL of the short link itself, used as `og:url`.
///
/// A configured base URL wins; otherwise the scheme comes from
/// `X-Forwarded-Proto` (default `http`) and the host from `Host`.
fn short_url(config: &AppConfig, headers: &HeaderMap, code: &str) -> String {
    if let Some(base) = &config.base_url {
        return format!("{base}/{code}");
    }

    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("http");

    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .unwrap_or("localhost");

    format!("{scheme}://{host}/{code}")
}
