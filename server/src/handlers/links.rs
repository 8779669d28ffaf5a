use crate::{
    error::{AppError, FieldErrors, StoreError},
    models::{LinkConfig, LinkInput},
    store,
    AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

// ── Create ─────────────────────────────────────────────────────────────────

/// POST /api/links
pub async fn create_link(
    State(state): State<Arc<AppState>>,
    Json(input): Json<LinkInput>,
) -> Result<(StatusCode, Json<LinkConfig>), AppError> {
    let fields = input.validate().map_err(AppError::Validation)?;

    let link = match store::create_link(state.resolver.store(), &fields).await {
        Ok(link) => link,
        Err(StoreError::Duplicate(code)) => {
            tracing::error!("Short code collision persisted after retries (last: {})", code);
            return Err(AppError::Conflict);
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(short_code = %link.short_code, id = link.id, "Link created");
    state.resolver.write_through(&link).await;

    Ok((StatusCode::CREATED, Json(link)))
}

// ── Update ─────────────────────────────────────────────────────────────────

/// PUT /api/links/:id
///
/// Replaces every mutable field; the short code is kept.
pub async fn update_link(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(input): Json<LinkInput>,
) -> Result<Json<LinkConfig>, AppError> {
    let id: i64 = id.parse().map_err(|_| {
        let mut errors = FieldErrors::new();
        errors.insert("id", "Invalid Link ID format.".into());
        AppError::Validation(errors)
    })?;

    let fields = input.validate().map_err(AppError::Validation)?;

    let link = state
        .resolver
        .store()
        .update(id, &fields)
        .await?
        .ok_or(AppError::NotFound)?;

    tracing::info!(short_code = %link.short_code, id, "Link updated");
    state.resolver.write_through(&link).await;

    Ok(Json(link))
}

// ── List ───────────────────────────────────────────────────────────────────

/// GET /api/links
///
/// Newest first.
pub async fn list_links(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<LinkConfig>>, AppError> {
    let links = state.resolver.store().list().await?;
    Ok(Json(links))
}

// ── Deferred deep linking ──────────────────────────────────────────────────

/// GET /api/deferred/:device_id
///
/// Placeholder: deferred attribution is not implemented, so there is never
/// a match.
pub async fn deferred_link(Path(device_id): Path<String>) -> Json<Value> {
    tracing::info!(device_id = %device_id, "[Deferred Check] No attribution available");
    Json(json!({
        "message": "Deferred link check placeholder.",
        "deepLinkData": null,
    }))
}
