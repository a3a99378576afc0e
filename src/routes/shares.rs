use axum::{
    extract::{Path, State},
    Json,
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::share::Share;
use crate::state::AppState;
use crate::types::NewShareRequest;

/// `GET /api/shares`: owner-only listing of every grant.
pub async fn list_shares(State(state): State<AppState>) -> AppResult<Json<Vec<Share>>> {
    let shares = state.shares.all().await?;
    Ok(Json(shares))
}

/// `GET /api/share/{slug}`: public metadata for one grant, fetched by the
/// share page before it knows which module route to load.
pub async fn get_share(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<Share>> {
    let share = state
        .shares
        .get(&slug)
        .await
        .map_err(|_| AppError::NotFound("Not Found".to_string()))?;
    Ok(Json(share))
}

/// `POST /api/shares`: creates a grant. The slug is generated here and never
/// taken from the client.
pub async fn create_share(
    State(state): State<AppState>,
    Json(req): Json<NewShareRequest>,
) -> AppResult<Json<Share>> {
    // Validation happens in the store, which rejects incomplete records
    // before anything is persisted.
    let share = Share {
        slug: generate_slug(),
        kind: req.kind,
        name: req.name,
        items: req.items,
        expires_at: req.expires_at,
    };
    state.shares.save(&share).await?;
    state.metrics.inc_shares_created();

    Ok(Json(share))
}

/// `DELETE /api/shares/{slug}`
pub async fn remove_share(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<Value>> {
    state
        .shares
        .remove(&slug)
        .await
        .map_err(|_| AppError::NotFound("Not Found".to_string()))?;
    state.metrics.inc_shares_removed();
    Ok(Json(json!({})))
}

fn generate_slug() -> String {
    let mut bytes = [0u8; 10];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
