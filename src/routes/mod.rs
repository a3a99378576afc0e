//! HTTP route handlers and router assembly.
//!
//! - `auth`: owner sign-in
//! - `shares`: share grant management and public share metadata
//! - `gallery`: album and image endpoints
//! - `files`: file tree endpoints
//! - `health`: health, readiness, metrics and version endpoints
//!
//! [`router`] wires the three authorization gates around the handlers: owner
//! routes under `/api` sit behind the session gate, share routes under
//! `/share/{slug}` behind share resolution plus a per-route scope rule, and
//! the owner-only sub-routes are mounted to an unconditional `404` on the
//! share side.

use axum::{
    extract::{DefaultBodyLimit, State},
    middleware::from_fn_with_state,
    routing::{any, delete, get, post},
    Json, Router,
};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

use crate::error::AppResult;
use crate::middleware::scope::{self, ScopeRule};
use crate::middleware::{auth as session, security_headers, share as share_gate};
use crate::state::AppState;
use crate::types::ModulesResponse;

pub mod auth;
pub mod files;
pub mod gallery;
pub mod health;
pub mod shares;

/// Global body limit (10 MB); uploads get a dedicated, larger one.
const BODY_LIMIT: usize = 10 * 1024 * 1024;
const UPLOAD_BODY_LIMIT: usize = 256 * 1024 * 1024;

/// `GET /api/modules`: the modules this instance serves.
async fn modules(State(state): State<AppState>) -> AppResult<Json<ModulesResponse>> {
    Ok(Json(ModulesResponse { modules: state.config.modules.clone() }))
}

pub fn router(state: AppState) -> Router {
    let public_api = Router::new()
        .route("/user/sign_in", post(auth::sign_in))
        .route("/share/{slug}", get(shares::get_share));

    let owner_api = Router::new()
        .route("/modules", get(modules))
        .route("/shares", get(shares::list_shares).post(shares::create_share))
        .route("/shares/{slug}", delete(shares::remove_share))
        .route("/gallery", get(gallery::list_albums))
        .route("/gallery/{album}/images", get(gallery::list_images))
        .route("/gallery/{album}/image/{file}", get(gallery::get_image))
        .route("/gallery/{album}/thumbnail/{file}", get(gallery::get_thumbnail))
        .route("/gallery/{album}/exif/{file}", get(gallery::get_exif))
        .route("/files", get(files::tree))
        .route("/files/file/{*path}", get(files::get_file).delete(files::remove_file))
        .route(
            "/files/upload/{*path}",
            post(files::upload).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/files/mkdir/{*path}", post(files::mkdir))
        .route("/files/rmdir/{*path}", post(files::rmdir))
        .route_layer(from_fn_with_state(state.clone(), session::require_owner));

    // Share-mounted module routes. Each read route carries its scope rule;
    // everything owner-only answers 404 for any method, so a guest cannot
    // even learn that the route exists.
    let shared = Router::new()
        .route("/gallery", any(scope::deny))
        .route(
            "/gallery/{album}/images",
            get(gallery::list_images)
                .fallback(scope::deny)
                .layer(from_fn_with_state(ScopeRule::gallery("album", None), scope::verify)),
        )
        .route(
            "/gallery/{album}/image/{file}",
            get(gallery::get_image)
                .fallback(scope::deny)
                .layer(from_fn_with_state(ScopeRule::gallery("album", Some("file")), scope::verify)),
        )
        .route(
            "/gallery/{album}/thumbnail/{file}",
            get(gallery::get_thumbnail)
                .fallback(scope::deny)
                .layer(from_fn_with_state(ScopeRule::gallery("album", Some("file")), scope::verify)),
        )
        .route(
            "/gallery/{album}/exif/{file}",
            get(gallery::get_exif)
                .fallback(scope::deny)
                .layer(from_fn_with_state(ScopeRule::gallery("album", Some("file")), scope::verify)),
        )
        .route(
            "/files",
            get(files::tree)
                .fallback(scope::deny)
                .layer(from_fn_with_state(ScopeRule::files(None), scope::verify)),
        )
        .route(
            "/files/file/{*path}",
            get(files::get_file)
                .fallback(scope::deny)
                .layer(from_fn_with_state(ScopeRule::files(Some("path")), scope::verify)),
        )
        .route("/files/upload/{*path}", any(scope::deny))
        .route("/files/mkdir/{*path}", any(scope::deny))
        .route("/files/rmdir/{*path}", any(scope::deny))
        .route_layer(from_fn_with_state(state.clone(), share_gate::resolve_share));

    let cfg = state.config.clone();

    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/metrics", get(health::metrics))
        .route("/version", get(health::version))
        .nest("/api", public_api.merge(owner_api))
        .nest("/share/{slug}", shared)
        .fallback(scope::deny)
        .with_state(state)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(from_fn_with_state(cfg, security_headers::security_headers_middleware))
}
