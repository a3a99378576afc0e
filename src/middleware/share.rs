//! Share-resolution gate for `/share/{slug}` routes.

use axum::{
    extract::{RawPathParams, Request, State},
    middleware::Next,
    response::Response,
};

use super::RequestScope;
use crate::error::AppError;
use crate::state::AppState;

/// Resolves the slug from the route into a share grant and attaches it to the
/// request.
///
/// Missing slug, unknown slug and unreadable record all collapse into the
/// same `404` so a caller cannot learn whether a slug exists. A
/// record whose expiry has passed but which the sweep has not yet removed is
/// still honored; only the sweep consults expiry.
pub async fn resolve_share(
    State(state): State<AppState>,
    params: RawPathParams,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let slug = params
        .iter()
        .find_map(|(key, value)| (key == "slug").then_some(value))
        .unwrap_or_default();
    if slug.is_empty() {
        return Err(not_found());
    }

    let share = state.shares.get(slug).await.map_err(|_| not_found())?;
    req.extensions_mut().insert(RequestScope::shared(share));
    Ok(next.run(req).await)
}

fn not_found() -> AppError {
    AppError::NotFound("Not Found".to_string())
}
