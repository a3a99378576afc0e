//! Owner-session gate for `/api` routes.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use super::RequestScope;
use crate::error::AppError;
use crate::state::AppState;

/// Name of the HTTP-only cookie set on sign-in.
pub const SESSION_COOKIE: &str = "session";

/// Rejects requests without a valid owner session token.
///
/// The token is taken from the `Authorization: Bearer` header, the session
/// cookie, or the `jwt` query parameter (image elements cannot send
/// headers). On success the resolved principal is
/// attached to the request; on failure the request ends with a generic `401`.
pub async fn require_owner(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&req)
        .or_else(|| jar.get(SESSION_COOKIE).map(|c| c.value().to_string()))
        .or_else(|| query_token(&req))
        .unwrap_or_default();

    match state.credentials.validate(&token) {
        Ok(username) => {
            req.extensions_mut().insert(RequestScope::owner(username));
            Ok(next.run(req).await)
        }
        Err(_) => {
            state.metrics.inc_auth_failures();
            Err(AppError::Unauthorized("unauthorized".to_string()))
        }
    }
}

fn bearer_token(req: &Request) -> Option<String> {
    let header = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    if header.len() < 7 || !header[..7].eq_ignore_ascii_case("bearer ") {
        return None;
    }
    Some(header[7..].trim().to_string())
}

// Tokens are base64url and dots only, so no percent-decoding is needed.
fn query_token(req: &Request) -> Option<String> {
    req.uri()
        .query()?
        .split('&')
        .find_map(|pair| pair.strip_prefix("jwt="))
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}
