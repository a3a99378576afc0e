use axum::{extract::State, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::error::AppResult;
use crate::middleware::auth::SESSION_COOKIE;
use crate::state::AppState;
use crate::types::{SignInRequest, SignInResponse};

/// `POST /api/user/sign_in`
///
/// Exchanges username/password for a session token. The token is returned in
/// the body and additionally set as an HTTP-only cookie, so both API clients
/// and the browser UI can hold a session.
pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<SignInRequest>,
) -> AppResult<(CookieJar, Json<SignInResponse>)> {
    let token = match state.credentials.authenticate(&req.username, &req.password) {
        Ok(token) => token,
        Err(e) => {
            state.metrics.inc_auth_failures();
            return Err(e.into());
        }
    };
    state.metrics.inc_sign_ins();

    let cookie = Cookie::build((SESSION_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();

    Ok((jar.add(cookie), Json(SignInResponse { token })))
}
