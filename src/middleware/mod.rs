//! Middleware implementing the per-request authorization chain.
//!
//! Requests move through up to three gates: the owner-session gate
//! ([`auth`]), the share-resolution gate ([`share`]) and per-route scope
//! verification ([`scope`]). Whichever gate admits a request records the
//! outcome in a [`RequestScope`] attached to the request, which the resource
//! handlers read back through an extractor.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

pub mod auth;
pub mod scope;
pub mod security_headers;
pub mod share;

/// Request-scoped authorization state.
///
/// Exactly one of the two fields is set once a gate has run: `principal` for
/// an authenticated owner, `share` for a resolved share grant. Routes outside
/// both gates see the default empty scope. The value lives only in the
/// request's extensions and is never retained across requests.
#[derive(Debug, Clone, Default)]
pub struct RequestScope {
    pub principal: Option<String>,
    pub share: Option<crate::share::Share>,
}

impl RequestScope {
    pub fn owner(principal: String) -> Self {
        Self { principal: Some(principal), share: None }
    }

    pub fn shared(share: crate::share::Share) -> Self {
        Self { principal: None, share: Some(share) }
    }
}

impl<S> FromRequestParts<S> for RequestScope
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<RequestScope>().cloned().unwrap_or_default())
    }
}
