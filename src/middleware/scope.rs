//! Per-route scope verification for share-mounted module routes.
//!
//! Instead of every handler re-checking the grant on its own, each share
//! route declares a [`ScopeRule`] at router assembly: which module it belongs
//! to and which path parameters carry the resource name and the item. The
//! single [`verify`] middleware evaluates the rule against the resolved
//! share. All denials are `404`, so a guest cannot distinguish a
//! wrong-typed, out-of-scope or disallowed request from a missing resource.

use axum::{
    extract::{RawPathParams, Request, State},
    middleware::Next,
    response::Response,
};

use super::RequestScope;
use crate::error::AppError;
use crate::pathutil;
use crate::types::ModuleKind;

/// Declarative scope rule attached to one share route.
#[derive(Debug, Clone, Copy)]
pub struct ScopeRule {
    pub module: ModuleKind,
    /// Path parameter holding the resource name (album), checked for
    /// equality with the grant's `name`.
    pub name_param: Option<&'static str>,
    /// Path parameter holding the item; matched exactly for gallery items
    /// and hierarchically for file paths.
    pub item_param: Option<&'static str>,
}

impl ScopeRule {
    pub const fn gallery(name_param: &'static str, item_param: Option<&'static str>) -> Self {
        Self { module: ModuleKind::Gallery, name_param: Some(name_param), item_param }
    }

    pub const fn files(item_param: Option<&'static str>) -> Self {
        Self { module: ModuleKind::Files, name_param: None, item_param }
    }
}

/// Verifies the resolved share against the route's scope rule.
///
/// Without an attached share (owner traffic, or a route outside the share
/// mount) the request passes untouched; owner routes never run this gate.
pub async fn verify(
    State(rule): State<ScopeRule>,
    params: RawPathParams,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(share) = req.extensions().get::<RequestScope>().and_then(|s| s.share.clone()) else {
        return Ok(next.run(req).await);
    };

    if share.kind != rule.module {
        return Err(not_found());
    }

    let param = |name: &str| {
        params.iter().find_map(|(key, value)| (key == name).then_some(value)).unwrap_or_default()
    };

    if let Some(name_param) = rule.name_param {
        if param(name_param) != share.name {
            return Err(not_found());
        }
    }

    if let Some(item_param) = rule.item_param {
        let item = param(item_param);
        let allowed = match rule.module {
            ModuleKind::Gallery => share.items.iter().any(|i| i == item),
            ModuleKind::Files => share.includes_path(&format!("/{}", pathutil::sanitize(item))),
        };
        if !allowed {
            return Err(not_found());
        }
    }

    Ok(next.run(req).await)
}

/// Handler for share sub-routes that only the owner may use (index listings,
/// uploads, deletes). Responds `404` unconditionally.
pub async fn deny() -> AppError {
    not_found()
}

fn not_found() -> AppError {
    AppError::NotFound("Not Found".to_string())
}
