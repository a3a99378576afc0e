use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::credentials::CredentialsError;
use crate::share::store::ShareStoreError;

/// The primary error type for the application.
///
/// Every failure a handler or middleware can produce is funneled through this
/// enum so the HTTP mapping lives in exactly one place. Authorization denials
/// are always surfaced as `NotFound` with a generic message so a caller cannot
/// distinguish "does not exist" from "not yours to see".
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing or invalid owner session token.
    #[error("{0}")]
    Unauthorized(String),
    /// Unknown resource, unknown slug, or an out-of-scope share request.
    #[error("{0}")]
    NotFound(String),
    /// Malformed request or a failed collaborator operation with a
    /// client-relevant message.
    #[error("{0}")]
    BadRequest(String),
    /// Structurally valid request describing an invalid entity.
    #[error("{0}")]
    Unprocessable(String),
    /// Request conflicts with existing state (duplicate share slug).
    #[error("{0}")]
    Conflict(String),
    /// Unexpected internal failure; details are logged, never echoed.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal(e) => {
                let error_id = uuid::Uuid::new_v4();
                tracing::error!(%error_id, "internal error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, format!("internal error (id {})", error_id))
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<ShareStoreError> for AppError {
    fn from(err: ShareStoreError) -> Self {
        match err {
            ShareStoreError::NotFound => AppError::NotFound("share not found".to_string()),
            ShareStoreError::Conflict => AppError::Conflict("share already exists".to_string()),
            ShareStoreError::InvalidRecord => AppError::Unprocessable("invalid share".to_string()),
            ShareStoreError::Io(e) => {
                tracing::error!("share store i/o error: {}", e);
                AppError::BadRequest("share store unavailable".to_string())
            }
            ShareStoreError::Encoding(e) => {
                tracing::error!("share store encoding error: {}", e);
                AppError::BadRequest("share store unavailable".to_string())
            }
        }
    }
}

impl From<CredentialsError> for AppError {
    fn from(err: CredentialsError) -> Self {
        match err {
            CredentialsError::InvalidCredentials => AppError::BadRequest(err.to_string()),
            CredentialsError::InvalidToken => AppError::Unauthorized("unauthorized".to_string()),
            CredentialsError::Signing(e) => {
                tracing::error!("token signing failed: {}", e);
                AppError::BadRequest("failed to issue token".to_string())
            }
            CredentialsError::BadHash(_) => AppError::Internal(anyhow::Error::from(err)),
        }
    }
}

/// A type alias for `Result<T, AppError>`, used throughout the application.
pub type AppResult<T> = Result<T, AppError>;

/// An extension trait for `Option` that converts `None` into a `NotFound`.
pub trait OptionExt<T> {
    fn ok_or_not_found(self, entity: &str) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, entity: &str) -> AppResult<T> {
        self.ok_or_else(|| AppError::NotFound(format!("{} not found", entity)))
    }
}
