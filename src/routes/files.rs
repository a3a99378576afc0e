use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult, OptionExt};
use crate::files::{scoped_tree, Item};
use crate::middleware::RequestScope;
use crate::state::AppState;

// Named struct so the share mount's extra `slug` parameter is ignored during
// extraction.
#[derive(Deserialize)]
pub struct FileParams {
    path: String,
}

/// `GET .../files`: the tree, restricted to the granted subtree when a
/// share is attached.
pub async fn tree(State(state): State<AppState>, scope: RequestScope) -> AppResult<Json<Item>> {
    let files = state.files.as_ref().ok_or_not_found("module")?;
    let tree = files
        .source
        .tree()
        .await
        .map_err(|e| AppError::BadRequest(format!("failed to traverse path: {}", e)))?;

    let tree = match &scope.share {
        Some(share) => scoped_tree(&tree, share).ok_or_not_found("path")?,
        None => tree,
    };

    Ok(Json(tree))
}

/// `GET .../files/file/{*path}`: file contents, base64-encoded the way the
/// web client expects them.
pub async fn get_file(
    State(state): State<AppState>,
    Path(FileParams { path }): Path<FileParams>,
) -> AppResult<Response> {
    let files = state.files.as_ref().ok_or_not_found("module")?;
    let contents = files.source.file(&path).await.map_err(|e| {
        tracing::debug!("failed to read file: {}", e);
        AppError::NotFound("file not found".to_string())
    })?;

    let body = STANDARD.encode(contents);
    Ok(([(header::CONTENT_TYPE, "application/base64")], body).into_response())
}

/// `POST /api/files/upload/{*path}`: multipart upload into the directory at
/// `path`; the target file name comes from the form part.
pub async fn upload(
    State(state): State<AppState>,
    Path(path): Path<String>,
    mut multipart: Multipart,
) -> AppResult<Json<Item>> {
    let files = state.files.as_ref().ok_or_not_found("module")?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("failed to parse upload: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(|n| n.to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| AppError::BadRequest("upload is missing a file name".to_string()))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("failed to read upload: {}", e)))?;

        let item = files
            .source
            .save(&data, &format!("{}/{}", path, file_name))
            .await
            .map_err(|e| AppError::BadRequest(format!("failed to save upload: {}", e)))?;
        return Ok(Json(item));
    }

    Err(AppError::BadRequest("upload is missing a 'file' part".to_string()))
}

/// `DELETE /api/files/file/{*path}`
pub async fn remove_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> AppResult<Json<Item>> {
    let files = state.files.as_ref().ok_or_not_found("module")?;
    let item = files
        .source
        .remove(&path)
        .await
        .map_err(|e| AppError::BadRequest(format!("failed to remove file: {}", e)))?;
    Ok(Json(item))
}

/// `POST /api/files/mkdir/{*path}`
pub async fn mkdir(State(state): State<AppState>, Path(path): Path<String>) -> AppResult<Json<Item>> {
    let files = state.files.as_ref().ok_or_not_found("module")?;
    let item = files
        .source
        .mkdir(&path)
        .await
        .map_err(|e| AppError::BadRequest(format!("failed to create dir: {}", e)))?;
    Ok(Json(item))
}

/// `POST /api/files/rmdir/{*path}`
pub async fn rmdir(State(state): State<AppState>, Path(path): Path<String>) -> AppResult<Json<Value>> {
    let files = state.files.as_ref().ok_or_not_found("module")?;
    files
        .source
        .rmdir(&path)
        .await
        .map_err(|e| AppError::BadRequest(format!("failed to remove dir: {}", e)))?;
    Ok(Json(json!({})))
}
