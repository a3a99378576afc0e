use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::error::{AppError, AppResult, OptionExt};
use crate::gallery::image::{self, ImageMeta, THUMBNAIL_SIZE};
use crate::gallery::{Album, Image};
use crate::middleware::RequestScope;
use crate::state::AppState;

// Named structs instead of tuples: share-mounted routes carry the extra
// `slug` parameter, which map-based deserialization ignores.
#[derive(Deserialize)]
pub struct AlbumParams {
    album: String,
}

#[derive(Deserialize)]
pub struct ImageParams {
    album: String,
    file: String,
}

/// `GET /api/gallery`: album index, owner only.
pub async fn list_albums(State(state): State<AppState>) -> AppResult<Json<Vec<Album>>> {
    let gallery = state.gallery.as_ref().ok_or_not_found("module")?;
    let albums = gallery
        .source
        .albums()
        .await
        .map_err(|e| AppError::BadRequest(format!("failed to fetch albums: {}", e)))?;
    Ok(Json(albums))
}

/// `GET .../gallery/{album}/images`
///
/// Under a share mount the listing is filtered down to the allow-listed
/// images; individual image access is verified again by the scope gate.
pub async fn list_images(
    State(state): State<AppState>,
    scope: RequestScope,
    Path(AlbumParams { album }): Path<AlbumParams>,
) -> AppResult<Json<Vec<Image>>> {
    let gallery = state.gallery.as_ref().ok_or_not_found("module")?;
    let mut images = gallery
        .source
        .images(&album)
        .await
        .map_err(|e| AppError::BadRequest(format!("failed to fetch images: {}", e)))?;

    if let Some(share) = &scope.share {
        images.retain(|img| share.includes(&album, &img.path));
    }

    Ok(Json(images))
}

/// `GET .../gallery/{album}/image/{file}`
pub async fn get_image(
    State(state): State<AppState>,
    Path(ImageParams { album, file }): Path<ImageParams>,
) -> AppResult<Response> {
    let gallery = state.gallery.as_ref().ok_or_not_found("module")?;
    let data = gallery.source.image(&album, &file).await.map_err(|e| {
        tracing::debug!("failed to fetch image: {}", e);
        AppError::NotFound("image not found".to_string())
    })?;

    let mime = mime_guess::from_path(&file).first_or_octet_stream();
    Ok(([(header::CONTENT_TYPE, mime.as_ref().to_string())], data).into_response())
}

/// `GET .../gallery/{album}/thumbnail/{file}`
///
/// Thumbnails are generated on first access and then served from the cache.
pub async fn get_thumbnail(
    State(state): State<AppState>,
    Path(ImageParams { album, file }): Path<ImageParams>,
) -> AppResult<Response> {
    let gallery = state.gallery.as_ref().ok_or_not_found("module")?;
    let cache_key = format!("{}/{}", album, file);

    if let Some(thumb) = gallery.cache.thumbnail(&cache_key).await {
        return Ok(jpeg_response(thumb));
    }

    let data = gallery.source.image(&album, &file).await.map_err(|e| {
        tracing::debug!("failed to fetch image: {}", e);
        AppError::NotFound("image not found".to_string())
    })?;
    let thumb = image::thumbnail(&data, THUMBNAIL_SIZE).map_err(|e| {
        tracing::warn!("failed to generate thumbnail for {}: {}", cache_key, e);
        AppError::NotFound("image not found".to_string())
    })?;

    if let Err(e) = gallery.cache.store_thumbnail(&cache_key, &thumb).await {
        // Serving still works without the cache entry.
        tracing::warn!("failed to cache thumbnail for {}: {}", cache_key, e);
    }

    Ok(jpeg_response(thumb))
}

/// `GET .../gallery/{album}/exif/{file}`: image metadata for the detail
/// panel.
pub async fn get_exif(
    State(state): State<AppState>,
    Path(ImageParams { album, file }): Path<ImageParams>,
) -> AppResult<Json<ImageMeta>> {
    let gallery = state.gallery.as_ref().ok_or_not_found("module")?;
    let data = gallery.source.image(&album, &file).await.map_err(|e| {
        tracing::debug!("failed to fetch image: {}", e);
        AppError::NotFound("image not found".to_string())
    })?;

    let meta = image::metadata(&data)
        .map_err(|e| AppError::NotFound(format!("failed to read image metadata: {}", e)))?;
    Ok(Json(meta))
}

fn jpeg_response(data: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, "image/jpeg".to_string())], data).into_response()
}
