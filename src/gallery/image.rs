//! Thumbnail generation and image metadata via the `image` crate.

use std::io::Cursor;

use anyhow::Context;
use image::{DynamicImage, ImageFormat, ImageReader};
use serde::Serialize;

/// Longest thumbnail edge in pixels.
pub const THUMBNAIL_SIZE: u32 = 200;

/// Metadata reported for an image: dimensions plus the detected format.
#[derive(Debug, Clone, Serialize)]
pub struct ImageMeta {
    pub width: u32,
    pub height: u32,
    pub mime_type: String,
}

/// Produces a JPEG thumbnail with the longest edge capped at `max_size`.
pub fn thumbnail(data: &[u8], max_size: u32) -> anyhow::Result<Vec<u8>> {
    let img = image::load_from_memory(data).context("decode image")?;
    let thumb = img.thumbnail(max_size, max_size);

    // JPEG has no alpha channel; normalize before encoding.
    let rgb = DynamicImage::ImageRgb8(thumb.to_rgb8());
    let mut out = Cursor::new(Vec::new());
    rgb.write_to(&mut out, ImageFormat::Jpeg).context("encode thumbnail")?;
    Ok(out.into_inner())
}

/// Reads dimensions and format without decoding the full image.
pub fn metadata(data: &[u8]) -> anyhow::Result<ImageMeta> {
    let reader = ImageReader::new(Cursor::new(data)).with_guessed_format().context("probe image")?;
    let format = reader.format().context("unknown image format")?;
    let (width, height) = reader.into_dimensions().context("read image dimensions")?;

    Ok(ImageMeta { width, height, mime_type: format.to_mime_type().to_string() })
}
