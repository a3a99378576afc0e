use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{bail, Context};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use walkdir::WalkDir;

use super::{Album, Image};
use crate::pathutil;

/// Provides album and image metadata plus image contents.
#[async_trait]
pub trait GallerySource: Send + Sync {
    /// Returns all albums.
    async fn albums(&self) -> anyhow::Result<Vec<Album>>;
    /// Returns image metadata for an album.
    async fn images(&self, album: &str) -> anyhow::Result<Vec<Image>>;
    /// Returns the raw contents of one image.
    async fn image(&self, album: &str, file: &str) -> anyhow::Result<Vec<u8>>;
}

/// Disk-backed source: one directory per album under a fixed base path. Only
/// files with the configured extensions are exposed.
pub struct DiskGallerySource {
    base: PathBuf,
    extensions: HashSet<String>,
}

impl DiskGallerySource {
    pub fn new(base: impl Into<PathBuf>, extensions: &[String]) -> anyhow::Result<Self> {
        let base = base.into();
        if !base.is_absolute() {
            bail!("gallery path is not absolute");
        }
        let meta = std::fs::metadata(&base).context("invalid gallery path")?;
        if !meta.is_dir() {
            bail!("gallery path is not a directory");
        }

        let extensions = extensions.iter().map(|e| e.trim_start_matches('.').to_lowercase()).collect();
        Ok(Self { base, extensions })
    }

    fn admitted(&self, file: &str) -> bool {
        std::path::Path::new(file)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.extensions.contains(&e.to_lowercase()))
    }

    fn album_images(&self, album: &str) -> anyhow::Result<Vec<Image>> {
        let dir = pathutil::join_under(&self.base, &[album]);
        let mut images = Vec::new();

        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.with_context(|| format!("walk {}", dir.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(file_name) = entry.file_name().to_str() else { continue };
            if !self.admitted(file_name) {
                continue;
            }

            let mod_time = entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(Utc::now);
            let name = file_name.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(file_name);
            images.push(Image { name: name.to_string(), path: file_name.to_string(), mod_time });
        }

        Ok(images)
    }
}

#[async_trait]
impl GallerySource for DiskGallerySource {
    async fn albums(&self) -> anyhow::Result<Vec<Album>> {
        let mut albums = Vec::new();
        let entries = std::fs::read_dir(&self.base).context("scan gallery path")?;

        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else { continue };
            // Unreadable album directories are skipped, not fatal.
            let Ok(images) = self.album_images(&name) else { continue };

            let mod_time = entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(Utc::now);
            albums.push(Album { name, mod_time, items_count: images.len() });
        }

        albums.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(albums)
    }

    async fn images(&self, album: &str) -> anyhow::Result<Vec<Image>> {
        self.album_images(album)
    }

    async fn image(&self, album: &str, file: &str) -> anyhow::Result<Vec<u8>> {
        if !self.admitted(file) {
            bail!("unknown file: {}", file);
        }
        let path = pathutil::join_under(&self.base, &[album, file]);
        tokio::fs::read(&path).await.with_context(|| format!("read {}", path.display()))
    }
}
