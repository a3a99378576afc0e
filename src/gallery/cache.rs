use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;

use crate::pathutil;

/// Stores generated thumbnails keyed by `album/file` paths.
#[async_trait]
pub trait ThumbnailCache: Send + Sync {
    /// Returns the cached thumbnail, if any.
    async fn thumbnail(&self, path: &str) -> Option<Vec<u8>>;
    /// Persists a generated thumbnail.
    async fn store_thumbnail(&self, path: &str, data: &[u8]) -> anyhow::Result<()>;
}

/// Disk cache mirroring the album layout under its own directory.
pub struct DiskThumbnailCache {
    dir: PathBuf,
}

impl DiskThumbnailCache {
    pub fn new(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).context("create thumbnail cache dir")?;
        Ok(Self { dir })
    }

    fn cache_path(&self, path: &str) -> PathBuf {
        pathutil::join_under(&self.dir, &[path])
    }
}

#[async_trait]
impl ThumbnailCache for DiskThumbnailCache {
    async fn thumbnail(&self, path: &str) -> Option<Vec<u8>> {
        tokio::fs::read(self.cache_path(path)).await.ok()
    }

    async fn store_thumbnail(&self, path: &str, data: &[u8]) -> anyhow::Result<()> {
        let cache_path = self.cache_path(path);
        if let Some(parent) = cache_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&cache_path, data)
            .await
            .with_context(|| format!("write {}", cache_path.display()))
    }
}
