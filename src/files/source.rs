use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{Item, ItemKind};
use crate::pathutil;

/// Provides the file tree and file contents for the files module.
#[async_trait]
pub trait FilesSource: Send + Sync {
    /// Returns the full tree rooted at `/`.
    async fn tree(&self) -> anyhow::Result<Item>;
    /// Returns the contents of a file.
    async fn file(&self, path: &str) -> anyhow::Result<Vec<u8>>;
    /// Writes a file and returns its tree entry.
    async fn save(&self, data: &[u8], path: &str) -> anyhow::Result<Item>;
    /// Removes a file and returns its former tree entry.
    async fn remove(&self, path: &str) -> anyhow::Result<Item>;
    /// Creates a directory and returns its tree entry.
    async fn mkdir(&self, path: &str) -> anyhow::Result<Item>;
    /// Removes a directory including its contents.
    async fn rmdir(&self, path: &str) -> anyhow::Result<()>;
}

/// Disk-backed source rooted at a fixed base directory. Every caller-supplied
/// path is sanitized before it touches the filesystem.
pub struct DiskFilesSource {
    base: PathBuf,
}

impl DiskFilesSource {
    pub fn new(base: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let base = base.into();
        if !base.is_absolute() {
            bail!("files path is not absolute");
        }
        let meta = std::fs::metadata(&base).context("invalid files path")?;
        if !meta.is_dir() {
            bail!("files path is not a directory");
        }
        Ok(Self { base })
    }

    fn disk_path(&self, path: &str) -> PathBuf {
        pathutil::join_under(&self.base, &[path])
    }

    fn rel_path(&self, path: &str) -> String {
        format!("/{}", pathutil::sanitize(path))
    }

    fn walk(&self, dir: &Path, rel: &str) -> anyhow::Result<Vec<Item>> {
        let mut entries: Vec<_> = std::fs::read_dir(dir)
            .with_context(|| format!("walk {}", dir.display()))?
            .collect::<Result<_, _>>()?;
        entries.sort_by_key(|e| e.file_name());

        let mut items = Vec::with_capacity(entries.len());
        for entry in entries {
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => continue,
            };
            let meta = entry.metadata()?;
            let mod_time = meta.modified().map(DateTime::<Utc>::from).unwrap_or_else(|_| Utc::now());
            let path = if rel == "/" { format!("/{}", name) } else { format!("{}/{}", rel, name) };

            if meta.is_dir() {
                let children = self.walk(&entry.path(), &path)?;
                items.push(Item { kind: ItemKind::Directory, name, path, mod_time, children });
            } else {
                items.push(Item {
                    kind: ItemKind::File,
                    name,
                    path,
                    mod_time,
                    children: Vec::new(),
                });
            }
        }
        Ok(items)
    }

    fn entry_for(&self, kind: ItemKind, path: &str) -> Item {
        let rel = self.rel_path(path);
        let name = rel.rsplit('/').next().unwrap_or_default().to_string();
        Item { kind, name, path: rel, mod_time: Utc::now(), children: Vec::new() }
    }
}

#[async_trait]
impl FilesSource for DiskFilesSource {
    async fn tree(&self) -> anyhow::Result<Item> {
        Ok(Item {
            kind: ItemKind::Directory,
            name: "/".to_string(),
            path: "/".to_string(),
            mod_time: Utc::now(),
            children: self.walk(&self.base, "/")?,
        })
    }

    async fn file(&self, path: &str) -> anyhow::Result<Vec<u8>> {
        let disk_path = self.disk_path(path);
        tokio::fs::read(&disk_path)
            .await
            .with_context(|| format!("read {}", disk_path.display()))
    }

    async fn save(&self, data: &[u8], path: &str) -> anyhow::Result<Item> {
        let disk_path = self.disk_path(path);
        tokio::fs::write(&disk_path, data)
            .await
            .with_context(|| format!("write {}", disk_path.display()))?;
        Ok(self.entry_for(ItemKind::File, path))
    }

    async fn remove(&self, path: &str) -> anyhow::Result<Item> {
        let disk_path = self.disk_path(path);
        tokio::fs::remove_file(&disk_path)
            .await
            .with_context(|| format!("remove {}", disk_path.display()))?;
        Ok(self.entry_for(ItemKind::File, path))
    }

    async fn mkdir(&self, path: &str) -> anyhow::Result<Item> {
        let disk_path = self.disk_path(path);
        tokio::fs::create_dir(&disk_path)
            .await
            .with_context(|| format!("mkdir {}", disk_path.display()))?;
        Ok(self.entry_for(ItemKind::Directory, path))
    }

    async fn rmdir(&self, path: &str) -> anyhow::Result<()> {
        let disk_path = self.disk_path(path);
        // Refuse to remove the source root itself.
        if disk_path == self.base {
            bail!("refusing to remove the source root");
        }
        tokio::fs::remove_dir_all(&disk_path)
            .await
            .with_context(|| format!("rmdir {}", disk_path.display()))
    }
}
