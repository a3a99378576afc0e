//! Persistence for share grants.
//!
//! The store owns every share record's lifetime: creation with exclusive
//! slugs, lookup, enumeration, deletion and the periodic expiry sweep. Two
//! implementations exist: the disk store used in production (one JSON file
//! per slug) and an in-memory store for tests.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::Share;
use crate::metrics::Metrics;

#[derive(Debug, thiserror::Error)]
pub enum ShareStoreError {
    #[error("share not found")]
    NotFound,
    #[error("share already exists")]
    Conflict,
    #[error("invalid share record")]
    InvalidRecord,
    #[error("share store i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("share store encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Manages share metadata.
#[async_trait]
pub trait ShareStore: Send + Sync {
    /// Returns all persisted shares, order unspecified.
    async fn all(&self) -> Result<Vec<Share>, ShareStoreError>;
    /// Persists a new share. Fails with `Conflict` if the slug exists and
    /// with `InvalidRecord` if required fields are empty.
    async fn save(&self, share: &Share) -> Result<(), ShareStoreError>;
    /// Returns the share for a slug.
    async fn get(&self, slug: &str) -> Result<Share, ShareStoreError>;
    /// Removes the share for a slug. Fails with `NotFound` if absent.
    async fn remove(&self, slug: &str) -> Result<(), ShareStoreError>;
    /// Removes all expired shares and returns how many were deleted.
    ///
    /// Best-effort: a record that fails to delete does not stop the sweep;
    /// the first error is reported after all records were attempted.
    async fn expire(&self) -> Result<usize, ShareStoreError>;
}

/// On-disk share store: one JSON file per slug under a fixed directory.
pub struct DiskShareStore {
    dir: PathBuf,
}

impl DiskShareStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, ShareStoreError> {
        let dir = dir.into();
        if dir.as_os_str().is_empty() {
            return Err(ShareStoreError::Io(std::io::Error::new(
                ErrorKind::InvalidInput,
                "share dir can't be empty",
            )));
        }
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn slug_path(&self, slug: &str) -> Result<PathBuf, ShareStoreError> {
        // Slugs are generated server-side, but the store still refuses
        // anything that could address a file outside its directory.
        if slug.is_empty() || slug.starts_with('.') || slug.contains(['/', '\\']) {
            return Err(ShareStoreError::NotFound);
        }
        Ok(self.dir.join(slug))
    }
}

#[async_trait]
impl ShareStore for DiskShareStore {
    async fn all(&self) -> Result<Vec<Share>, ShareStoreError> {
        let mut shares = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(slug) = name.to_str() else { continue };
            // Hidden entries are in-flight temp files, not records.
            if slug.starts_with('.') {
                continue;
            }
            match self.get(slug).await {
                Ok(share) => shares.push(share),
                // Deleted between listing and read: a valid outcome.
                Err(ShareStoreError::NotFound) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(shares)
    }

    async fn save(&self, share: &Share) -> Result<(), ShareStoreError> {
        if !share.is_valid() {
            return Err(ShareStoreError::InvalidRecord);
        }
        let path = self.slug_path(&share.slug).map_err(|_| ShareStoreError::InvalidRecord)?;
        let data = serde_json::to_vec(share)?;

        // Write the whole record to a hidden temp file first, then publish it
        // with a hard link: link fails if the slug exists, and a reader never
        // observes a partially written record.
        let tmp = self.dir.join(format!(".{}.{}.tmp", share.slug, uuid::Uuid::new_v4()));
        tokio::fs::write(&tmp, &data).await?;
        let linked = tokio::fs::hard_link(&tmp, &path).await;
        let _ = tokio::fs::remove_file(&tmp).await;

        match linked {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(ShareStoreError::Conflict),
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, slug: &str) -> Result<Share, ShareStoreError> {
        let path = self.slug_path(slug)?;
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(ShareStoreError::NotFound),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice(&data) {
            Ok(share) => Ok(share),
            Err(e) => {
                tracing::warn!(slug, "unreadable share record: {}", e);
                Err(ShareStoreError::NotFound)
            }
        }
    }

    async fn remove(&self, slug: &str) -> Result<(), ShareStoreError> {
        let path = self.slug_path(slug)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(ShareStoreError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    async fn expire(&self) -> Result<usize, ShareStoreError> {
        let now = Utc::now();
        let mut removed = 0;
        let mut first_error = None;

        for share in self.all().await? {
            if !share.is_expired_at(now) {
                continue;
            }
            match self.remove(&share.slug).await {
                Ok(()) | Err(ShareStoreError::NotFound) => removed += 1,
                Err(e) => {
                    tracing::warn!(slug = %share.slug, "failed to remove expired share: {}", e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(removed),
        }
    }
}

/// In-memory share store used by tests.
#[derive(Default)]
pub struct MemoryShareStore {
    shares: RwLock<HashMap<String, Share>>,
}

impl MemoryShareStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ShareStore for MemoryShareStore {
    async fn all(&self) -> Result<Vec<Share>, ShareStoreError> {
        Ok(self.shares.read().await.values().cloned().collect())
    }

    async fn save(&self, share: &Share) -> Result<(), ShareStoreError> {
        if !share.is_valid() {
            return Err(ShareStoreError::InvalidRecord);
        }
        let mut shares = self.shares.write().await;
        if shares.contains_key(&share.slug) {
            return Err(ShareStoreError::Conflict);
        }
        shares.insert(share.slug.clone(), share.clone());
        Ok(())
    }

    async fn get(&self, slug: &str) -> Result<Share, ShareStoreError> {
        self.shares.read().await.get(slug).cloned().ok_or(ShareStoreError::NotFound)
    }

    async fn remove(&self, slug: &str) -> Result<(), ShareStoreError> {
        self.shares.write().await.remove(slug).map(|_| ()).ok_or(ShareStoreError::NotFound)
    }

    async fn expire(&self) -> Result<usize, ShareStoreError> {
        let now = Utc::now();
        let mut shares = self.shares.write().await;
        let before = shares.len();
        shares.retain(|_, share| !share.is_expired_at(now));
        Ok(before - shares.len())
    }
}

/// Spawns the periodic expiry sweep for the lifetime of the server.
///
/// The sweep runs independently of request handling, only deletes records and
/// never fails the process; errors are logged and the next tick retries. The
/// task stops when `cancel` fires, so graceful shutdown and tests can end it
/// deterministically.
pub fn spawn_expiry_sweep(
    store: Arc<dyn ShareStore>,
    period: Duration,
    cancel: CancellationToken,
    metrics: Metrics,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The immediate first tick clears anything that expired while the
        // server was down.
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    metrics.inc_sweep_runs();
                    match store.expire().await {
                        Ok(0) => {}
                        Ok(removed) => {
                            metrics.add_shares_expired(removed);
                            tracing::info!(removed, "expired shares removed");
                        }
                        Err(e) => tracing::warn!("share expiry sweep failed: {}", e),
                    }
                }
            }
        }
    })
}
