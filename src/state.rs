use std::sync::Arc;

use crate::config::AppConfig;
use crate::credentials::CredentialsStorage;
use crate::files::source::FilesSource;
use crate::gallery::cache::ThumbnailCache;
use crate::gallery::source::GallerySource;
use crate::metrics::Metrics;
use crate::share::store::ShareStore;

/// Backends of an enabled gallery module.
#[derive(Clone)]
pub struct GalleryState {
    pub source: Arc<dyn GallerySource>,
    pub cache: Arc<dyn ThumbnailCache>,
}

/// Backends of an enabled files module.
#[derive(Clone)]
pub struct FilesState {
    pub source: Arc<dyn FilesSource>,
}

/// The shared application state.
///
/// Cloneable for axum's state extraction; all heavy members sit behind
/// `Arc`s. The credential and share stores are capability objects so tests
/// can swap the disk-backed implementations for in-memory ones.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub credentials: Arc<dyn CredentialsStorage>,
    pub shares: Arc<dyn ShareStore>,
    pub gallery: Option<GalleryState>,
    pub files: Option<FilesState>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        credentials: Arc<dyn CredentialsStorage>,
        shares: Arc<dyn ShareStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            credentials,
            shares,
            gallery: None,
            files: None,
            metrics: Metrics::new(),
        }
    }

    pub fn with_gallery(mut self, source: Arc<dyn GallerySource>, cache: Arc<dyn ThumbnailCache>) -> Self {
        self.gallery = Some(GalleryState { source, cache });
        self
    }

    pub fn with_files(mut self, source: Arc<dyn FilesSource>) -> Self {
        self.files = Some(FilesState { source });
        self
    }
}
