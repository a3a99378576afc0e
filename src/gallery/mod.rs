//! The gallery module: photo albums, thumbnails and image metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod cache;
pub mod image;
pub mod source;

/// Album metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub name: String,
    #[serde(rename = "updated_at")]
    pub mod_time: DateTime<Utc>,
    pub items_count: usize,
}

/// Image metadata. `path` is the image's identifier within its album and the
/// value share allow-lists are matched against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub name: String,
    pub path: String,
    #[serde(rename = "updated_at")]
    pub mod_time: DateTime<Utc>,
}
