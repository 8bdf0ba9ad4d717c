/// Blob storage system
///
/// Durable storage for attachment binaries (images, PDFs), independent of
/// the content records that reference them.
pub mod disk;
pub mod models;
pub mod store;

pub use models::*;
pub use store::BlobStore;

use crate::error::CmsResult;
use async_trait::async_trait;
use std::path::PathBuf;

/// Content types accepted for attachment uploads
pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/webp",
    "application/pdf",
];

/// Blob storage backend trait
///
/// Implementations handle the raw byte storage; metadata lives in the
/// database, keyed by blob id.
#[async_trait]
pub trait BlobBackend: Send + Sync {
    /// Store blob bytes under an id. Must be all-or-nothing: a failure
    /// mid-write never leaves bytes retrievable under the id.
    async fn put(&self, id: &str, data: &[u8]) -> CmsResult<()>;

    /// Retrieve blob bytes by id
    async fn get(&self, id: &str) -> CmsResult<Option<Vec<u8>>>;

    /// Delete blob bytes. Deleting an absent id is success.
    async fn delete(&self, id: &str) -> CmsResult<()>;

    /// Check if blob bytes exist
    async fn exists(&self, id: &str) -> CmsResult<bool>;
}

/// Configuration for blob storage
#[derive(Debug, Clone)]
pub struct BlobStorageConfig {
    /// Where committed blobs live
    pub location: PathBuf,

    /// Staging area for in-flight writes, same filesystem as `location`
    /// so the commit rename is atomic
    pub tmp_location: PathBuf,

    /// Maximum blob size in bytes
    pub max_blob_size: usize,
}

impl Default for BlobStorageConfig {
    fn default() -> Self {
        Self {
            location: PathBuf::from("./data/blobs"),
            tmp_location: PathBuf::from("./data/tmp"),
            max_blob_size: 10 * 1024 * 1024, // 10MB
        }
    }
}
