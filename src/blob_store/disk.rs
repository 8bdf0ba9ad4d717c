/// Disk-based blob storage backend
use crate::{
    blob_store::BlobBackend,
    error::{CmsError, CmsResult},
};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Write granularity for staged blob files
const WRITE_CHUNK_SIZE: usize = 64 * 1024;

/// Disk storage backend
///
/// Stores blobs on the local filesystem with directory sharding based on
/// id prefixes to prevent too many files in one directory. Writes go to a
/// staging directory first and are renamed into place, so a crash or error
/// mid-write never leaves a partial blob retrievable.
#[derive(Clone)]
pub struct DiskBlobBackend {
    base_path: PathBuf,
    tmp_path: PathBuf,
}

impl DiskBlobBackend {
    /// Create a new disk storage backend
    pub fn new(base_path: PathBuf, tmp_path: PathBuf) -> Self {
        Self {
            base_path,
            tmp_path,
        }
    }

    /// Get the file path for a blob id
    ///
    /// Uses directory sharding: {base}/{first2chars}/{id}
    fn blob_path(&self, id: &str) -> PathBuf {
        if id.len() >= 2 {
            let shard = &id[0..2];
            self.base_path.join(shard).join(id)
        } else {
            self.base_path.join("_").join(id)
        }
    }

    /// Ensure the directory for a blob exists
    async fn ensure_blob_dir(&self, id: &str) -> CmsResult<PathBuf> {
        let blob_path = self.blob_path(id);
        if let Some(parent) = blob_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                CmsError::Unavailable(format!("Failed to create blob directory: {}", e))
            })?;
        }
        Ok(blob_path)
    }
}

#[async_trait]
impl BlobBackend for DiskBlobBackend {
    async fn put(&self, id: &str, data: &[u8]) -> CmsResult<()> {
        let blob_path = self.ensure_blob_dir(id).await?;

        fs::create_dir_all(&self.tmp_path)
            .await
            .map_err(|e| CmsError::Unavailable(format!("Failed to create tmp directory: {}", e)))?;
        let staging = self.tmp_path.join(id);

        // Stage the bytes, then commit with a rename. If anything fails
        // before the rename, the blob id stays unretrievable.
        let result: std::io::Result<()> = async {
            let mut file = fs::File::create(&staging).await?;
            for chunk in data.chunks(WRITE_CHUNK_SIZE) {
                file.write_all(chunk).await?;
            }
            file.sync_all().await?;
            Ok(())
        }
        .await;

        if let Err(e) = result {
            let _ = fs::remove_file(&staging).await;
            return Err(CmsError::Unavailable(format!(
                "Failed to stage blob {}: {}",
                id, e
            )));
        }

        fs::rename(&staging, &blob_path).await.map_err(|e| {
            CmsError::Unavailable(format!("Failed to commit blob {}: {}", id, e))
        })?;

        Ok(())
    }

    async fn get(&self, id: &str) -> CmsResult<Option<Vec<u8>>> {
        let blob_path = self.blob_path(id);

        match fs::read(&blob_path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CmsError::Unavailable(format!(
                "Failed to read blob {}: {}",
                id, e
            ))),
        }
    }

    async fn delete(&self, id: &str) -> CmsResult<()> {
        let blob_path = self.blob_path(id);

        match fs::remove_file(&blob_path).await {
            Ok(()) => Ok(()),
            // Already absent: the desired end state holds
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CmsError::Unavailable(format!(
                "Failed to delete blob {}: {}",
                id, e
            ))),
        }
    }

    async fn exists(&self, id: &str) -> CmsResult<bool> {
        let blob_path = self.blob_path(id);
        Ok(blob_path.exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn backend(dir: &tempfile::TempDir) -> DiskBlobBackend {
        DiskBlobBackend::new(dir.path().join("blobs"), dir.path().join("tmp"))
    }

    #[tokio::test]
    async fn test_put_and_get_blob() {
        let dir = tempdir().unwrap();
        let backend = backend(&dir);

        let id = "a3f2c9d1e4b5f6a7";
        let data = b"test blob data".to_vec();

        backend.put(id, &data).await.unwrap();

        let retrieved = backend.get(id).await.unwrap();
        assert_eq!(retrieved, Some(data));
    }

    #[tokio::test]
    async fn test_get_nonexistent_blob() {
        let dir = tempdir().unwrap();
        let backend = backend(&dir);

        let result = backend.get("nonexistent").await.unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_delete_blob() {
        let dir = tempdir().unwrap();
        let backend = backend(&dir);

        let id = "deadbeef01234567";
        backend.put(id, b"to be deleted").await.unwrap();
        assert!(backend.exists(id).await.unwrap());

        backend.delete(id).await.unwrap();
        assert!(!backend.exists(id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let backend = backend(&dir);

        let id = "deadbeef01234567";
        backend.put(id, b"x").await.unwrap();

        backend.delete(id).await.unwrap();
        // Second delete of the same id is still success
        backend.delete(id).await.unwrap();
    }

    #[tokio::test]
    async fn test_no_partial_blob_left_in_store() {
        let dir = tempdir().unwrap();
        let backend = backend(&dir);

        let id = "cafebabe89abcdef";
        backend.put(id, &vec![7u8; 300 * 1024]).await.unwrap();

        // Nothing remains in the staging directory once committed
        let mut entries = fs::read_dir(dir.path().join("tmp")).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_directory_sharding() {
        let dir = tempdir().unwrap();
        let backend = backend(&dir);

        let path = backend.blob_path("a3f2c9d1e4b5f6a7");
        assert!(path.to_string_lossy().contains("/a3/"));
    }
}
