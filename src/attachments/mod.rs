/// Attachment resolution and cleanup coordination
///
/// Translates between stored blob ids and externally addressable URLs,
/// and sequences replace/delete so a record is never left pointing at a
/// missing blob. The ordering rule throughout: the record write commits
/// first, blob deletion happens after. A crash in between leaves a
/// harmless orphan for the sweep; the reverse order would leave a broken
/// reference.
use crate::{
    blob_store::BlobStore,
    content::ContentRecord,
    ingress::StagedUploads,
};
use std::sync::Arc;

/// Path under which the files API serves blobs
pub const FILES_BASE_PATH: &str = "/api/files";

#[derive(Clone)]
pub struct AttachmentResolver {
    store: Arc<BlobStore>,
    base_url: String,
}

impl AttachmentResolver {
    pub fn new(store: Arc<BlobStore>, public_url: Option<&str>) -> Self {
        let base_url = match public_url {
            Some(url) => format!("{}{}", url.trim_end_matches('/'), FILES_BASE_PATH),
            None => FILES_BASE_PATH.to_string(),
        };
        Self { store, base_url }
    }

    /// Derive the retrieval URL for a blob reference. Never persisted,
    /// always computed per response.
    pub fn resolve_url(&self, blob_id: Option<&str>) -> Option<String> {
        blob_id.map(|id| format!("{}/{}", self.base_url, id))
    }

    /// Delete a superseded blob after its replacement reference has been
    /// durably persisted by the caller
    ///
    /// Must only be invoked once the record write is acknowledged. A
    /// failed delete is logged and left to the orphan sweep; the record
    /// itself is already consistent.
    pub async fn replace(&self, old_blob_id: Option<&str>, new_blob_id: Option<&str>) {
        let Some(old) = old_blob_id else { return };

        // Same id on both sides means the slot did not change
        if new_blob_id == Some(old) {
            return;
        }

        if let Err(e) = self.store.delete(old).await {
            tracing::warn!("failed to delete superseded blob {}: {}", old, e);
        } else {
            tracing::info!("deleted superseded blob {}", old);
        }
    }

    /// Delete both attachments of a removed record
    ///
    /// Slots are independent: failing to delete one does not block the
    /// other, and neither failure fails the record delete. The store
    /// treats missing blobs as success, so errors here mean the storage
    /// is unreachable and belong in front of an operator.
    pub async fn cascade_delete(&self, record: &ContentRecord) {
        for blob_id in [record.image_id.as_deref(), record.pdf_id.as_deref()]
            .into_iter()
            .flatten()
        {
            if let Err(e) = self.store.delete(blob_id).await {
                tracing::warn!("cascade delete of blob {} failed: {}", blob_id, e);
            }
        }
    }

    /// Roll back blobs staged for a request that did not end in a
    /// persisted record
    pub async fn discard(&self, staged: &StagedUploads) {
        for blob in [staged.image.as_ref(), staged.pdf.as_ref()]
            .into_iter()
            .flatten()
        {
            if let Err(e) = self.store.delete(&blob.id).await {
                tracing::warn!("failed to discard staged blob {}: {}", blob.id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob_store::BlobStorageConfig;
    use sqlx::SqlitePool;
    use tempfile::tempdir;

    async fn resolver() -> (AttachmentResolver, Arc<BlobStore>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = SqlitePool::connect(":memory:").await.unwrap();
        sqlx::query(
            "CREATE TABLE blob (id TEXT PRIMARY KEY, filename TEXT NOT NULL, \
             content_type TEXT NOT NULL, size INTEGER NOT NULL, created_at DATETIME NOT NULL)",
        )
        .execute(&db)
        .await
        .unwrap();

        let store = Arc::new(BlobStore::new(
            BlobStorageConfig {
                location: dir.path().join("blobs"),
                tmp_location: dir.path().join("tmp"),
                max_blob_size: 1024,
            },
            db,
        ));
        (AttachmentResolver::new(store.clone(), None), store, dir)
    }

    #[tokio::test]
    async fn test_resolve_url() {
        let (resolver, _store, _dir) = resolver().await;

        assert_eq!(resolver.resolve_url(None), None);
        assert_eq!(
            resolver.resolve_url(Some("abc123")),
            Some("/api/files/abc123".to_string())
        );
    }

    #[tokio::test]
    async fn test_resolve_url_with_public_base() {
        let (_, store, _dir) = resolver().await;
        let resolver = AttachmentResolver::new(store, Some("https://cms.example.edu/"));

        assert_eq!(
            resolver.resolve_url(Some("abc123")),
            Some("https://cms.example.edu/api/files/abc123".to_string())
        );
    }

    #[tokio::test]
    async fn test_replace_deletes_old_blob() {
        let (resolver, store, _dir) = resolver().await;

        let old = store.put(b"old".to_vec(), "old.png", "image/png").await.unwrap();
        let new = store.put(b"new".to_vec(), "new.png", "image/png").await.unwrap();

        resolver.replace(Some(&old.id), Some(&new.id)).await;

        assert!(store.get(&old.id).await.unwrap().is_none());
        assert!(store.get(&new.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_replace_keeps_unchanged_slot() {
        let (resolver, store, _dir) = resolver().await;

        let blob = store.put(b"same".to_vec(), "same.png", "image/png").await.unwrap();

        resolver.replace(Some(&blob.id), Some(&blob.id)).await;

        assert!(store.get(&blob.id).await.unwrap().is_some());
    }
}
