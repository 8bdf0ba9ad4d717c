/// Blob store manager
///
/// Coordinates the storage backend with database metadata tracking. Blob
/// ids are random, generated at upload time; blobs are immutable once
/// written, so replacing an attachment always means a new id.
use crate::{
    blob_store::{
        disk::DiskBlobBackend, BlobBackend, BlobMetadata, BlobStorageConfig,
        ALLOWED_CONTENT_TYPES,
    },
    error::{CmsError, CmsResult},
};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

/// Main blob store manager
#[derive(Clone)]
pub struct BlobStore {
    config: BlobStorageConfig,
    backend: Arc<dyn BlobBackend>,
    db: SqlitePool,
}

impl BlobStore {
    /// Create a new blob store with a disk backend
    pub fn new(config: BlobStorageConfig, db: SqlitePool) -> Self {
        let backend = Arc::new(DiskBlobBackend::new(
            config.location.clone(),
            config.tmp_location.clone(),
        ));
        Self {
            config,
            backend,
            db,
        }
    }

    /// Store a blob and return its metadata
    ///
    /// Validates the content type against the allow-list and the size
    /// against the configured limit before any bytes hit the backend.
    pub async fn put(
        &self,
        data: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> CmsResult<BlobMetadata> {
        self.validate_content_type(content_type)?;

        let size = data.len();
        if size > self.config.max_blob_size {
            return Err(CmsError::TooLarge(format!(
                "{} bytes exceeds the {} byte limit",
                size, self.config.max_blob_size
            )));
        }

        let id = Uuid::new_v4().simple().to_string();
        let filename = sanitize_filename(filename);
        let now = Utc::now();

        self.backend.put(&id, &data).await?;

        // Metadata row makes the blob visible; roll back the bytes if the
        // insert fails so no orphan file lingers
        if let Err(e) = self
            .insert_metadata(&id, &filename, content_type, size as i64, now)
            .await
        {
            if let Err(del_err) = self.backend.delete(&id).await {
                tracing::warn!("failed to roll back blob {} after metadata error: {}", id, del_err);
            }
            return Err(e);
        }

        tracing::info!("stored blob {} ({}, {} bytes)", id, content_type, size);

        Ok(BlobMetadata {
            id,
            filename,
            content_type: content_type.to_string(),
            size: size as i64,
            created_at: now,
        })
    }

    /// Get blob bytes and metadata by id
    pub async fn get(&self, id: &str) -> CmsResult<Option<(Vec<u8>, BlobMetadata)>> {
        let Some(metadata) = self.metadata(id).await? else {
            return Ok(None);
        };

        match self.backend.get(id).await? {
            Some(data) => Ok(Some((data, metadata))),
            None => {
                // Row without bytes: a half-deleted blob. Report absent;
                // the orphan sweep removes the stale row.
                tracing::warn!("blob {} has metadata but no bytes", id);
                Ok(None)
            }
        }
    }

    /// Get blob metadata by id
    pub async fn metadata(&self, id: &str) -> CmsResult<Option<BlobMetadata>> {
        let row = sqlx::query(
            "SELECT id, filename, content_type, size, created_at FROM blob WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(CmsError::Database)?;

        match row {
            Some(row) => Ok(Some(BlobMetadata {
                id: row.try_get("id")?,
                filename: row.try_get("filename")?,
                content_type: row.try_get("content_type")?,
                size: row.try_get("size")?,
                created_at: row.try_get("created_at")?,
            })),
            None => Ok(None),
        }
    }

    /// Delete a blob, bytes and metadata
    ///
    /// Idempotent: deleting an id that does not exist is success, which
    /// keeps cleanup paths safe to retry.
    pub async fn delete(&self, id: &str) -> CmsResult<()> {
        self.backend.delete(id).await?;

        sqlx::query("DELETE FROM blob WHERE id = ?1")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(CmsError::Database)?;

        Ok(())
    }

    /// List blob ids created before `cutoff` that no content record
    /// references, for the out-of-band orphan sweep
    pub async fn list_unreferenced(&self, cutoff: DateTime<Utc>) -> CmsResult<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT id FROM blob
            WHERE created_at < ?1
              AND id NOT IN (
                SELECT image_id FROM content_record WHERE image_id IS NOT NULL
                UNION
                SELECT pdf_id FROM content_record WHERE pdf_id IS NOT NULL
              )
            ORDER BY created_at ASC
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.db)
        .await
        .map_err(CmsError::Database)?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row.try_get("id")?);
        }

        Ok(ids)
    }

    /// Validate content type against the allow-list
    fn validate_content_type(&self, content_type: &str) -> CmsResult<()> {
        if ALLOWED_CONTENT_TYPES.contains(&content_type) {
            Ok(())
        } else {
            Err(CmsError::InvalidFileType(format!(
                "Unsupported content type: {}",
                content_type
            )))
        }
    }

    async fn insert_metadata(
        &self,
        id: &str,
        filename: &str,
        content_type: &str,
        size: i64,
        created_at: DateTime<Utc>,
    ) -> CmsResult<()> {
        sqlx::query(
            r#"
            INSERT INTO blob (id, filename, content_type, size, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(id)
        .bind(filename)
        .bind(content_type)
        .bind(size)
        .bind(created_at)
        .execute(&self.db)
        .await
        .map_err(CmsError::Database)?;

        Ok(())
    }
}

/// Strip path components and control characters from a client-supplied
/// filename, keeping only the final segment
pub fn sanitize_filename(name: &str) -> String {
    let stem = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name)
        .chars()
        .filter(|c| !c.is_control() && *c != '"')
        .collect::<String>();

    if stem.is_empty() {
        "file".to_string()
    } else {
        stem
    }
}
