/// Content record lifecycle manager
///
/// One instance per content kind, all sharing the same contract:
/// validate, stage attachments, persist, and keep blob references
/// consistent across updates and deletes. Every path that rejects a
/// request after files were staged discards those blobs again, so a
/// failed create or update leaves nothing behind.
use crate::{
    attachments::AttachmentResolver,
    content::{
        is_valid_video_url, validate_category, ContentKind, ContentRecord, RecordInput,
        POST_PAGES,
    },
    error::{CmsError, CmsResult},
    ingress::StagedUploads,
};
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

/// Lifecycle manager for one content kind
#[derive(Clone)]
pub struct ContentManager {
    kind: ContentKind,
    db: SqlitePool,
    attachments: Arc<AttachmentResolver>,
}

/// The four managers, one per content kind
#[derive(Clone)]
pub struct ContentManagers {
    post: ContentManager,
    program: ContentManager,
    research: ContentManager,
    news_event: ContentManager,
}

impl ContentManagers {
    pub fn new(db: SqlitePool, attachments: Arc<AttachmentResolver>) -> Self {
        let make = |kind| ContentManager {
            kind,
            db: db.clone(),
            attachments: attachments.clone(),
        };
        Self {
            post: make(ContentKind::Post),
            program: make(ContentKind::Program),
            research: make(ContentKind::Research),
            news_event: make(ContentKind::NewsEvent),
        }
    }

    pub fn for_kind(&self, kind: ContentKind) -> &ContentManager {
        match kind {
            ContentKind::Post => &self.post,
            ContentKind::Program => &self.program,
            ContentKind::Research => &self.research,
            ContentKind::NewsEvent => &self.news_event,
        }
    }
}

impl ContentManager {
    /// Create a record from validated input and staged uploads
    ///
    /// Any rejection discards the staged blobs before returning, so a
    /// failed create persists nothing. A repeated create carrying the
    /// same idempotency key returns the already-persisted record.
    pub async fn create(
        &self,
        input: RecordInput,
        staged: StagedUploads,
        idempotency_key: Option<String>,
    ) -> CmsResult<ContentRecord> {
        if let Some(key) = idempotency_key.as_deref() {
            if let Some(existing) = self.find_by_idempotency_key(key).await? {
                tracing::info!(
                    "create replay for idempotency key {}, returning record {}",
                    key,
                    existing.id
                );
                self.attachments.discard(&staged).await;
                return Ok(existing);
            }
        }

        match self
            .try_create(&input, &staged, idempotency_key.as_deref())
            .await
        {
            Ok(record) => Ok(record),
            // Lost a race on the idempotency key: someone else persisted
            // this create first; hand back their record
            Err(CmsError::Database(sqlx::Error::Database(db_err)))
                if db_err.is_unique_violation() && idempotency_key.is_some() =>
            {
                self.attachments.discard(&staged).await;
                let key = idempotency_key.as_deref().unwrap_or_default();
                self.find_by_idempotency_key(key)
                    .await?
                    .ok_or_else(|| CmsError::Internal("Idempotent create vanished".to_string()))
            }
            Err(e) => {
                self.attachments.discard(&staged).await;
                Err(e)
            }
        }
    }

    async fn try_create(
        &self,
        input: &RecordInput,
        staged: &StagedUploads,
        idempotency_key: Option<&str>,
    ) -> CmsResult<ContentRecord> {
        let title = require_text(input.title.as_deref(), "title")?;
        let title_ar = require_text(input.title_ar.as_deref(), "title_ar")?;
        let body = require_text(input.body.as_deref(), self.kind.body_field())?;
        let body_ar = require_text(
            input.body_ar.as_deref(),
            &format!("{}_ar", self.kind.body_field()),
        )?;

        let page = if self.kind.requires_page() {
            input.page.clone()
        } else {
            None
        };
        let section = require_text(input.section.as_deref(), "section")?;
        validate_category(self.kind, page.as_deref(), &section)?;

        let video_url = normalize_video(input.video_url.as_deref())?;

        // The record must be renderable: an image or a video, always
        if staged.image.is_none() && video_url.is_none() {
            return Err(CmsError::Validation(
                "Please provide either an image or a video".to_string(),
            ));
        }

        let now = Utc::now();
        let record = ContentRecord {
            id: Uuid::new_v4().simple().to_string(),
            kind: self.kind,
            title,
            title_ar,
            body,
            body_ar,
            page,
            section,
            image_id: staged.image.as_ref().map(|b| b.id.clone()),
            pdf_id: staged.pdf.as_ref().map(|b| b.id.clone()),
            video_url,
            is_featured: input.is_featured.unwrap_or(false),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO content_record
                (id, kind, title, title_ar, body, body_ar, page, section,
                 image_id, pdf_id, video_url, is_featured, idempotency_key,
                 created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
        )
        .bind(&record.id)
        .bind(record.kind.as_str())
        .bind(&record.title)
        .bind(&record.title_ar)
        .bind(&record.body)
        .bind(&record.body_ar)
        .bind(&record.page)
        .bind(&record.section)
        .bind(&record.image_id)
        .bind(&record.pdf_id)
        .bind(&record.video_url)
        .bind(record.is_featured)
        .bind(idempotency_key)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.db)
        .await
        .map_err(CmsError::Database)?;

        tracing::info!("created {} record {}", self.kind.as_str(), record.id);

        Ok(record)
    }

    /// Apply a partial update
    ///
    /// Omitted fields keep their previous value; `is_featured` and the
    /// video URL distinguish "explicitly set" from "omitted". Superseded
    /// blobs are deleted only after the updated record is written.
    pub async fn update(
        &self,
        id: &str,
        input: RecordInput,
        staged: StagedUploads,
    ) -> CmsResult<ContentRecord> {
        match self.try_update(id, &input, &staged).await {
            Ok((record, old_image, old_pdf)) => {
                // The new references are durable; dropping the old blobs
                // is now safe in either crash order
                if staged.image.is_some() {
                    self.attachments
                        .replace(old_image.as_deref(), record.image_id.as_deref())
                        .await;
                }
                if staged.pdf.is_some() {
                    self.attachments
                        .replace(old_pdf.as_deref(), record.pdf_id.as_deref())
                        .await;
                }
                Ok(record)
            }
            Err(e) => {
                self.attachments.discard(&staged).await;
                Err(e)
            }
        }
    }

    async fn try_update(
        &self,
        id: &str,
        input: &RecordInput,
        staged: &StagedUploads,
    ) -> CmsResult<(ContentRecord, Option<String>, Option<String>)> {
        let existing = self
            .fetch(id)
            .await?
            .ok_or_else(|| CmsError::NotFound(format!("{} not found", self.kind.as_str())))?;

        let old_image = existing.image_id.clone();
        let old_pdf = existing.pdf_id.clone();

        let mut merged = existing;
        merge_text(&mut merged.title, input.title.as_deref());
        merge_text(&mut merged.title_ar, input.title_ar.as_deref());
        merge_text(&mut merged.body, input.body.as_deref());
        merge_text(&mut merged.body_ar, input.body_ar.as_deref());

        if self.kind.requires_page() {
            if let Some(page) = input.page.as_deref().filter(|p| !p.trim().is_empty()) {
                merged.page = Some(page.to_string());
            }
        }
        if let Some(section) = input.section.as_deref().filter(|s| !s.trim().is_empty()) {
            merged.section = section.to_string();
        }
        validate_category(self.kind, merged.page.as_deref(), &merged.section)?;

        // Explicit empty string clears the video; omission keeps it
        if let Some(video) = input.video_url.as_deref() {
            merged.video_url = normalize_video(Some(video))?;
        }
        if let Some(flag) = input.is_featured {
            merged.is_featured = flag;
        }

        if let Some(image) = &staged.image {
            merged.image_id = Some(image.id.clone());
        }
        if let Some(pdf) = &staged.pdf {
            merged.pdf_id = Some(pdf.id.clone());
        }

        // Invariant holds on the merged state, old values included
        if merged.image_id.is_none() && merged.video_url.is_none() {
            return Err(CmsError::Validation(
                "Please provide either an image or a video".to_string(),
            ));
        }

        merged.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE content_record
            SET title = ?1, title_ar = ?2, body = ?3, body_ar = ?4,
                page = ?5, section = ?6, image_id = ?7, pdf_id = ?8,
                video_url = ?9, is_featured = ?10, updated_at = ?11
            WHERE id = ?12 AND kind = ?13
            "#,
        )
        .bind(&merged.title)
        .bind(&merged.title_ar)
        .bind(&merged.body)
        .bind(&merged.body_ar)
        .bind(&merged.page)
        .bind(&merged.section)
        .bind(&merged.image_id)
        .bind(&merged.pdf_id)
        .bind(&merged.video_url)
        .bind(merged.is_featured)
        .bind(merged.updated_at)
        .bind(id)
        .bind(self.kind.as_str())
        .execute(&self.db)
        .await
        .map_err(CmsError::Database)?;

        tracing::info!("updated {} record {}", self.kind.as_str(), id);

        Ok((merged, old_image, old_pdf))
    }

    /// Delete a record and cascade to its attachments
    pub async fn delete(&self, id: &str) -> CmsResult<()> {
        let record = self
            .fetch(id)
            .await?
            .ok_or_else(|| CmsError::NotFound(format!("{} not found", self.kind.as_str())))?;

        sqlx::query("DELETE FROM content_record WHERE id = ?1 AND kind = ?2")
            .bind(id)
            .bind(self.kind.as_str())
            .execute(&self.db)
            .await
            .map_err(CmsError::Database)?;

        // Record is gone; the blobs follow. Failures here surface in the
        // logs and the sweep, not to the client.
        self.attachments.cascade_delete(&record).await;

        tracing::info!("deleted {} record {}", self.kind.as_str(), id);

        Ok(())
    }

    /// List records, optionally filtered, newest first
    ///
    /// Filter values are validated against the category table; an unknown
    /// page or section is a client error, not an empty result.
    pub async fn list(
        &self,
        page: Option<&str>,
        section: Option<&str>,
    ) -> CmsResult<Vec<ContentRecord>> {
        self.validate_filters(page, section)?;

        let page = if self.kind.requires_page() { page } else { None };

        let rows = sqlx::query(
            r#"
            SELECT id, kind, title, title_ar, body, body_ar, page, section,
                   image_id, pdf_id, video_url, is_featured, created_at, updated_at
            FROM content_record
            WHERE kind = ?1
              AND (?2 IS NULL OR page = ?2)
              AND (?3 IS NULL OR section = ?3)
            ORDER BY created_at DESC
            "#,
        )
        .bind(self.kind.as_str())
        .bind(page)
        .bind(section)
        .fetch_all(&self.db)
        .await
        .map_err(CmsError::Database)?;

        rows.iter().map(row_to_record).collect()
    }

    fn validate_filters(&self, page: Option<&str>, section: Option<&str>) -> CmsResult<()> {
        match (self.kind.requires_page(), page, section) {
            (true, Some(page), Some(section)) => validate_category(self.kind, Some(page), section),
            (true, Some(page), None) => {
                if POST_PAGES.contains(&page) {
                    Ok(())
                } else {
                    Err(CmsError::Validation(format!("Invalid page: {}", page)))
                }
            }
            (true, None, Some(section)) => {
                // Section alone must at least exist under some page
                let known = POST_PAGES.iter().any(|p| {
                    self.kind
                        .allowed_sections(Some(p))
                        .is_some_and(|sections| sections.contains(&section))
                });
                if known {
                    Ok(())
                } else {
                    Err(CmsError::Validation(format!("Invalid section: {}", section)))
                }
            }
            (false, _, Some(section)) => validate_category(self.kind, None, section),
            _ => Ok(()),
        }
    }

    async fn fetch(&self, id: &str) -> CmsResult<Option<ContentRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, kind, title, title_ar, body, body_ar, page, section,
                   image_id, pdf_id, video_url, is_featured, created_at, updated_at
            FROM content_record
            WHERE id = ?1 AND kind = ?2
            "#,
        )
        .bind(id)
        .bind(self.kind.as_str())
        .fetch_optional(&self.db)
        .await
        .map_err(CmsError::Database)?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn find_by_idempotency_key(&self, key: &str) -> CmsResult<Option<ContentRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, kind, title, title_ar, body, body_ar, page, section,
                   image_id, pdf_id, video_url, is_featured, created_at, updated_at
            FROM content_record
            WHERE kind = ?1 AND idempotency_key = ?2
            "#,
        )
        .bind(self.kind.as_str())
        .bind(key)
        .fetch_optional(&self.db)
        .await
        .map_err(CmsError::Database)?;

        row.as_ref().map(row_to_record).transpose()
    }
}

fn row_to_record(row: &SqliteRow) -> CmsResult<ContentRecord> {
    let kind_str: String = row.try_get("kind")?;
    let kind = ContentKind::from_str(&kind_str)
        .ok_or_else(|| CmsError::Internal(format!("Unknown content kind in store: {}", kind_str)))?;

    Ok(ContentRecord {
        id: row.try_get("id")?,
        kind,
        title: row.try_get("title")?,
        title_ar: row.try_get("title_ar")?,
        body: row.try_get("body")?,
        body_ar: row.try_get("body_ar")?,
        page: row.try_get("page")?,
        section: row.try_get("section")?,
        image_id: row.try_get("image_id")?,
        pdf_id: row.try_get("pdf_id")?,
        video_url: row.try_get("video_url")?,
        is_featured: row.try_get("is_featured")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn require_text(value: Option<&str>, field: &str) -> CmsResult<String> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => Ok(v.to_string()),
        None => Err(CmsError::Validation(format!("{} is required", field))),
    }
}

fn merge_text(slot: &mut String, incoming: Option<&str>) {
    if let Some(value) = incoming.map(str::trim).filter(|v| !v.is_empty()) {
        *slot = value.to_string();
    }
}

fn normalize_video(value: Option<&str>) -> CmsResult<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(url) => {
            if is_valid_video_url(url) {
                Ok(Some(url.to_string()))
            } else {
                Err(CmsError::Validation(
                    "Please provide a valid YouTube URL".to_string(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob_store::{BlobStorageConfig, BlobStore};
    use tempfile::tempdir;

    struct TestEnv {
        managers: ContentManagers,
        store: Arc<BlobStore>,
        _dir: tempfile::TempDir,
    }

    async fn create_test_env() -> TestEnv {
        let dir = tempdir().unwrap();
        let db = SqlitePool::connect(":memory:").await.unwrap();

        sqlx::query(
            r#"
            CREATE TABLE blob (
                id TEXT PRIMARY KEY,
                filename TEXT NOT NULL,
                content_type TEXT NOT NULL,
                size INTEGER NOT NULL,
                created_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(&db)
        .await
        .unwrap();

        sqlx::query(
            r#"
            CREATE TABLE content_record (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                title TEXT NOT NULL,
                title_ar TEXT NOT NULL,
                body TEXT NOT NULL,
                body_ar TEXT NOT NULL,
                page TEXT,
                section TEXT NOT NULL,
                image_id TEXT,
                pdf_id TEXT,
                video_url TEXT,
                is_featured BOOLEAN NOT NULL DEFAULT FALSE,
                idempotency_key TEXT,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(&db)
        .await
        .unwrap();

        sqlx::query(
            "CREATE UNIQUE INDEX idx_content_idempotency ON content_record (kind, idempotency_key) WHERE idempotency_key IS NOT NULL",
        )
        .execute(&db)
        .await
        .unwrap();

        let store = Arc::new(BlobStore::new(
            BlobStorageConfig {
                location: dir.path().join("blobs"),
                tmp_location: dir.path().join("tmp"),
                max_blob_size: 1024 * 1024,
            },
            db.clone(),
        ));
        let attachments = Arc::new(crate::attachments::AttachmentResolver::new(
            store.clone(),
            None,
        ));

        TestEnv {
            managers: ContentManagers::new(db, attachments),
            store,
            _dir: dir,
        }
    }

    fn post_input() -> RecordInput {
        RecordInput {
            title: Some("T".to_string()),
            title_ar: Some("ت".to_string()),
            body: Some("C".to_string()),
            body_ar: Some("م".to_string()),
            page: Some("news".to_string()),
            section: Some("events".to_string()),
            video_url: Some("https://youtube.com/x".to_string()),
            is_featured: None,
        }
    }

    async fn staged_image(env: &TestEnv) -> StagedUploads {
        StagedUploads {
            image: Some(
                env.store
                    .put(b"img".to_vec(), "img.png", "image/png")
                    .await
                    .unwrap(),
            ),
            pdf: None,
        }
    }

    #[tokio::test]
    async fn test_create_with_video_only() {
        let env = create_test_env().await;
        let manager = env.managers.for_kind(ContentKind::Post);

        let record = manager
            .create(post_input(), StagedUploads::default(), None)
            .await
            .unwrap();

        assert_eq!(record.title, "T");
        assert!(record.image_id.is_none());
        assert_eq!(record.video_url.as_deref(), Some("https://youtube.com/x"));
    }

    #[tokio::test]
    async fn test_create_without_image_or_video_rejected() {
        let env = create_test_env().await;
        let manager = env.managers.for_kind(ContentKind::Post);

        let mut input = post_input();
        input.video_url = None;

        let result = manager
            .create(input, StagedUploads::default(), None)
            .await;
        assert!(matches!(result, Err(CmsError::Validation(_))));
    }

    #[tokio::test]
    async fn test_rejected_create_rolls_back_staged_blobs() {
        let env = create_test_env().await;
        let manager = env.managers.for_kind(ContentKind::Post);

        let staged = staged_image(&env).await;
        let blob_id = staged.image.as_ref().unwrap().id.clone();

        // Missing required title: the create must fail and the staged
        // image must be gone afterwards
        let mut input = post_input();
        input.title = None;

        let result = manager.create(input, staged, None).await;
        assert!(matches!(result, Err(CmsError::Validation(_))));
        assert!(env.store.get(&blob_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_with_unknown_section_rejected() {
        let env = create_test_env().await;
        let manager = env.managers.for_kind(ContentKind::NewsEvent);

        let mut input = post_input();
        input.page = None;
        input.section = Some("sports".to_string());

        let result = manager.create(input, StagedUploads::default(), None).await;
        assert!(matches!(result, Err(CmsError::Validation(_))));
    }

    #[tokio::test]
    async fn test_idempotent_create_returns_existing_record() {
        let env = create_test_env().await;
        let manager = env.managers.for_kind(ContentKind::Post);

        let first = manager
            .create(post_input(), StagedUploads::default(), Some("key-1".to_string()))
            .await
            .unwrap();

        // Retry with the same key and freshly staged blobs: same record
        // back, the redundant blobs discarded
        let staged = staged_image(&env).await;
        let redundant = staged.image.as_ref().unwrap().id.clone();

        let second = manager
            .create(post_input(), staged, Some("key-1".to_string()))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert!(env.store.get(&redundant).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_partial_update_keeps_untouched_fields() {
        let env = create_test_env().await;
        let manager = env.managers.for_kind(ContentKind::Post);

        let staged = staged_image(&env).await;
        let image_id = staged.image.as_ref().unwrap().id.clone();
        let mut input = post_input();
        input.video_url = None;
        let record = manager.create(input, staged, None).await.unwrap();

        let patch = RecordInput {
            title: Some("New".to_string()),
            ..Default::default()
        };
        let updated = manager
            .update(&record.id, patch, StagedUploads::default())
            .await
            .unwrap();

        assert_eq!(updated.title, "New");
        assert_eq!(updated.body, "C");
        assert_eq!(updated.image_id.as_deref(), Some(image_id.as_str()));
        assert!(env.store.get(&image_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_replacing_image_deletes_old_blob() {
        let env = create_test_env().await;
        let manager = env.managers.for_kind(ContentKind::Post);

        let staged = staged_image(&env).await;
        let old_image = staged.image.as_ref().unwrap().id.clone();
        let mut input = post_input();
        input.video_url = None;
        let record = manager.create(input, staged, None).await.unwrap();

        let replacement = staged_image(&env).await;
        let new_image = replacement.image.as_ref().unwrap().id.clone();

        let updated = manager
            .update(&record.id, RecordInput::default(), replacement)
            .await
            .unwrap();

        assert_eq!(updated.image_id.as_deref(), Some(new_image.as_str()));
        assert!(env.store.get(&old_image).await.unwrap().is_none());
        assert!(env.store.get(&new_image).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_failed_update_leaves_old_blob_intact() {
        let env = create_test_env().await;
        let manager = env.managers.for_kind(ContentKind::Post);

        let staged = staged_image(&env).await;
        let old_image = staged.image.as_ref().unwrap().id.clone();
        let mut input = post_input();
        input.video_url = None;
        let record = manager.create(input, staged, None).await.unwrap();

        // Invalid section: the record write never happens, so the old
        // blob must survive and the staged replacement must be discarded
        let replacement = staged_image(&env).await;
        let new_image = replacement.image.as_ref().unwrap().id.clone();
        let patch = RecordInput {
            section: Some("bogus".to_string()),
            ..Default::default()
        };

        let result = manager.update(&record.id, patch, replacement).await;
        assert!(matches!(result, Err(CmsError::Validation(_))));
        assert!(env.store.get(&old_image).await.unwrap().is_some());
        assert!(env.store.get(&new_image).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_unknown_id_discards_staged_and_404s() {
        let env = create_test_env().await;
        let manager = env.managers.for_kind(ContentKind::Post);

        let staged = staged_image(&env).await;
        let blob_id = staged.image.as_ref().unwrap().id.clone();

        let result = manager
            .update("ffffffffffffffffffffffffffffffff", RecordInput::default(), staged)
            .await;

        assert!(matches!(result, Err(CmsError::NotFound(_))));
        assert!(env.store.get(&blob_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_explicit_false_is_applied() {
        let env = create_test_env().await;
        let manager = env.managers.for_kind(ContentKind::Post);

        let mut input = post_input();
        input.is_featured = Some(true);
        let record = manager
            .create(input, StagedUploads::default(), None)
            .await
            .unwrap();
        assert!(record.is_featured);

        // Omitted flag keeps the previous value
        let kept = manager
            .update(&record.id, RecordInput::default(), StagedUploads::default())
            .await
            .unwrap();
        assert!(kept.is_featured);

        // Explicit false flips it
        let patch = RecordInput {
            is_featured: Some(false),
            ..Default::default()
        };
        let updated = manager
            .update(&record.id, patch, StagedUploads::default())
            .await
            .unwrap();
        assert!(!updated.is_featured);
    }

    #[tokio::test]
    async fn test_delete_cascades_to_both_blobs() {
        let env = create_test_env().await;
        let manager = env.managers.for_kind(ContentKind::Research);

        let staged = StagedUploads {
            image: Some(
                env.store
                    .put(b"img".to_vec(), "img.png", "image/png")
                    .await
                    .unwrap(),
            ),
            pdf: Some(
                env.store
                    .put(b"%PDF".to_vec(), "paper.pdf", "application/pdf")
                    .await
                    .unwrap(),
            ),
        };
        let image_id = staged.image.as_ref().unwrap().id.clone();
        let pdf_id = staged.pdf.as_ref().unwrap().id.clone();

        let input = RecordInput {
            title: Some("Paper".to_string()),
            title_ar: Some("ورقة".to_string()),
            body: Some("Abstract".to_string()),
            body_ar: Some("ملخص".to_string()),
            page: None,
            section: Some("latest-publications".to_string()),
            video_url: None,
            is_featured: None,
        };
        let record = manager.create(input, staged, None).await.unwrap();

        manager.delete(&record.id).await.unwrap();

        assert!(env.store.get(&image_id).await.unwrap().is_none());
        assert!(env.store.get(&pdf_id).await.unwrap().is_none());
        assert!(matches!(
            manager.delete(&record.id).await,
            Err(CmsError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_filters_and_sorts_newest_first() {
        let env = create_test_env().await;
        let manager = env.managers.for_kind(ContentKind::Post);

        let mut first = post_input();
        first.title = Some("older".to_string());
        manager
            .create(first, StagedUploads::default(), None)
            .await
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let mut second = post_input();
        second.title = Some("newer".to_string());
        manager
            .create(second, StagedUploads::default(), None)
            .await
            .unwrap();

        let listed = manager.list(Some("news"), Some("events")).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].title, "newer");
        assert_eq!(listed[1].title, "older");

        assert!(manager.list(Some("sports"), None).await.is_err());
        assert!(manager.list(Some("news"), Some("bogus")).await.is_err());
    }
}
