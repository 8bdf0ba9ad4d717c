/// Application context and dependency injection
///
/// Every service is constructed here once and handed to handlers through
/// axum state; nothing reaches for globals.
use crate::{
    account::AccountManager,
    attachments::AttachmentResolver,
    blob_store::{BlobStorageConfig, BlobStore},
    config::{BlobstoreConfig, ServerConfig},
    content::ContentManagers,
    db,
    error::{CmsError, CmsResult},
    mailer::Mailer,
    rate_limit::RateLimiter,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub blob_store: Arc<BlobStore>,
    pub attachments: Arc<AttachmentResolver>,
    pub content: ContentManagers,
    pub account_manager: Arc<AccountManager>,
    pub mailer: Arc<Mailer>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> CmsResult<Self> {
        config.validate()?;

        Self::ensure_directories(&config).await?;

        let db = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;
        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        let BlobstoreConfig::Disk {
            location,
            tmp_location,
        } = &config.storage.blobstore;
        let blob_store = Arc::new(BlobStore::new(
            BlobStorageConfig {
                location: location.clone(),
                tmp_location: tmp_location.clone(),
                max_blob_size: config.upload.max_file_size,
            },
            db.clone(),
        ));

        let attachments = Arc::new(AttachmentResolver::new(
            blob_store.clone(),
            config.service.public_url.as_deref(),
        ));

        let content = ContentManagers::new(db.clone(), attachments.clone());

        let config = Arc::new(config);
        let account_manager = Arc::new(AccountManager::new(db.clone(), config.clone()));
        let mailer = Arc::new(Mailer::new(config.email.clone())?);
        let rate_limiter = Arc::new(RateLimiter::new(&config.rate_limit));

        Ok(Self {
            config,
            db,
            blob_store,
            attachments,
            content,
            account_manager,
            mailer,
            rate_limiter,
        })
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> CmsResult<()> {
        let BlobstoreConfig::Disk {
            location,
            tmp_location,
        } = &config.storage.blobstore;

        for dir in [&config.storage.data_directory, location, tmp_location] {
            if !dir.exists() {
                tokio::fs::create_dir_all(dir).await.map_err(|e| {
                    CmsError::Internal(format!("Failed to create directory {:?}: {}", dir, e))
                })?;
            }
        }

        Ok(())
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
