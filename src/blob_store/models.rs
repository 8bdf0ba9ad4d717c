/// Blob storage data models
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Blob metadata stored in the database
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobMetadata {
    pub id: String,
    pub filename: String,
    pub content_type: String,
    pub size: i64,
    pub created_at: DateTime<Utc>,
}

/// Response shape for the file metadata endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobInfoResponse {
    pub id: String,
    pub filename: String,
    pub content_type: String,
    pub size: i64,
    pub upload_date: DateTime<Utc>,
}

impl From<BlobMetadata> for BlobInfoResponse {
    fn from(meta: BlobMetadata) -> Self {
        Self {
            id: meta.id,
            filename: meta.filename,
            content_type: meta.content_type,
            size: meta.size,
            upload_date: meta.created_at,
        }
    }
}
