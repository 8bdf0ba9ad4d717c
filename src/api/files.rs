/// Blob serving endpoints
///
/// Streams stored attachment bytes with caching and Range support. Blobs
/// are immutable, so responses are cacheable forever and the blob id
/// doubles as the ETag.
use crate::{
    blob_store::{BlobInfoResponse, ALLOWED_CONTENT_TYPES},
    context::AppContext,
    error::{CmsError, CmsResult},
};
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use uuid::Uuid;

/// Build file routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/files/meta/:id", get(file_metadata))
        .route("/api/files/:id", get(get_file).delete(delete_file))
}

/// GET /api/files/meta/{id}
async fn file_metadata(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> CmsResult<Json<BlobInfoResponse>> {
    validate_blob_id(&id)?;

    let metadata = ctx
        .blob_store
        .metadata(&id)
        .await?
        .ok_or_else(|| CmsError::NotFound("File not found".to_string()))?;

    Ok(Json(metadata.into()))
}

/// GET /api/files/{id}
///
/// Serves blob content with Content-Type, Content-Disposition, caching
/// headers, and Range request support
async fn get_file(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> CmsResult<Response> {
    validate_blob_id(&id)?;

    let (data, metadata) = ctx
        .blob_store
        .get(&id)
        .await?
        .ok_or_else(|| CmsError::NotFound("File not found".to_string()))?;

    let total_size = data.len();

    // Blob ids are unique per content, so the id is a valid ETag
    let etag = format!("\"{}\"", id);

    if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH) {
        if if_none_match.to_str().ok() == Some(etag.as_str()) {
            return Ok(Response::builder()
                .status(StatusCode::NOT_MODIFIED)
                .header(header::ETAG, etag)
                .header(header::CACHE_CONTROL, "public, max-age=31536000, immutable")
                .body(axum::body::Body::empty())
                .unwrap());
        }
    }

    // Allow-listed types render in the browser; anything else downloads
    let disposition = if ALLOWED_CONTENT_TYPES.contains(&metadata.content_type.as_str()) {
        format!("inline; filename=\"{}\"", metadata.filename)
    } else {
        format!("attachment; filename=\"{}\"", metadata.filename)
    };

    if let Some(range_header) = headers.get(header::RANGE) {
        if let Ok(range_str) = range_header.to_str() {
            if let Some((start, end)) = parse_range(range_str, total_size) {
                let length = end - start + 1;
                let partial_data = data[start..=end].to_vec();

                return Ok(Response::builder()
                    .status(StatusCode::PARTIAL_CONTENT)
                    .header(header::CONTENT_TYPE, metadata.content_type.as_str())
                    .header(header::CONTENT_LENGTH, length.to_string())
                    .header(
                        header::CONTENT_RANGE,
                        format!("bytes {}-{}/{}", start, end, total_size),
                    )
                    .header(header::CONTENT_DISPOSITION, disposition.as_str())
                    .header(header::ETAG, etag)
                    .header(header::CACHE_CONTROL, "public, max-age=31536000, immutable")
                    .header(header::ACCEPT_RANGES, "bytes")
                    .body(axum::body::Body::from(partial_data))
                    .unwrap());
            }
        }
    }

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, metadata.content_type.as_str())
        .header(header::CONTENT_LENGTH, total_size.to_string())
        .header(header::CONTENT_DISPOSITION, disposition.as_str())
        .header(header::ETAG, etag)
        .header(header::CACHE_CONTROL, "public, max-age=31536000, immutable")
        .header(header::ACCEPT_RANGES, "bytes")
        .body(axum::body::Body::from(data))
        .unwrap())
}

/// DELETE /api/files/{id}
///
/// Idempotent: deleting an id that is already gone reports success
async fn delete_file(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> CmsResult<impl IntoResponse> {
    validate_blob_id(&id)?;

    ctx.blob_store.delete(&id).await?;

    Ok(Json(json!({ "message": "File deleted successfully" })))
}

fn validate_blob_id(id: &str) -> CmsResult<()> {
    Uuid::try_parse(id)
        .map(|_| ())
        .map_err(|_| CmsError::Validation(format!("Malformed file id: {}", id)))
}

/// Parse HTTP Range header
///
/// Returns (start, end) inclusive byte positions, or None if invalid
fn parse_range(range_header: &str, total_size: usize) -> Option<(usize, usize)> {
    let range_spec = range_header.trim().strip_prefix("bytes=")?;
    let dash_pos = range_spec.find('-')?;

    let start_str = &range_spec[..dash_pos];
    let end_str = &range_spec[dash_pos + 1..];

    if start_str.is_empty() {
        // Suffix range: "bytes=-500" (last 500 bytes)
        let suffix: usize = end_str.parse().ok()?;
        if suffix == 0 || total_size == 0 {
            return None;
        }
        let start = total_size.saturating_sub(suffix);
        Some((start, total_size - 1))
    } else if end_str.is_empty() {
        // Open-ended range: "bytes=500-" (from 500 to end)
        let start: usize = start_str.parse().ok()?;
        if start < total_size {
            Some((start, total_size - 1))
        } else {
            None
        }
    } else {
        // Complete range: "bytes=500-999", end clamped to the file
        let start: usize = start_str.parse().ok()?;
        let end: usize = end_str.parse().ok()?;
        if start >= total_size {
            return None;
        }
        let end = end.min(total_size - 1);
        if start <= end {
            Some((start, end))
        } else {
            None
        }
    }
}
