/// Content record endpoints
///
/// The four resources share one handler set; the kind travels as a router
/// extension. Create and update take multipart bodies with up to one file
/// per slot; list returns records decorated with derived attachment URLs.
use crate::{
    content::{ContentKind, ContentRecord, RecordInput, RecordView},
    context::AppContext,
    error::{CmsError, CmsResult},
    ingress::{self, UploadForm},
};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

/// Build content routes for all four resources
pub fn routes() -> Router<AppContext> {
    Router::new()
        .nest("/api/posts", resource_routes(ContentKind::Post))
        .nest("/api/programs", resource_routes(ContentKind::Program))
        .nest("/api/research", resource_routes(ContentKind::Research))
        .nest("/api/news-events", resource_routes(ContentKind::NewsEvent))
}

fn resource_routes(kind: ContentKind) -> Router<AppContext> {
    Router::new()
        .route("/", get(list_records).post(create_record))
        .route("/:id", axum::routing::put(update_record).delete(delete_record))
        .route_layer(Extension(kind))
}

/// Flat equality filters for listing
#[derive(Debug, Deserialize)]
struct ListQuery {
    page: Option<String>,
    section: Option<String>,
}

/// GET /api/{resource}?page=&section=
async fn list_records(
    State(ctx): State<AppContext>,
    Extension(kind): Extension<ContentKind>,
    Query(query): Query<ListQuery>,
) -> CmsResult<Json<Vec<RecordView>>> {
    let records = ctx
        .content
        .for_kind(kind)
        .list(query.page.as_deref(), query.section.as_deref())
        .await?;

    let views = records
        .into_iter()
        .map(|record| decorate(&ctx, record))
        .collect();

    Ok(Json(views))
}

/// POST /api/{resource}
async fn create_record(
    State(ctx): State<AppContext>,
    Extension(kind): Extension<ContentKind>,
    headers: HeaderMap,
    multipart: Multipart,
) -> CmsResult<impl IntoResponse> {
    let form = ingress::read_multipart(multipart, ctx.config.upload.max_file_size).await?;
    let input = record_input(kind, &form)?;
    let idempotency_key = headers
        .get("idempotency-key")
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let staged = form.stage(&ctx.blob_store).await?;
    let record = ctx
        .content
        .for_kind(kind)
        .create(input, staged, idempotency_key)
        .await?;

    Ok((StatusCode::CREATED, Json(decorate(&ctx, record))))
}

/// PUT /api/{resource}/{id}
async fn update_record(
    State(ctx): State<AppContext>,
    Extension(kind): Extension<ContentKind>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> CmsResult<Json<RecordView>> {
    validate_record_id(&id)?;

    let form = ingress::read_multipart(multipart, ctx.config.upload.max_file_size).await?;
    let input = record_input(kind, &form)?;

    let staged = form.stage(&ctx.blob_store).await?;
    let record = ctx
        .content
        .for_kind(kind)
        .update(&id, input, staged)
        .await?;

    Ok(Json(decorate(&ctx, record)))
}

/// DELETE /api/{resource}/{id}
async fn delete_record(
    State(ctx): State<AppContext>,
    Extension(kind): Extension<ContentKind>,
    Path(id): Path<String>,
) -> CmsResult<Json<serde_json::Value>> {
    validate_record_id(&id)?;

    ctx.content.for_kind(kind).delete(&id).await?;

    Ok(Json(json!({
        "message": format!("{} deleted successfully", kind.as_str())
    })))
}

/// Map multipart text fields onto the unified input shape. The body text
/// arrives under a kind-specific name (`content` for posts,
/// `description` elsewhere), matching the dashboard's form contract.
fn record_input(kind: ContentKind, form: &UploadForm) -> CmsResult<RecordInput> {
    let body_field = kind.body_field();
    let body_ar_field = format!("{}_ar", body_field);

    let is_featured = match form.field("is_featured") {
        None => None,
        Some(raw) => Some(parse_bool(raw)?),
    };

    Ok(RecordInput {
        title: form.field("title").map(String::from),
        title_ar: form.field("title_ar").map(String::from),
        body: form.field(body_field).map(String::from),
        body_ar: form.field(&body_ar_field).map(String::from),
        page: form.field("page").map(String::from),
        section: form.field("section").map(String::from),
        video_url: form.field("video").map(String::from),
        is_featured,
    })
}

fn parse_bool(raw: &str) -> CmsResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(CmsError::Validation(format!(
            "Invalid boolean value: {}",
            other
        ))),
    }
}

fn validate_record_id(id: &str) -> CmsResult<()> {
    Uuid::try_parse(id)
        .map(|_| ())
        .map_err(|_| CmsError::Validation(format!("Malformed record id: {}", id)))
}

fn decorate(ctx: &AppContext, record: ContentRecord) -> RecordView {
    let image_url = ctx.attachments.resolve_url(record.image_id.as_deref());
    let pdf_url = ctx.attachments.resolve_url(record.pdf_id.as_deref());
    RecordView {
        record,
        image_url,
        pdf_url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_variants() {
        assert!(parse_bool("true").unwrap());
        assert!(parse_bool("1").unwrap());
        assert!(!parse_bool("False").unwrap());
        assert!(!parse_bool("0").unwrap());
        assert!(parse_bool("yes").is_err());
    }

    #[test]
    fn test_validate_record_id() {
        assert!(validate_record_id("0bd48e58c55f4f09a3c5f1bb1f8b9ad2").is_ok());
        assert!(validate_record_id("not-an-id").is_err());
        assert!(validate_record_id("").is_err());
    }

    #[test]
    fn test_record_input_uses_kind_specific_body_field() {
        let mut form = UploadForm::default();
        form.fields.insert("title".to_string(), "T".to_string());
        form.fields.insert("content".to_string(), "C".to_string());
        form.fields
            .insert("description".to_string(), "D".to_string());

        let post_input = record_input(ContentKind::Post, &form).unwrap();
        assert_eq!(post_input.body.as_deref(), Some("C"));

        let program_input = record_input(ContentKind::Program, &form).unwrap();
        assert_eq!(program_input.body.as_deref(), Some("D"));
    }
}
