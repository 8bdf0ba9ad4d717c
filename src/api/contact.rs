/// Contact form endpoint
use crate::{
    context::AppContext,
    error::{CmsError, CmsResult},
};
use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

/// Build contact routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/api/contact", post(send_message))
}

#[derive(Debug, Deserialize, Validate)]
struct ContactRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    name: String,
    #[validate(email(message = "Please provide a valid email address"))]
    email: String,
    #[validate(length(min = 1, message = "Message is required"))]
    message: String,
}

/// POST /api/contact
async fn send_message(
    State(ctx): State<AppContext>,
    Json(req): Json<ContactRequest>,
) -> CmsResult<Json<serde_json::Value>> {
    req.validate()
        .map_err(|e| CmsError::Validation(e.to_string()))?;

    ctx.mailer
        .send_contact_message(&req.name, &req.email, &req.message)
        .await?;

    Ok(Json(json!({ "message": "Message sent successfully" })))
}
