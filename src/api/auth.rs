/// Authentication endpoints
use crate::{
    account::{AccountInfo, LoginRequest, LoginResponse, RegisterRequest},
    context::AppContext,
    error::{CmsError, CmsResult},
};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use validator::Validate;

/// Build auth routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
}

/// POST /api/auth/register
async fn register(
    State(ctx): State<AppContext>,
    Json(req): Json<RegisterRequest>,
) -> CmsResult<impl IntoResponse> {
    req.validate()
        .map_err(|e| CmsError::Validation(e.to_string()))?;

    let account = ctx
        .account_manager
        .register(&req.full_name, &req.email, &req.password)
        .await?;

    Ok((StatusCode::CREATED, Json(AccountInfo::from(&account))))
}

/// POST /api/auth/login
async fn login(
    State(ctx): State<AppContext>,
    Json(req): Json<LoginRequest>,
) -> CmsResult<Json<LoginResponse>> {
    req.validate()
        .map_err(|e| CmsError::Validation(e.to_string()))?;

    let (account, session) = ctx.account_manager.login(&req.email, &req.password).await?;

    Ok(Json(LoginResponse {
        token: session.access_token,
        user: AccountInfo::from(&account),
    }))
}
