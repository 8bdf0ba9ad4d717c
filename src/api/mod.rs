/// API routes and handlers
pub mod auth;
pub mod contact;
pub mod content;
pub mod files;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(content::routes())
        .merge(files::routes())
        .merge(auth::routes())
        .merge(contact::routes())
}
