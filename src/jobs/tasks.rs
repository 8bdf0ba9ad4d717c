/// Background task implementations
use crate::{context::AppContext, error::CmsResult};
use chrono::{Duration, Utc};

/// How long a blob may sit unreferenced before the sweep takes it.
/// Generous enough that an in-flight create never races the sweep.
const ORPHAN_GRACE_HOURS: i64 = 24;

/// Delete blobs no content record references
///
/// Compares stored blob ids against all image/pdf references and removes
/// the leftovers: rejected-create remnants and crash-window orphans.
pub async fn sweep_orphan_blobs(ctx: &AppContext) -> CmsResult<u64> {
    let cutoff = Utc::now() - Duration::hours(ORPHAN_GRACE_HOURS);
    let orphans = ctx.blob_store.list_unreferenced(cutoff).await?;

    let mut deleted = 0;
    for id in orphans {
        match ctx.blob_store.delete(&id).await {
            Ok(()) => {
                tracing::info!("swept orphan blob {}", id);
                deleted += 1;
            }
            Err(e) => tracing::warn!("failed to sweep orphan blob {}: {}", id, e),
        }
    }

    Ok(deleted)
}

/// Cleanup expired sessions
pub async fn cleanup_expired_sessions(ctx: &AppContext) -> CmsResult<u64> {
    ctx.account_manager.cleanup_expired_sessions().await
}

/// Health check - verify the database is reachable
pub async fn health_check(ctx: &AppContext) -> CmsResult<()> {
    sqlx::query("SELECT 1").fetch_one(&ctx.db).await?;

    Ok(())
}
