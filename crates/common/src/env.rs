//! Environment/runtime helpers
//!
//! Sanity checks to ensure expected directories exist at startup.

use std::path::Path;

use tracing::{info, warn};

/// Ensure the static tree and the avatar upload directory exist.
///
/// A missing static directory is only a warning (assets will 404); the upload
/// directory is created since avatar writes would otherwise fail per request.
pub async fn ensure_env(static_dir: &Path, upload_dir: &Path) -> anyhow::Result<()> {
    if tokio::fs::metadata(static_dir).await.is_err() {
        warn!(static_dir = %static_dir.display(), "static assets directory not found; static assets may 404");
    }
    tokio::fs::create_dir_all(upload_dir)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", upload_dir.display()))?;
    info!(upload_dir = %upload_dir.display(), "upload directory ready");
    Ok(())
}
