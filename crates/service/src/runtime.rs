//! Runtime environment helpers
//!
//! Thin wrapper around `common::env` so the server only needs the paths config.

use std::path::Path;

use configs::PathsConfig;

/// Ensure the static tree and the avatar directory exist before serving.
pub async fn ensure_env(paths: &PathsConfig) -> anyhow::Result<()> {
    common::env::ensure_env(Path::new(&paths.static_dir), &paths.avatar_dir()).await
}
