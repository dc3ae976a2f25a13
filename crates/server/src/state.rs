use std::path::PathBuf;
use std::sync::Arc;

use configs::PathsConfig;
use service::{AvatarPipeline, Storage};

/// Shared by every handler; cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub avatars: AvatarPipeline,
    pub static_dir: PathBuf,
}

impl AppState {
    pub fn new(storage: Arc<dyn Storage>, paths: &PathsConfig) -> Self {
        Self {
            storage,
            avatars: AvatarPipeline::from_paths(paths),
            static_dir: PathBuf::from(&paths.static_dir),
        }
    }
}
