// Application state module
// Shared, read-only state handed to every connection task

use super::types::Config;
use crate::upload::OutputStore;

/// Application state
pub struct AppState {
    pub config: Config,
    pub store: OutputStore,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            store: OutputStore::new(&config.upload.output_dir),
        }
    }
}
