//! Application state for the API server

use crate::{Config, PostDownloader};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clone).
#[derive(Clone)]
pub struct AppState {
    /// The task runner
    pub downloader: Arc<PostDownloader>,

    /// Configuration (read-only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(downloader: Arc<PostDownloader>, config: Arc<Config>) -> Self {
        Self { downloader, config }
    }
}
