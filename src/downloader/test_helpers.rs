//! Shared test helpers for creating PostDownloader instances in tests.

use crate::config::Config;
use crate::downloader::PostDownloader;
use crate::error::RetrievalError;
use crate::progress::{MemoryProgressStore, TaskProgress};
use crate::retrieval::{
    DownloadResult, FetchedPost, PostReference, RetrievalEngine, RetrievalStrategy,
};
use crate::types::TaskId;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

/// Strategy that writes `<shortcode>.jpg` after an optional delay
#[derive(Default)]
pub(crate) struct StubStrategy {
    pub(crate) delay: Duration,
    pub(crate) fail_codes: Vec<&'static str>,
}

#[async_trait]
impl RetrievalStrategy for StubStrategy {
    async fn fetch(&self, reference: &PostReference, dest: &Path) -> DownloadResult {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let code = reference.shortcode();
        if self.fail_codes.contains(&code) {
            return Err(RetrievalError::failed("stub refused"));
        }
        let media = dest.join(format!("{code}.jpg"));
        tokio::fs::write(&media, b"jpeg").await.unwrap();
        Ok(FetchedPost {
            files: vec![media],
            caption: format!("caption {code}"),
        })
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

/// Helper to create a test PostDownloader backed by an in-memory store.
/// Returns the downloader and the tempdir (which must be kept alive).
pub(crate) fn create_test_downloader(strategy: StubStrategy) -> (PostDownloader, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();

    let mut config = Config::default();
    config.paths.upload_dir = temp_dir.path().join("uploads");
    config.paths.output_dir = temp_dir.path().join("output");
    config.batch.row_delay = Duration::ZERO;

    let engine = RetrievalEngine::new(Arc::new(strategy), None);
    let downloader =
        PostDownloader::with_components(config, Arc::new(MemoryProgressStore::new()), engine);

    (downloader, temp_dir)
}

/// Poll until the task is terminal (panics after 10s)
pub(crate) async fn wait_for_terminal(downloader: &PostDownloader, id: &TaskId) -> TaskProgress {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let progress = downloader.progress(id).await.unwrap();
        if progress.is_terminal() {
            return progress;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "task {id} did not finish: {progress:?}"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Three valid rows, two users
pub(crate) const SAMPLE_CSV: &str = "Link,Id,Date\n\
https://www.instagram.com/p/AAA/,alice,2024-01-01\n\
https://www.instagram.com/p/BBB/,alice,2024-01-01\n\
https://www.instagram.com/reel/CCC/,bob,2024.02.03\n";
