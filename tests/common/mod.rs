//! Common test utilities for insta-batch-dl integration tests

use async_trait::async_trait;
use insta_batch_dl::retrieval::{DownloadResult, FetchedPost, PostReference, RetrievalStrategy};
use insta_batch_dl::{
    Config, PostDownloader, ProgressStore, RetrievalEngine, RetrievalError, TaskId, TaskProgress,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Writes `<shortcode>_1.jpg` and `<shortcode>_2.jpg`, refusing the listed shortcodes
pub struct FakeInstagram {
    pub refuse: Vec<&'static str>,
}

#[async_trait]
impl RetrievalStrategy for FakeInstagram {
    async fn fetch(&self, reference: &PostReference, dest: &Path) -> DownloadResult {
        let code = reference.shortcode();
        if self.refuse.contains(&code) {
            return Err(RetrievalError::failed("HTTP 404"));
        }
        let mut files = Vec::new();
        for n in 1..=2 {
            let path = dest.join(format!("{code}_{n}.jpg"));
            tokio::fs::write(&path, b"jpeg")
                .await
                .map_err(|e| RetrievalError::failed(e.to_string()))?;
            files.push(path);
        }
        Ok(FetchedPost {
            files,
            caption: format!("#{code}"),
        })
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Config rooted in `temp` with no pause between rows
pub fn test_config(temp: &TempDir) -> Config {
    let mut config = Config::default();
    config.paths.upload_dir = temp.path().join("uploads");
    config.paths.output_dir = temp.path().join("output");
    config.batch.row_delay = Duration::ZERO;
    config
}

/// Runner over `store` that retrieves through [`FakeInstagram`]
pub fn downloader_with(
    config: Config,
    store: Arc<dyn ProgressStore>,
    refuse: Vec<&'static str>,
) -> PostDownloader {
    let engine = RetrievalEngine::new(Arc::new(FakeInstagram { refuse }), None);
    PostDownloader::with_components(config, store, engine)
}

/// Poll until the task is terminal (panics after 10s)
#[allow(clippy::unwrap_used)]
pub async fn wait_for_terminal(downloader: &PostDownloader, id: &TaskId) -> TaskProgress {
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

/// Sorted file entries of a zip archive
#[allow(clippy::unwrap_used)]
pub fn archive_files(path: &Path) -> Vec<String> {
    let mut zip = zip::ZipArchive::new(std::fs::File::open(path).unwrap()).unwrap();
    let mut names: Vec<String> = (0..zip.len())
        .map(|i| zip.by_index(i).unwrap().name().to_string())
        .filter(|name| !name.ends_with('/'))
        .collect();
    names.sort();
    names
}
