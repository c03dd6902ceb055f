//! Traits and types for post retrieval

use super::PostReference;
use crate::error::RetrievalError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Media files and caption of one post
#[must_use]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedPost {
    /// Downloaded media files, all directly inside the destination directory
    pub files: Vec<PathBuf>,
    /// Caption text (empty if the post has none)
    pub caption: String,
}

/// Outcome of one retrieval attempt
pub type DownloadResult = Result<FetchedPost, RetrievalError>;

/// A way of downloading a single post
///
/// Implementations write media into `dest` (creating nothing above it) and leave no
/// metadata sidecars behind on success.
///
/// # Examples
///
/// ```no_run
/// use insta_batch_dl::retrieval::{GalleryDlStrategy, PostReference, RetrievalStrategy};
/// use std::path::Path;
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let strategy = GalleryDlStrategy::from_path("instagram_cookies.txt".into(), Duration::from_secs(60))
///     .ok_or("gallery-dl not found in PATH")?;
///
/// let post = PostReference::parse("https://www.instagram.com/p/ABC123/")?;
/// let fetched = strategy.fetch(&post, Path::new("output/alice/24.01.01")).await?;
/// println!("{} files, caption: {}", fetched.files.len(), fetched.caption);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait RetrievalStrategy: Send + Sync {
    /// Download `reference` into `dest`
    ///
    /// # Errors
    ///
    /// Returns a [`RetrievalError`] describing why the post could not be fetched.
    /// Errors are per-post and never abort a batch.
    async fn fetch(&self, reference: &PostReference, dest: &Path) -> DownloadResult;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Media files directly in `dir` whose names start with `shortcode`, sorted
///
/// Matching `.txt`/`.json` sidecars are deleted along the way.
pub(crate) fn collect_flat_media(dir: &Path, shortcode: &str) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with(shortcode) {
            continue;
        }
        if crate::utils::is_text_sidecar(&name) {
            if let Err(e) = std::fs::remove_file(entry.path()) {
                tracing::debug!(file = %name, error = %e, "failed to remove sidecar");
            }
        } else {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}
