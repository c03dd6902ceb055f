//! Primary strategy: the external gallery-dl downloader

use super::PostReference;
use super::cookies::credential_state;
use super::traits::{DownloadResult, FetchedPost, RetrievalStrategy};
use crate::config::RetrievalConfig;
use crate::error::RetrievalError;
use crate::utils::{is_json_sidecar, move_into_dir, remove_empty_subdirs, truncate_chars};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Marker gallery-dl prints in verbose output when a request went through
const HTTP_OK_MARKER: &str = "HTTP/1.1\" 200";

/// Longest diagnostic excerpt carried into an error
const MAX_DIAGNOSTIC_CHARS: usize = 200;

/// Runs `gallery-dl` as a subprocess with a bounded timeout
///
/// gallery-dl lays files out in nested directories and writes a `.json` metadata
/// file per media item. After a run, media whose name contains the shortcode is
/// moved up to the destination root, the caption is taken from the metadata, and
/// the metadata files are removed.
pub struct GalleryDlStrategy {
    binary_path: Option<PathBuf>,
    config_file: Option<PathBuf>,
    cookie_file: PathBuf,
    timeout: Duration,
}

impl GalleryDlStrategy {
    /// Create a strategy with an explicit binary path
    pub fn new(binary_path: PathBuf, cookie_file: PathBuf, timeout: Duration) -> Self {
        Self {
            binary_path: Some(binary_path),
            config_file: None,
            cookie_file,
            timeout,
        }
    }

    /// Attempt to find gallery-dl in PATH
    pub fn from_path(cookie_file: PathBuf, timeout: Duration) -> Option<Self> {
        which::which("gallery-dl")
            .ok()
            .map(|binary| Self::new(binary, cookie_file, timeout))
    }

    /// Build from configuration
    ///
    /// An unresolvable binary is not an error here; every fetch then fails with
    /// [`RetrievalError::ToolMissing`] so the fallback can take over.
    pub fn from_config(config: &RetrievalConfig) -> Self {
        let binary_path = config
            .gallery_dl_path
            .clone()
            .or_else(|| which::which("gallery-dl").ok());
        if binary_path.is_none() {
            warn!("gallery-dl not found in PATH; primary retrieval unavailable");
        }
        Self {
            binary_path,
            config_file: config.gallery_dl_config.clone(),
            cookie_file: config.cookie_file.clone(),
            timeout: config.tool_timeout,
        }
    }

    /// Pass a gallery-dl configuration profile on every run
    pub fn with_config_file(mut self, config_file: Option<PathBuf>) -> Self {
        self.config_file = config_file;
        self
    }

    /// Resolved binary, if any
    pub fn binary_path(&self) -> Option<&Path> {
        self.binary_path.as_deref()
    }

    fn build_args(&self, reference: &PostReference, dest: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        if self.cookie_file.exists() {
            args.push("--cookies".into());
            args.push(self.cookie_file.clone().into_os_string());
        } else {
            debug!(cookie_file = ?self.cookie_file, "no cookie file, running without login");
        }
        if let Some(config_file) = &self.config_file {
            args.push("--config".into());
            args.push(config_file.clone().into_os_string());
        }
        args.push("--dest".into());
        args.push(dest.as_os_str().to_os_string());
        args.push("--write-metadata".into());
        args.push(reference.url().into());
        args
    }

    fn classify_failure(&self, diagnostic: &str) -> RetrievalError {
        if diagnostic.to_lowercase().contains("login required") || diagnostic.contains("401") {
            return RetrievalError::AuthRequired {
                credentials: credential_state(&self.cookie_file),
            };
        }
        let excerpt = truncate_chars(diagnostic.trim(), MAX_DIAGNOSTIC_CHARS);
        if excerpt.is_empty() {
            RetrievalError::failed("gallery-dl produced no files")
        } else {
            RetrievalError::failed(excerpt)
        }
    }
}

#[async_trait]
impl RetrievalStrategy for GalleryDlStrategy {
    async fn fetch(&self, reference: &PostReference, dest: &Path) -> DownloadResult {
        let Some(binary) = &self.binary_path else {
            return Err(RetrievalError::ToolMissing);
        };

        debug!(shortcode = reference.shortcode(), ?dest, "running gallery-dl");

        let child = Command::new(binary)
            .args(self.build_args(reference, dest))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                warn!(?binary, error = %e, "failed to launch gallery-dl");
                RetrievalError::ToolMissing
            })?;

        // Dropping the child on timeout kills it
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(RetrievalError::failed(format!(
                    "failed to collect gallery-dl output: {}",
                    e
                )));
            }
            Err(_) => {
                warn!(
                    shortcode = reference.shortcode(),
                    timeout_secs = self.timeout.as_secs(),
                    "gallery-dl timed out"
                );
                return Err(RetrievalError::Timeout {
                    after: self.timeout,
                });
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);

        if output.status.success() || stderr.contains(HTTP_OK_MARKER) {
            let dest_owned = dest.to_path_buf();
            let shortcode = reference.shortcode().to_string();
            let collected =
                tokio::task::spawn_blocking(move || collect_downloads(&dest_owned, &shortcode))
                    .await
                    .map_err(|e| RetrievalError::failed(format!("scan task failed: {}", e)))?
                    .map_err(|e| RetrievalError::failed(format!("failed to scan output: {}", e)))?;

            if !collected.files.is_empty() {
                info!(
                    shortcode = reference.shortcode(),
                    files = collected.files.len(),
                    "gallery-dl download complete"
                );
                return Ok(collected);
            }
            debug!(
                shortcode = reference.shortcode(),
                "gallery-dl reported success but left no files"
            );
        }

        let diagnostic = if stderr.trim().is_empty() {
            stdout
        } else {
            stderr
        };
        let error = self.classify_failure(&diagnostic);
        warn!(
            shortcode = reference.shortcode(),
            status = ?output.status.code(),
            kind = error.kind(),
            "gallery-dl failed"
        );
        Err(error)
    }

    fn name(&self) -> &'static str {
        "gallery-dl"
    }
}

/// Flatten gallery-dl output for one post into `dest`
///
/// Caption comes from the first metadata file with a non-empty `description` or
/// `caption.text`. Metadata files are deleted whether or not they parse.
fn collect_downloads(dest: &Path, shortcode: &str) -> std::io::Result<FetchedPost> {
    let mut matches: Vec<PathBuf> = walkdir::WalkDir::new(dest)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.file_name().to_string_lossy().contains(shortcode))
        .map(|entry| entry.into_path())
        .collect();
    matches.sort();

    let mut post = FetchedPost::default();
    for path in matches {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if is_json_sidecar(&name) {
            if post.caption.is_empty()
                && let Some(caption) = read_caption(&path)
            {
                post.caption = caption;
            }
            if let Err(e) = std::fs::remove_file(&path) {
                debug!(?path, error = %e, "failed to remove metadata file");
            }
            continue;
        }

        post.files.push(move_into_dir(&path, dest)?);
    }

    remove_empty_subdirs(dest);
    Ok(post)
}

fn read_caption(path: &Path) -> Option<String> {
    let raw = std::fs::read_to_string(path).ok()?;
    let metadata: serde_json::Value = serde_json::from_str(&raw).ok()?;
    caption_from_metadata(&metadata)
}

/// Caption from gallery-dl metadata: `description`, else `caption.text`
pub(crate) fn caption_from_metadata(metadata: &serde_json::Value) -> Option<String> {
    let non_empty = |v: Option<&serde_json::Value>| {
        v.and_then(serde_json::Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    non_empty(metadata.get("description"))
        .or_else(|| non_empty(metadata.get("caption").and_then(|c| c.get("text"))))
}
