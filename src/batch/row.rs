//! Per-row processing

use crate::date::normalize_date;
use crate::error::RetrievalError;
use crate::input::{COLUMN_DATE, COLUMN_ID, COLUMN_LINK, Row};
use crate::retrieval::{PostReference, RetrievalEngine};
use crate::utils::{is_json_sidecar, sanitize_filename};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Caption file written next to the media of every downloaded post
pub const CAPTION_FILE_NAME: &str = "게시물.txt";

/// Fields taken from one input row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowInput {
    /// 1-based position in the input
    pub idx: usize,
    /// Post URL (trimmed)
    pub link: String,
    /// Owner identifier (trimmed)
    pub username: String,
    /// Date already normalized to `yy.mm.dd` (or sanitized raw text)
    pub date: String,
}

impl RowInput {
    /// Extract the three required fields of `row`
    pub fn from_row(idx: usize, row: &Row) -> Self {
        Self {
            idx,
            link: row.text(COLUMN_LINK),
            username: row.text(COLUMN_ID),
            date: normalize_date(row.get(COLUMN_DATE)),
        }
    }

    /// `output_root/<username>/<date>`
    ///
    /// Always a descendant of `output_root` (or `output_root` itself when both
    /// fields are empty).
    pub fn output_dir(&self, output_root: &Path) -> PathBuf {
        output_root
            .join(path_segment(&self.username))
            .join(path_segment(&self.date))
    }
}

/// Sanitized text that cannot step out of its parent directory
fn path_segment(text: &str) -> String {
    match sanitize_filename(text) {
        segment if segment == "." || segment == ".." => "_".to_string(),
        segment => segment,
    }
}

/// A row whose post was downloaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSuccess {
    /// Directory the post landed in
    pub dir: PathBuf,
    /// Media files
    pub files: Vec<PathBuf>,
    /// Path of the written caption file
    pub caption_file: PathBuf,
}

/// Why a row failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureKind {
    /// Retrieval (or link parsing) failed
    Retrieval {
        /// Machine-readable retrieval error kind
        error: &'static str,
    },
    /// Anything else raised while handling the row (filesystem, ...)
    Unexpected,
}

/// A failed row, as listed in the failure report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    /// Post URL as given
    pub url: String,
    /// Owner identifier
    pub username: String,
    /// Normalized date
    pub date: String,
    /// Failure classification
    pub kind: FailureKind,
    /// Error text
    pub detail: Option<String>,
}

impl FailureRecord {
    fn new(input: &RowInput, kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            url: input.link.clone(),
            username: input.username.clone(),
            date: input.date.clone(),
            kind,
            detail: Some(detail.into()),
        }
    }

    pub(crate) fn retrieval(input: &RowInput, error: &RetrievalError) -> Self {
        Self::new(
            input,
            FailureKind::Retrieval {
                error: error.kind(),
            },
            error.to_string(),
        )
    }

    pub(crate) fn unexpected(input: &RowInput, error: impl std::fmt::Display) -> Self {
        Self::new(input, FailureKind::Unexpected, error.to_string())
    }

    /// One line of the failure report
    pub fn report_line(&self) -> String {
        let mut line = format!("{} (ID: {}, Date: {})", self.url, self.username, self.date);
        if let Some(detail) = &self.detail {
            line.push_str(" - Error: ");
            line.push_str(detail);
        }
        line
    }
}

/// Download one row into its output directory
///
/// Every failure, including filesystem errors, comes back as a [`FailureRecord`].
pub(crate) async fn process_row(
    engine: &RetrievalEngine,
    input: &RowInput,
    output_root: &Path,
) -> Result<RowSuccess, FailureRecord> {
    let dir = input.output_dir(output_root);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| FailureRecord::unexpected(input, e))?;

    let reference =
        PostReference::parse(&input.link).map_err(|e| FailureRecord::retrieval(input, &e))?;

    let fetched = engine
        .fetch(&reference, &dir)
        .await
        .map_err(|e| FailureRecord::retrieval(input, &e))?;

    let caption_file = dir.join(CAPTION_FILE_NAME);
    tokio::fs::write(&caption_file, fetched.caption.as_bytes())
        .await
        .map_err(|e| FailureRecord::unexpected(input, e))?;

    remove_residual_sidecars(&dir, reference.shortcode()).await;

    Ok(RowSuccess {
        dir,
        files: fetched.files,
        caption_file,
    })
}

/// Delete `*.info.json` and shortcode-named `.json` files left in `dir`
async fn remove_residual_sidecars(dir: &Path, shortcode: &str) {
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name().to_string_lossy().into_owned();
        let lower = name.to_lowercase();
        let residual = lower.ends_with(".info.json")
            || (name.contains(shortcode) && is_json_sidecar(&name));
        if residual && let Err(e) = tokio::fs::remove_file(entry.path()).await {
            debug!(file = %name, error = %e, "failed to remove residual sidecar");
        }
    }
}
