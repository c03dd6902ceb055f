//! Task progress reporting
//!
//! A batch task is the only writer of its own [`TaskProgress`]; pollers only read.
//! Every write replaces the whole snapshot for a key, and once a task has reached
//! `completed` or `error` further writes for it are rejected by the store.

mod memory;

use crate::error::Result;
use crate::types::TaskId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use memory::MemoryProgressStore;

/// Message of a freshly started task
pub const MESSAGE_STARTED: &str = "다운로드 시작...";
/// Message while the output archive is built
pub const MESSAGE_PACKAGING: &str = "ZIP 파일 생성 중...";

/// Row updates never report more than this; 100 is reserved for `completed`
const MAX_ROW_PERCENT: u8 = 99;

/// Lifecycle state of a task
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Rows are being processed or the archive is being built
    Processing,
    /// Archive is ready for download
    Completed,
    /// Task aborted before or after its rows
    Error,
}

impl TaskStatus {
    /// Whether no further transitions are allowed
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Error)
    }

    /// Lowercase name used in storage and JSON
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Error => "error",
        }
    }

    /// Inverse of [`as_str`](Self::as_str)
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "processing" => Some(TaskStatus::Processing),
            "completed" => Some(TaskStatus::Completed),
            "error" => Some(TaskStatus::Error),
            _ => None,
        }
    }
}

/// Snapshot of one task as seen by pollers
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TaskProgress {
    /// Current state
    pub status: TaskStatus,
    /// Percent done (0-100)
    pub progress: u8,
    /// Rows started so far
    pub completed: usize,
    /// Rows in the input
    pub total: usize,
    /// Human-readable status line
    pub message: String,
    /// Where the packaged archive can be fetched (set on `completed` only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

impl TaskProgress {
    /// Initial state of a task whose rows have not been counted yet
    pub fn started() -> Self {
        Self {
            status: TaskStatus::Processing,
            progress: 0,
            completed: 0,
            total: 0,
            message: MESSAGE_STARTED.to_string(),
            download_url: None,
        }
    }

    /// State while row `idx` (1-based) of `total` is being downloaded
    pub fn row(idx: usize, total: usize, username: &str) -> Self {
        Self {
            status: TaskStatus::Processing,
            progress: row_percent(idx, total),
            completed: idx,
            total,
            message: format!("다운로드 중: {username} ({idx}/{total})"),
            download_url: None,
        }
    }

    /// State while the output is zipped
    pub fn packaging(total: usize) -> Self {
        Self {
            status: TaskStatus::Processing,
            progress: MAX_ROW_PERCENT,
            completed: total,
            total,
            message: MESSAGE_PACKAGING.to_string(),
            download_url: None,
        }
    }

    /// Terminal success
    pub fn completed(total: usize, message: impl Into<String>, download_url: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Completed,
            progress: 100,
            completed: total,
            total,
            message: message.into(),
            download_url: Some(download_url.into()),
        }
    }

    /// Terminal failure
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Error,
            progress: 0,
            completed: 0,
            total: 0,
            message: message.into(),
            download_url: None,
        }
    }

    /// Whether this snapshot ends the task
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Percent for row `idx` of `total`, floored and capped below 100
pub fn row_percent(idx: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = idx.saturating_mul(100) / total;
    pct.min(MAX_ROW_PERCENT as usize) as u8
}

/// Shared keyed store of task progress
///
/// Implementations must make [`set`](Self::set) atomic per key and must refuse to
/// overwrite a terminal snapshot.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Current snapshot for `id`
    async fn get(&self, id: &TaskId) -> Result<Option<TaskProgress>>;

    /// Replace the snapshot for `id`
    ///
    /// Returns `false` (and stores nothing) when the task is already terminal.
    async fn set(&self, id: &TaskId, progress: TaskProgress) -> Result<bool>;

    /// Every known task, ordered by id
    async fn list(&self) -> Result<Vec<(TaskId, TaskProgress)>>;

    /// Whether a snapshot exists for `id`
    async fn contains(&self, id: &TaskId) -> Result<bool> {
        Ok(self.get(id).await?.is_some())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_percent_is_floored_and_capped() {
        assert_eq!(row_percent(1, 3), 33);
        assert_eq!(row_percent(2, 3), 66);
        assert_eq!(row_percent(3, 3), 99);
        assert_eq!(row_percent(1, 1), 99);
        assert_eq!(row_percent(0, 0), 0);
    }

    #[test]
    fn row_percent_is_monotonic() {
        let total = 17;
        let values: Vec<u8> = (1..=total).map(|i| row_percent(i, total)).collect();
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn only_completed_reaches_100() {
        let done = TaskProgress::completed(4, "완료: 4개 성공, 0개 실패", "/download/x.zip");
        assert_eq!(done.progress, 100);
        assert!(done.is_terminal());
        assert!(TaskProgress::row(4, 4, "alice").progress < 100);
        assert!(TaskProgress::packaging(4).progress < 100);
    }

    #[test]
    fn row_message_matches_format() {
        let p = TaskProgress::row(2, 5, "alice");
        assert_eq!(p.message, "다운로드 중: alice (2/5)");
        assert_eq!(p.completed, 2);
        assert_eq!(p.total, 5);
    }

    #[test]
    fn json_shape() {
        let json = serde_json::to_value(TaskProgress::started()).unwrap();
        assert_eq!(json["status"], "processing");
        assert_eq!(json["message"], MESSAGE_STARTED);
        assert!(json.get("download_url").is_none());

        let json = serde_json::to_value(TaskProgress::completed(1, "m", "/download/a.zip")).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["download_url"], "/download/a.zip");
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [TaskStatus::Processing, TaskStatus::Completed, TaskStatus::Error] {
            assert_eq!(TaskStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TaskStatus::parse("queued"), None);
    }
}
