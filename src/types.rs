//! Core types for insta-batch-dl

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::progress::TaskProgress;

/// Unique identifier for a batch task
///
/// Derived from the local time the upload arrived (`%Y%m%d_%H%M%S`), with a `_N`
/// suffix when several uploads land in the same second.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Create a TaskId from an existing key
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Timestamp-derived key for "now"
    pub fn from_now() -> Self {
        Self(chrono::Local::now().format("%Y%m%d_%H%M%S").to_string())
    }

    /// Same timestamp with a collision counter appended
    pub fn with_suffix(&self, n: u32) -> Self {
        Self(format!("{}_{}", self.0, n))
    }

    /// Borrow the key
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Event emitted while tasks run
///
/// Subscribers get these over a broadcast channel; the REST API forwards them as
/// server-sent events.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A task was accepted and its worker spawned
    TaskQueued {
        /// Task identifier
        id: TaskId,
    },

    /// Progress snapshot was written for a task
    Progress {
        /// Task identifier
        id: TaskId,
        /// The snapshot that was stored
        progress: TaskProgress,
    },

    /// One row finished (successfully or not)
    RowFinished {
        /// Task identifier
        id: TaskId,
        /// 1-based row index
        row: usize,
        /// Whether the post was downloaded
        success: bool,
    },

    /// Task reached `completed`
    TaskCompleted {
        /// Task identifier
        id: TaskId,
        /// Where the packaged archive can be fetched
        download_url: String,
    },

    /// Task reached `error`
    TaskFailed {
        /// Task identifier
        id: TaskId,
        /// User-facing error message
        message: String,
    },

    /// Runner is shutting down
    Shutdown,
}
