//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`tasks`] - Upload and progress
//! - [`files`] - Archive download
//! - [`system`] - Health, events, OpenAPI

use crate::types::TaskId;
use serde::{Deserialize, Serialize};

mod files;
mod system;
mod tasks;

// Re-export all handlers so `routes::function_name` continues to work
pub use files::*;
pub use system::*;
pub use tasks::*;

/// Response body for POST /upload
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct UploadResponse {
    /// Always true
    pub success: bool,
    /// Key to poll `/progress/{task_id}` with
    pub task_id: TaskId,
    /// `다운로드를 시작했습니다`
    pub message: String,
}

/// One entry of GET /tasks
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct TaskSummary {
    /// Task key
    pub task_id: TaskId,
    /// Latest snapshot
    #[serde(flatten)]
    pub progress: crate::progress::TaskProgress,
}
