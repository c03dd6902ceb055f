//! Database layer for insta-batch-dl
//!
//! SQLite persistence for task progress, so pollers can still read the outcome of
//! a task after the process restarts.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] - Database lifecycle, schema migrations
//! - [`tasks`] - Task progress snapshots ([`ProgressStore`](crate::progress::ProgressStore) impl)

use crate::error::DatabaseError;
use crate::progress::{TaskProgress, TaskStatus};
use crate::types::TaskId;
use sqlx::{FromRow, sqlite::SqlitePool};

mod migrations;
mod tasks;

/// Task record from database (raw from SQLite)
#[derive(Debug, Clone, FromRow)]
pub struct TaskRow {
    /// Task key
    pub id: String,
    /// Lowercase status name
    pub status: String,
    /// Percent done
    pub progress: i64,
    /// Rows started so far
    pub completed: i64,
    /// Rows in the input
    pub total: i64,
    /// Human-readable status line
    pub message: String,
    /// Archive location once completed
    pub download_url: Option<String>,
    /// Unix timestamp of the first write
    pub created_at: i64,
    /// Unix timestamp of the last accepted write
    pub updated_at: i64,
}

impl TryFrom<TaskRow> for (TaskId, TaskProgress) {
    type Error = DatabaseError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let status = TaskStatus::parse(&row.status).ok_or_else(|| {
            DatabaseError::Corrupt(format!("task {} has unknown status {:?}", row.id, row.status))
        })?;
        let progress = TaskProgress {
            status,
            progress: row.progress.clamp(0, 100) as u8,
            completed: usize::try_from(row.completed).unwrap_or(0),
            total: usize::try_from(row.total).unwrap_or(0),
            message: row.message,
            download_url: row.download_url,
        };
        Ok((TaskId::new(row.id), progress))
    }
}

/// Database handle for insta-batch-dl
pub struct Database {
    pool: SqlitePool,
}
