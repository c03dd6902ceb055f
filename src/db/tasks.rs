//! Task progress snapshots.

use crate::error::DatabaseError;
use crate::progress::{ProgressStore, TaskProgress};
use crate::types::TaskId;
use crate::{Error, Result};
use async_trait::async_trait;

use super::{Database, TaskRow};

impl Database {
    /// Upsert a snapshot unless the stored one is already terminal
    ///
    /// Returns whether the write was applied.
    pub async fn upsert_task(&self, id: &TaskId, progress: &TaskProgress) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            INSERT INTO tasks (id, status, progress, completed, total, message, download_url, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                progress = excluded.progress,
                completed = excluded.completed,
                total = excluded.total,
                message = excluded.message,
                download_url = excluded.download_url,
                updated_at = excluded.updated_at
            WHERE tasks.status = 'processing'
            "#,
        )
        .bind(id.as_str())
        .bind(progress.status.as_str())
        .bind(i64::from(progress.progress))
        .bind(progress.completed as i64)
        .bind(progress.total as i64)
        .bind(&progress.message)
        .bind(&progress.download_url)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to store task progress: {}",
                e
            )))
        })?;

        Ok(result.rows_affected() > 0)
    }

    /// Load one task
    pub async fn get_task(&self, id: &TaskId) -> Result<Option<TaskProgress>> {
        let row = sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT id, status, progress, completed, total, message, download_url, created_at, updated_at
            FROM tasks WHERE id = ?
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to load task: {}",
                e
            )))
        })?;

        row.map(|row| <(TaskId, TaskProgress)>::try_from(row).map(|(_, progress)| progress))
            .transpose()
            .map_err(Error::Database)
    }

    /// Load every task, ordered by id
    pub async fn list_tasks(&self) -> Result<Vec<(TaskId, TaskProgress)>> {
        let rows = sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT id, status, progress, completed, total, message, download_url, created_at, updated_at
            FROM tasks ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list tasks: {}",
                e
            )))
        })?;

        rows.into_iter()
            .map(|row| <(TaskId, TaskProgress)>::try_from(row).map_err(Error::Database))
            .collect()
    }

    /// Mark tasks left in `processing` by a previous run as failed
    ///
    /// Their workers died with the old process, so nothing would ever finish them.
    /// Returns the number of tasks updated.
    pub async fn fail_interrupted_tasks(&self, message: &str) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE tasks SET status = 'error', message = ?, updated_at = ?
            WHERE status = 'processing'
            "#,
        )
        .bind(message)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to fail interrupted tasks: {}",
                e
            )))
        })?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl ProgressStore for Database {
    async fn get(&self, id: &TaskId) -> Result<Option<TaskProgress>> {
        self.get_task(id).await
    }

    async fn set(&self, id: &TaskId, progress: TaskProgress) -> Result<bool> {
        let applied = self.upsert_task(id, &progress).await?;
        if !applied {
            tracing::debug!(task_id = %id, "ignoring write to finished task");
        }
        Ok(applied)
    }

    async fn list(&self) -> Result<Vec<(TaskId, TaskProgress)>> {
        self.list_tasks().await
    }
}
