//! Shutdown coordination.

use crate::error::Result;
use crate::progress::TaskProgress;
use crate::types::{Event, TaskId};
use std::time::Duration;

use super::PostDownloader;

/// How long [`PostDownloader::shutdown`] waits for running tasks
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Message stored for tasks aborted at shutdown
pub const MESSAGE_ABORTED: &str = "서버가 종료되어 작업이 중단되었습니다";

impl PostDownloader {
    /// Gracefully shut down the runner
    ///
    /// This method performs a graceful shutdown sequence:
    /// 1. Stops accepting new tasks (later submissions fail with `ShuttingDown`)
    /// 2. Waits up to 30 seconds for running tasks to finish
    /// 3. Aborts whatever is still running and marks those tasks as failed
    /// 4. Emits [`Event::Shutdown`]
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_with_timeout(SHUTDOWN_TIMEOUT).await
    }

    pub(crate) async fn shutdown_with_timeout(&self, timeout: Duration) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        // 1. Stop accepting new tasks
        self.tracking
            .accepting_new
            .store(false, std::sync::atomic::Ordering::SeqCst);
        tracing::info!("Stopped accepting new tasks");

        // 2. Wait for running tasks with timeout
        match tokio::time::timeout(timeout, self.wait_for_active_tasks()).await {
            Ok(()) => tracing::info!("All running tasks completed"),
            Err(_) => {
                tracing::warn!("Timeout waiting for tasks to complete, aborting the rest");
                self.abort_active_tasks().await;
            }
        }

        // 3. Emit shutdown event
        self.emit_event(Event::Shutdown);

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Whether [`shutdown`](Self::shutdown) has begun
    pub fn is_shutting_down(&self) -> bool {
        !self
            .tracking
            .accepting_new
            .load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Ids of tasks whose worker is still running
    pub async fn active_tasks(&self) -> Vec<TaskId> {
        let mut ids: Vec<TaskId> = self.tracking.active.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    async fn wait_for_active_tasks(&self) {
        loop {
            let active_count = self.tracking.active.lock().await.len();
            if active_count == 0 {
                return;
            }

            tracing::debug!(active_count, "Waiting for running tasks to complete");
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    async fn abort_active_tasks(&self) {
        let drained: Vec<_> = self.tracking.active.lock().await.drain().collect();
        for (id, handle) in drained {
            handle.abort();
            tracing::warn!(task_id = %id, "task aborted at shutdown");
            self.set_progress(&id, TaskProgress::failed(MESSAGE_ABORTED))
                .await;
            self.emit_event(Event::TaskFailed {
                id,
                message: MESSAGE_ABORTED.to_string(),
            });
        }
    }
}
