//! Per-task worker: batch, packaging, terminal state.

use crate::batch::{BatchProcessor, batch_error_message};
use crate::packaging::{download_url, package_task_output};
use crate::progress::TaskProgress;
use crate::types::{Event, TaskId};
use std::path::{Path, PathBuf};

use super::PostDownloader;

impl PostDownloader {
    /// Spawn the worker for `id` and track it until it exits
    ///
    /// The active map stays locked across the spawn so the worker's own removal
    /// can never run before its insertion.
    pub(crate) async fn spawn_task(&self, id: TaskId, input_path: PathBuf) {
        let mut active = self.tracking.active.lock().await;

        let runner = self.clone();
        let task_id = id.clone();
        let handle = tokio::spawn(async move {
            runner.run_task(&task_id, &input_path).await;
            runner.tracking.active.lock().await.remove(&task_id);
        });

        active.insert(id, handle);
        tracing::debug!(active = active.len(), "task worker spawned");
    }

    /// Run one task to a terminal state
    ///
    /// Rows go to `output/{id}/`; afterwards that directory is zipped into
    /// `output/instagram_download_{id}.zip` and `completed` is stored with the
    /// archive's download URL. Any failure ends in `error` instead.
    pub(crate) async fn run_task(&self, id: &TaskId, input_path: &Path) {
        let output_root = self.config.paths.output_dir.clone();
        let task_dir = output_root.join(id.as_str());

        let processor = BatchProcessor::new(
            self.engine.clone(),
            self.store.clone(),
            self.config.batch.row_delay,
        )
        .with_events(self.event_tx.clone());

        // The processor has already stored `error` when it returns Err
        let summary = match processor.run(input_path, &task_dir, id).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!(task_id = %id, error = %e, "task ended before processing rows");
                return;
            }
        };

        self.set_progress(id, TaskProgress::packaging(summary.total))
            .await;

        match package_task_output(&task_dir, &output_root, id).await {
            Ok(_) => {
                let url = download_url(id);
                self.set_progress(
                    id,
                    TaskProgress::completed(summary.total, summary.message.clone(), url.clone()),
                )
                .await;
                self.emit_event(Event::TaskCompleted {
                    id: id.clone(),
                    download_url: url,
                });
                tracing::info!(
                    task_id = %id,
                    succeeded = summary.succeeded,
                    failed = summary.failed,
                    "task completed"
                );
            }
            Err(e) => {
                let message = batch_error_message(&e);
                tracing::error!(task_id = %id, error = %e, "packaging failed");
                self.set_progress(id, TaskProgress::failed(message.clone()))
                    .await;
                self.emit_event(Event::TaskFailed {
                    id: id.clone(),
                    message,
                });
            }
        }
    }
}
