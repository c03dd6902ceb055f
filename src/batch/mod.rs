//! Batch orchestration
//!
//! [`BatchProcessor::run`] reads an input table and downloads its rows strictly one
//! at a time into `output_root/<username>/<yy.mm.dd>/`. A failing row becomes a
//! [`FailureRecord`] and never stops the batch; only a structurally unusable input
//! (unreadable file, missing column) does, and then before any row is touched.

mod report;
mod row;

use crate::error::{Error, InputError, Result};
use crate::input::{REQUIRED_COLUMNS, Table, read_table};
use crate::progress::{ProgressStore, TaskProgress};
use crate::retrieval::RetrievalEngine;
use crate::types::{Event, TaskId};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

pub use report::{FAILURE_REPORT_NAME, render_failure_report, write_failure_report};
pub use row::{CAPTION_FILE_NAME, FailureKind, FailureRecord, RowInput, RowSuccess};

/// Outcome of a whole batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// Rows in the input
    pub total: usize,
    /// Rows whose post was downloaded
    pub succeeded: usize,
    /// Rows that failed
    pub failed: usize,
    /// One record per failed row, in input order
    pub failures: Vec<FailureRecord>,
    /// `완료: {succeeded}개 성공, {failed}개 실패`
    pub message: String,
    /// Report file, written only when something failed
    pub failure_report: Option<PathBuf>,
}

/// User-facing message for a batch-level error
pub fn batch_error_message(err: &Error) -> String {
    match err {
        Error::Input(InputError::MissingColumn { .. }) => err.to_string(),
        other => format!("처리 중 오류 발생: {other}"),
    }
}

/// Drives the rows of one input through the retrieval engine
pub struct BatchProcessor {
    engine: RetrievalEngine,
    store: Arc<dyn ProgressStore>,
    row_delay: Duration,
    event_tx: Option<broadcast::Sender<Event>>,
}

impl BatchProcessor {
    /// Create a processor writing progress into `store`
    pub fn new(engine: RetrievalEngine, store: Arc<dyn ProgressStore>, row_delay: Duration) -> Self {
        Self {
            engine,
            store,
            row_delay,
            event_tx: None,
        }
    }

    /// Also publish progress on an event channel
    pub fn with_events(mut self, event_tx: broadcast::Sender<Event>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    /// Process every row of `input` into `output_root`
    ///
    /// On a structural error the task's progress is set to `error` and the error
    /// is returned. On success the progress is left at the last row; packaging
    /// and the terminal `completed` write belong to the caller.
    pub async fn run(
        &self,
        input: &Path,
        output_root: &Path,
        task_id: &TaskId,
    ) -> Result<BatchSummary> {
        info!(task_id = %task_id, ?input, ?output_root, "batch started");

        let table = match self.load(input).await {
            Ok(table) => table,
            Err(e) => {
                let message = batch_error_message(&e);
                error!(task_id = %task_id, error = %e, "batch aborted before processing rows");
                self.publish(task_id, TaskProgress::failed(message.clone()))
                    .await;
                self.emit(Event::TaskFailed {
                    id: task_id.clone(),
                    message,
                });
                return Err(e);
            }
        };

        let total = table.rows.len();
        self.publish(
            task_id,
            TaskProgress {
                total,
                ..TaskProgress::started()
            },
        )
        .await;

        let mut succeeded = 0;
        let mut failures = Vec::new();

        for (i, row) in table.rows.iter().enumerate() {
            let input = RowInput::from_row(i + 1, row);
            self.publish(task_id, TaskProgress::row(input.idx, total, &input.username))
                .await;

            let outcome = row::process_row(&self.engine, &input, output_root).await;
            let success = outcome.is_ok();
            match outcome {
                Ok(done) => {
                    succeeded += 1;
                    info!(
                        task_id = %task_id,
                        row = input.idx,
                        username = %input.username,
                        date = %input.date,
                        files = done.files.len(),
                        "row downloaded"
                    );
                }
                Err(record) => {
                    warn!(
                        task_id = %task_id,
                        row = input.idx,
                        url = %record.url,
                        detail = record.detail.as_deref().unwrap_or(""),
                        "row failed"
                    );
                    failures.push(record);
                }
            }
            self.emit(Event::RowFinished {
                id: task_id.clone(),
                row: input.idx,
                success,
            });

            if !self.row_delay.is_zero() {
                tokio::time::sleep(self.row_delay).await;
            }
        }

        let failure_report = if failures.is_empty() {
            None
        } else {
            match write_failure_report(output_root, &failures).await {
                Ok(path) => Some(path),
                Err(e) => {
                    let e = Error::Io(e);
                    let message = batch_error_message(&e);
                    error!(task_id = %task_id, error = %e, "failed to write failure report");
                    self.publish(task_id, TaskProgress::failed(message.clone()))
                        .await;
                    self.emit(Event::TaskFailed {
                        id: task_id.clone(),
                        message,
                    });
                    return Err(e);
                }
            }
        };

        let failed = failures.len();
        let summary = BatchSummary {
            total,
            succeeded,
            failed,
            failures,
            message: format!("완료: {succeeded}개 성공, {failed}개 실패"),
            failure_report,
        };
        info!(task_id = %task_id, total, succeeded, failed, "batch finished");
        Ok(summary)
    }

    async fn load(&self, input: &Path) -> Result<Table> {
        let path = input.to_path_buf();
        let table = tokio::task::spawn_blocking(move || read_table(&path))
            .await
            .map_err(|e| Error::Other(format!("input reader task failed: {}", e)))??;
        table.require_columns(&REQUIRED_COLUMNS)?;
        Ok(table)
    }

    async fn publish(&self, task_id: &TaskId, progress: TaskProgress) {
        match self.store.set(task_id, progress.clone()).await {
            Ok(true) => self.emit(Event::Progress {
                id: task_id.clone(),
                progress,
            }),
            Ok(false) => {}
            Err(e) => warn!(task_id = %task_id, error = %e, "failed to store progress"),
        }
    }

    fn emit(&self, event: Event) {
        if let Some(tx) = &self.event_tx {
            // No subscribers is fine
            tx.send(event).ok();
        }
    }
}
