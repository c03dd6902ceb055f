//! Task runner split into focused submodules.
//!
//! The `PostDownloader` struct and its methods are organized by concern:
//! - [`upload`] - Accepting inputs and allocating task ids
//! - [`tasks`] - The per-task worker (batch, packaging, terminal state)
//! - [`lifecycle`] - Graceful shutdown

mod lifecycle;
mod tasks;
mod upload;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use lifecycle::{MESSAGE_ABORTED, SHUTDOWN_TIMEOUT};
pub use upload::{MESSAGE_EMPTY_FILE_NAME, MESSAGE_UNSUPPORTED_UPLOAD, validate_upload_name};

use crate::config::Config;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::progress::{MemoryProgressStore, ProgressStore, TaskProgress};
use crate::retrieval::RetrievalEngine;
use crate::types::{Event, TaskId};

/// Message returned when a task id is unknown
pub const MESSAGE_TASK_NOT_FOUND: &str = "작업을 찾을 수 없습니다";

/// Message stored for tasks a previous process left unfinished
pub const MESSAGE_INTERRUPTED: &str = "서버가 재시작되어 작업이 중단되었습니다";

/// Running workers and admission control
#[derive(Clone)]
pub(crate) struct TaskTracking {
    /// Workers that have not finished yet (each removes itself on exit)
    pub(crate) active: std::sync::Arc<
        tokio::sync::Mutex<std::collections::HashMap<TaskId, tokio::task::JoinHandle<()>>>,
    >,
    /// Flag to indicate whether new tasks are accepted (set to false during shutdown)
    pub(crate) accepting_new: std::sync::Arc<std::sync::atomic::AtomicBool>,
    /// Serializes task id allocation so two uploads never share a key
    pub(crate) id_lock: std::sync::Arc<tokio::sync::Mutex<()>>,
}

impl TaskTracking {
    fn new() -> Self {
        Self {
            active: std::sync::Arc::new(tokio::sync::Mutex::new(std::collections::HashMap::new())),
            accepting_new: std::sync::Arc::new(std::sync::atomic::AtomicBool::new(true)),
            id_lock: std::sync::Arc::new(tokio::sync::Mutex::new(())),
        }
    }
}

/// Main runner instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct PostDownloader {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: std::sync::Arc<Config>,
    /// Progress store shared by every task and by pollers
    pub(crate) store: std::sync::Arc<dyn ProgressStore>,
    /// Retrieval strategies, built once
    pub(crate) engine: RetrievalEngine,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Worker bookkeeping
    pub(crate) tracking: TaskTracking,
}

impl PostDownloader {
    /// Create a new PostDownloader instance
    ///
    /// This initializes all core components:
    /// - Validates the configuration and creates the upload and output directories
    /// - Opens the SQLite progress database when `paths.database_path` is set, and
    ///   marks tasks a previous process left in `processing` as failed
    /// - Builds the retrieval engine (gallery-dl plus the optional web API client)
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        for dir in [&config.paths.upload_dir, &config.paths.output_dir] {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to create directory '{}': {}", dir.display(), e),
                ))
            })?;
        }

        let store: std::sync::Arc<dyn ProgressStore> = match &config.paths.database_path {
            Some(path) => {
                let db = Database::new(path).await?;
                let interrupted = db.fail_interrupted_tasks(MESSAGE_INTERRUPTED).await?;
                if interrupted > 0 {
                    tracing::warn!(interrupted, "marked unfinished tasks from a previous run as failed");
                }
                std::sync::Arc::new(db)
            }
            None => std::sync::Arc::new(MemoryProgressStore::new()),
        };

        let engine = RetrievalEngine::from_config(&config.retrieval)?;

        Ok(Self::with_components(config, store, engine))
    }

    /// Assemble a runner from an already built store and engine
    ///
    /// No directories are created up front; each task creates what it needs.
    pub fn with_components(
        config: Config,
        store: std::sync::Arc<dyn ProgressStore>,
        engine: RetrievalEngine,
    ) -> Self {
        // Create broadcast channel with buffer size of 1000 events
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

        tracing::info!(
            strategies = ?engine.strategy_names(),
            output_dir = ?config.paths.output_dir,
            "post downloader ready"
        );

        Self {
            config: std::sync::Arc::new(config),
            store,
            engine,
            event_tx,
            tracking: TaskTracking::new(),
        }
    }

    /// Subscribe to task events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// If a subscriber falls behind by more than 1000 events it receives
    /// `RecvError::Lagged`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use insta_batch_dl::{Config, PostDownloader};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let downloader = PostDownloader::new(Config::default()).await?;
    ///
    ///     let mut events = downloader.subscribe();
    ///     tokio::spawn(async move {
    ///         while let Ok(event) = events.recv().await {
    ///             tracing::info!(?event, "task event");
    ///         }
    ///     });
    ///
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> std::sync::Arc<Config> {
        std::sync::Arc::clone(&self.config)
    }

    /// Current progress of a task
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] carrying `작업을 찾을 수 없습니다` for an unknown id.
    pub async fn progress(&self, id: &TaskId) -> Result<TaskProgress> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(MESSAGE_TASK_NOT_FOUND.to_string()))
    }

    /// Every known task, ordered by id
    pub async fn list_tasks(&self) -> Result<Vec<(TaskId, TaskProgress)>> {
        self.store.list().await
    }

    /// Write a snapshot and announce it when the store accepted it
    pub(crate) async fn set_progress(&self, id: &TaskId, progress: TaskProgress) {
        match self.store.set(id, progress.clone()).await {
            Ok(true) => self.emit_event(Event::Progress {
                id: id.clone(),
                progress,
            }),
            Ok(false) => tracing::debug!(task_id = %id, "task already finished, update dropped"),
            Err(e) => tracing::warn!(task_id = %id, error = %e, "failed to store progress"),
        }
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers, the event is silently dropped.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Spawn the REST API server in a background task
    ///
    /// The server listens on the configured bind address (default: 0.0.0.0:5001).
    pub fn spawn_api_server(self: &std::sync::Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let downloader = self.clone();
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(downloader, config).await })
    }
}
