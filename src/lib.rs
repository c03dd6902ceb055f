//! # insta-batch-dl
//!
//! Batch downloader for Instagram posts listed in a spreadsheet.
//!
//! A task reads a table with `Link`, `Id` and `Date` columns (CSV, Excel or an
//! Apple Numbers export), downloads every post into
//! `<user>/<date>/` folders, writes a caption file per post and a failure report
//! for rows that could not be fetched, then zips the whole output for download.
//!
//! ## Overview
//!
//! - **Two retrieval strategies** - the `gallery-dl` tool first, an authenticated
//!   web API client as fallback
//! - **Pollable progress** - every task has a snapshot that moves from
//!   `processing` to exactly one of `completed` or `error`
//! - **Event-driven** - consumers can subscribe to task events instead of polling
//! - **REST API** - upload, progress, download and a server-sent event stream
//!
//! ## Quick Start
//!
//! ```no_run
//! use insta_batch_dl::{Config, PostDownloader};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = PostDownloader::new(Config::default()).await?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let task_id = downloader.start_task(Path::new("posts.xlsx")).await?;
//!     println!("started {task_id}");
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Row-by-row batch processing
pub mod batch;
/// Configuration types
pub mod config;
/// Date cell normalization
pub mod date;
/// SQLite progress persistence
pub mod db;
/// Task runner (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Table readers (CSV, Excel, Numbers)
pub mod input;
/// Output archive packaging
pub mod packaging;
/// Task progress snapshots and stores
pub mod progress;
/// Post retrieval strategies
pub mod retrieval;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use batch::{BatchProcessor, BatchSummary, FailureKind, FailureRecord};
pub use config::{Config, FallbackPolicy};
pub use db::Database;
pub use downloader::PostDownloader;
pub use error::{
    ApiError, CredentialState, DatabaseError, Error, InputError, Result, RetrievalError,
    ToHttpStatus,
};
pub use input::{Row, Table, read_table};
pub use progress::{MemoryProgressStore, ProgressStore, TaskProgress, TaskStatus};
pub use retrieval::{
    GalleryDlStrategy, PostReference, RetrievalEngine, RetrievalStrategy, WebApiStrategy,
};
pub use types::{Event, TaskId};

/// Helper function to run the downloader with graceful signal handling.
///
/// Waits for a termination signal and then calls the runner's `shutdown()` method,
/// which lets running tasks finish (or fails them after the shutdown timeout).
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use insta_batch_dl::{Config, PostDownloader, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::default();
///     let downloader = PostDownloader::new(config).await?;
///
///     // Run with automatic signal handling
///     run_with_shutdown(downloader).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: PostDownloader) -> Result<()> {
    wait_for_signal().await;
    downloader.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
