//! REST API server example
//!
//! Runs insta-batch-dl with the REST API enabled, the way the upload page talks
//! to it.
//!
//! After starting, you can:
//! - View Swagger UI at http://localhost:5001/swagger-ui
//! - Upload a table via POST http://localhost:5001/upload
//! - Poll progress via GET http://localhost:5001/progress/{task_id}
//! - Stream events via GET http://localhost:5001/events
//!
//! Pass a JSON config file as the first argument to override the defaults.

use insta_batch_dl::{Config, PostDownloader, run_with_shutdown};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = match std::env::args().nth(1) {
        Some(path) => Config::from_json_file(&PathBuf::from(path))?,
        None => Config::default(),
    };
    config.server.api.swagger_ui = true;
    config.paths.database_path.get_or_insert_with(|| "tasks.db".into());

    let downloader = Arc::new(PostDownloader::new(config).await?);
    let address = downloader.get_config().server.api.bind_address;

    println!("Starting insta-batch-dl REST API server on {address}");
    println!("Swagger UI: http://localhost:{}/swagger-ui", address.port());
    println!();
    println!("Example commands:");
    println!("  # Upload a table");
    println!("  curl -F 'file=@posts.xlsx' http://localhost:{}/upload", address.port());
    println!();
    println!("  # Poll a task");
    println!("  curl http://localhost:{}/progress/<task_id>", address.port());
    println!();
    println!("  # Stream events (Server-Sent Events)");
    println!("  curl -N http://localhost:{}/events", address.port());

    let api_handle = downloader.spawn_api_server();

    // Blocks until SIGINT/SIGTERM, then lets running tasks finish
    run_with_shutdown((*downloader).clone()).await?;
    api_handle.abort();

    Ok(())
}
