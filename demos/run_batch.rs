//! Run one batch task without the HTTP layer
//!
//! ```text
//! cargo run --example run_batch -- posts.xlsx
//! ```
//!
//! Prints every task event and the archive location when the task is done.

use insta_batch_dl::{Config, Event, PostDownloader, TaskStatus};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let Some(input) = std::env::args().nth(1).map(PathBuf::from) else {
        eprintln!("usage: run_batch <table.csv|xlsx|xls|numbers>");
        std::process::exit(2);
    };

    let downloader = PostDownloader::new(Config::default()).await?;
    let mut events = downloader.subscribe();

    let task_id = downloader.start_task(&input).await?;
    println!("task {task_id} started");

    loop {
        match events.recv().await {
            Ok(Event::RowFinished { id, row, success }) if id == task_id => {
                println!("row {row}: {}", if success { "ok" } else { "failed" });
            }
            Ok(Event::Progress { id, progress }) if id == task_id => {
                println!("[{:>3}%] {}", progress.progress, progress.message);
            }
            Ok(Event::TaskCompleted { id, .. } | Event::TaskFailed { id, .. }) if id == task_id => {
                break;
            }
            Ok(_) => {}
            Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        }
    }

    let progress = downloader.progress(&task_id).await?;
    match progress.status {
        TaskStatus::Completed => {
            let archive = downloader
                .get_config()
                .paths
                .output_dir
                .join(insta_batch_dl::packaging::archive_name(&task_id));
            println!("{}", progress.message);
            println!("archive: {}", archive.display());
        }
        _ => println!("task failed: {}", progress.message),
    }

    downloader.shutdown().await?;
    Ok(())
}
