//! Accepting uploads and allocating task ids.

use crate::error::{Error, InputError, Result};
use crate::progress::TaskProgress;
use crate::types::{Event, TaskId};
use crate::utils::{extension_lower, sanitize_filename};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

use super::PostDownloader;

/// Rejection for an upload without a file name
pub const MESSAGE_EMPTY_FILE_NAME: &str = "파일이 선택되지 않았습니다";

/// Rejection for an upload with an unsupported extension
pub const MESSAGE_UNSUPPORTED_UPLOAD: &str = "엑셀, CSV, Numbers 파일만 업로드 가능합니다";

const UPLOAD_EXTENSIONS: [&str; 4] = ["xlsx", "xls", "csv", "numbers"];

/// Check an uploaded file name and return the name it is stored under
///
/// Any directory part a client sent is dropped and reserved characters are
/// replaced. Accepted extensions are `.xlsx`, `.xls`, `.csv` and `.numbers`
/// (case-insensitive).
///
/// # Examples
///
/// ```
/// use insta_batch_dl::downloader::validate_upload_name;
///
/// assert_eq!(validate_upload_name("C:\\Users\\me\\links.xlsx").unwrap(), "links.xlsx");
/// assert!(validate_upload_name("notes.txt").is_err());
/// ```
pub fn validate_upload_name(filename: &str) -> Result<String> {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if base.is_empty() {
        return Err(Error::Input(InputError::UnsupportedFormat {
            path: PathBuf::from(filename),
            message: MESSAGE_EMPTY_FILE_NAME.to_string(),
        }));
    }

    let accepted = extension_lower(Path::new(base))
        .is_some_and(|ext| UPLOAD_EXTENSIONS.contains(&ext.as_str()));
    if !accepted {
        return Err(Error::Input(InputError::UnsupportedFormat {
            path: PathBuf::from(filename),
            message: MESSAGE_UNSUPPORTED_UPLOAD.to_string(),
        }));
    }

    Ok(sanitize_filename(base))
}

impl PostDownloader {
    /// Persist an uploaded table and start processing it
    ///
    /// The file is stored as `uploads/{task_id}_{name}`, `output/{task_id}/` is
    /// created, and the worker is spawned before this returns.
    ///
    /// # Errors
    ///
    /// - [`Error::ShuttingDown`] once [`shutdown`](Self::shutdown) has begun
    /// - [`Error::Input`] for an empty name or an unsupported extension
    /// - [`Error::Io`] if the upload cannot be written
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
    ///     let bytes = std::fs::read("links.xlsx")?;
    ///     let task_id = downloader.submit_upload("links.xlsx", &bytes).await?;
    ///     println!("started {task_id}");
    ///     Ok(())
    /// }
    /// ```
    pub async fn submit_upload(&self, filename: &str, bytes: &[u8]) -> Result<TaskId> {
        self.ensure_accepting()?;
        let stored_name = validate_upload_name(filename)?;

        let id = self.reserve_task_id().await?;

        let upload_dir = self.config.paths.upload_dir.clone();
        let input_path = upload_dir.join(format!("{}_{}", id, stored_name));
        let persisted = async {
            tokio::fs::create_dir_all(&upload_dir).await?;
            tokio::fs::write(&input_path, bytes).await
        }
        .await;
        if let Err(e) = persisted {
            tracing::error!(task_id = %id, path = ?input_path, error = %e, "failed to save upload");
            self.set_progress(&id, TaskProgress::failed(format!("처리 중 오류 발생: {e}")))
                .await;
            return Err(Error::Io(e));
        }

        tracing::info!(
            task_id = %id,
            path = ?input_path,
            bytes = bytes.len(),
            "upload saved"
        );
        self.launch(id.clone(), input_path).await;
        Ok(id)
    }

    /// Start processing a table that is already on disk
    ///
    /// # Errors
    ///
    /// - [`Error::ShuttingDown`] once [`shutdown`](Self::shutdown) has begun
    /// - [`Error::NotFound`] if `input_path` does not exist
    /// - [`Error::Input`] for an unsupported extension
    pub async fn start_task(&self, input_path: &Path) -> Result<TaskId> {
        self.ensure_accepting()?;

        if !tokio::fs::try_exists(input_path).await.unwrap_or(false) {
            return Err(Error::NotFound(format!(
                "input file not found: {}",
                input_path.display()
            )));
        }
        let name = input_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        validate_upload_name(&name)?;

        let id = self.reserve_task_id().await?;
        self.launch(id.clone(), input_path.to_path_buf()).await;
        Ok(id)
    }

    fn ensure_accepting(&self) -> Result<()> {
        if self.tracking.accepting_new.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::ShuttingDown)
        }
    }

    /// Allocate a fresh id, create its output directory and store `started`
    ///
    /// Allocation is serialized; the initial snapshot is written before the lock
    /// is released, so a concurrent upload in the same second sees the key taken.
    async fn reserve_task_id(&self) -> Result<TaskId> {
        let _guard = self.tracking.id_lock.lock().await;

        let base = TaskId::from_now();
        let mut id = base.clone();
        let mut n = 1;
        while self.task_id_taken(&id).await? {
            n += 1;
            id = base.with_suffix(n);
        }

        let task_dir = self.config.paths.output_dir.join(id.as_str());
        tokio::fs::create_dir_all(&task_dir).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create task directory '{}': {}",
                    task_dir.display(),
                    e
                ),
            ))
        })?;

        self.set_progress(&id, TaskProgress::started()).await;
        tracing::debug!(task_id = %id, "task id reserved");
        Ok(id)
    }

    async fn task_id_taken(&self, id: &TaskId) -> Result<bool> {
        if self.store.contains(id).await? {
            return Ok(true);
        }
        let task_dir = self.config.paths.output_dir.join(id.as_str());
        Ok(tokio::fs::try_exists(&task_dir).await.unwrap_or(false))
    }

    /// Spawn the worker and announce the task
    async fn launch(&self, id: TaskId, input_path: PathBuf) {
        self.spawn_task(id.clone(), input_path).await;
        self.emit_event(Event::TaskQueued { id });
    }
}
