//! Result packaging
//!
//! Archives a task's output directory into `instagram_download_{task_id}.zip` next
//! to it, with entry names relative to the task directory.

use crate::error::{Error, Result};
use crate::types::TaskId;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Prefix of every packaged archive name
pub const ARCHIVE_PREFIX: &str = "instagram_download_";

/// File name of the archive for a task
pub fn archive_name(task_id: &TaskId) -> String {
    format!("{ARCHIVE_PREFIX}{task_id}.zip")
}

/// URL path under which the archive is served
pub fn download_url(task_id: &TaskId) -> String {
    format!("/download/{}", archive_name(task_id))
}

/// Zip `source_dir` into `output_root/instagram_download_{task_id}.zip`
///
/// Runs on the blocking pool. An existing archive with the same name is replaced.
pub async fn package_task_output(
    source_dir: &Path,
    output_root: &Path,
    task_id: &TaskId,
) -> Result<PathBuf> {
    let source = source_dir.to_path_buf();
    let archive = output_root.join(archive_name(task_id));
    let target = archive.clone();

    let entries = tokio::task::spawn_blocking(move || write_archive(&source, &target))
        .await
        .map_err(|e| Error::Other(format!("packaging task failed: {}", e)))??;

    info!(task_id = %task_id, ?archive, entries, "task output packaged");
    Ok(archive)
}

/// Write every file below `source` into a new archive at `archive`
///
/// Returns the number of file entries written.
pub(crate) fn write_archive(source: &Path, archive: &Path) -> Result<usize> {
    let packaging_error = |reason: String| Error::Packaging {
        path: archive.to_path_buf(),
        reason,
    };

    if !source.is_dir() {
        return Err(Error::Packaging {
            path: source.to_path_buf(),
            reason: "source directory does not exist".to_string(),
        });
    }

    let file = File::create(archive)
        .map_err(|e| packaging_error(format!("failed to create archive: {}", e)))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entries = 0;
    for entry in WalkDir::new(source).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| packaging_error(format!("failed to walk output: {}", e)))?;
        let path = entry.path();
        // The archive may live inside the tree being packed
        if path == archive {
            continue;
        }
        let Ok(relative) = path.strip_prefix(source) else {
            continue;
        };
        let name = entry_name(relative);

        if entry.file_type().is_dir() {
            zip.add_directory(name, options)
                .map_err(|e| packaging_error(format!("failed to add directory: {}", e)))?;
            continue;
        }

        debug!(entry = %name, "adding file to archive");
        zip.start_file(name, options)
            .map_err(|e| packaging_error(format!("failed to start entry: {}", e)))?;
        let mut input = File::open(path)
            .map_err(|e| packaging_error(format!("failed to open {}: {}", path.display(), e)))?;
        std::io::copy(&mut input, &mut zip)
            .map_err(|e| packaging_error(format!("failed to write {}: {}", path.display(), e)))?;
        entries += 1;
    }

    let mut writer = zip
        .finish()
        .map_err(|e| packaging_error(format!("failed to finish archive: {}", e)))?;
    writer
        .flush()
        .map_err(|e| packaging_error(format!("failed to flush archive: {}", e)))?;
    Ok(entries)
}

/// Archive entry name: path components joined with `/`
fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
