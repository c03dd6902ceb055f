//! Numbers bundle reader
//!
//! A `.numbers` document is a ZIP archive. Some exports carry a CSV rendition of the
//! sheet inside the bundle; that payload is the only part we can read.

use super::Table;
use super::delimited::parse_csv_bytes;
use crate::error::InputError;
use crate::utils::extension_lower;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Shown when a bundle has nothing we can read
pub const NUMBERS_UNSUPPORTED_MESSAGE: &str =
    "Numbers 파일 형식을 지원하지 않습니다. 엑셀이나 CSV로 내보내기 해주세요";

/// Read a `.numbers` bundle through its embedded CSV payload
///
/// The bundle is extracted into a temporary directory that is removed when this
/// function returns, whether or not a payload was found.
pub fn read_numbers(path: &Path) -> Result<Table, InputError> {
    let unsupported = || InputError::UnsupportedFormat {
        path: path.to_path_buf(),
        message: NUMBERS_UNSUPPORTED_MESSAGE.to_string(),
    };

    let temp_dir = tempfile::tempdir().map_err(|e| {
        warn!(?path, error = %e, "failed to create extraction directory");
        unsupported()
    })?;

    if let Err(reason) = extract_bundle(path, temp_dir.path()) {
        warn!(?path, %reason, "numbers bundle extraction failed");
        return Err(unsupported());
    }

    let Some(payload) = find_csv_payload(temp_dir.path()) else {
        debug!(?path, "no embedded csv payload in numbers bundle");
        return Err(unsupported());
    };

    debug!(?path, ?payload, "reading embedded csv payload");
    let bytes = std::fs::read(&payload).map_err(|e| InputError::Csv {
        path: path.to_path_buf(),
        reason: format!("failed to read embedded payload: {}", e),
    })?;
    parse_csv_bytes(&bytes, path)
}

/// Extract every entry of a ZIP archive below `dest`
fn extract_bundle(archive_path: &Path, dest: &Path) -> Result<usize, String> {
    let file = std::fs::File::open(archive_path)
        .map_err(|e| format!("failed to open bundle: {}", e))?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| format!("failed to read bundle: {}", e))?;

    let mut extracted = 0;
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| format!("failed to read entry: {}", e))?;

        let Some(relative) = entry.enclosed_name().map(Path::to_path_buf) else {
            warn!("skipping entry with unsafe path");
            continue;
        };
        let target = dest.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&target)
                .map_err(|e| format!("failed to create directory: {}", e))?;
            continue;
        }

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("failed to create parent directories: {}", e))?;
        }
        let mut out = std::fs::File::create(&target)
            .map_err(|e| format!("failed to create output file: {}", e))?;
        std::io::copy(&mut entry, &mut out)
            .map_err(|e| format!("failed to extract file: {}", e))?;
        extracted += 1;
    }

    Ok(extracted)
}

/// First `.csv` file in the tree, in sorted walk order
fn find_csv_payload(root: &Path) -> Option<PathBuf> {
    walkdir::WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .find(|path| extension_lower(path).as_deref() == Some("csv"))
}
