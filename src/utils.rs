//! Utility functions for file operations and path manipulation

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Characters that are not allowed in a path segment on common filesystems
const RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Make a string safe to use as a single path segment
///
/// Every character in `< > : " / \ | ? *` is replaced with `_`. Everything else,
/// including whitespace and non-ASCII text, is kept as-is.
///
/// # Examples
///
/// ```
/// use insta_batch_dl::utils::sanitize_filename;
///
/// assert_eq!(sanitize_filename("a/b:c*d"), "a_b_c_d");
/// assert_eq!(sanitize_filename("홍길동"), "홍길동");
/// ```
#[must_use]
pub fn sanitize_filename(text: &str) -> String {
    text.chars()
        .map(|c| if RESERVED_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// Lowercased extension of a path, if any
pub(crate) fn extension_lower(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}

/// Whether a file name looks like a structured-metadata sidecar
pub(crate) fn is_json_sidecar(name: &str) -> bool {
    name.to_lowercase().ends_with(".json")
}

/// Whether a file name looks like a text or metadata sidecar
pub(crate) fn is_text_sidecar(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.ends_with(".txt") || lower.ends_with(".json")
}

/// Move `source` into `dir`, keeping its file name
///
/// An existing file with the same name is replaced. Falls back to copy+remove when
/// a rename across filesystems is refused.
pub(crate) fn move_into_dir(source: &Path, dir: &Path) -> std::io::Result<PathBuf> {
    let file_name = source.file_name().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("path has no file name: {}", source.display()),
        )
    })?;
    let target = dir.join(file_name);
    if target == source {
        return Ok(target);
    }

    match std::fs::rename(source, &target) {
        Ok(()) => Ok(target),
        Err(e) => {
            debug!(?source, ?target, error = %e, "rename failed, copying instead");
            std::fs::copy(source, &target)?;
            std::fs::remove_file(source)?;
            Ok(target)
        }
    }
}

/// Remove empty directories below `root` (never `root` itself)
///
/// Failures are logged and otherwise ignored.
pub(crate) fn remove_empty_subdirs(root: &Path) {
    let dirs: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .min_depth(1)
        .contents_first(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir())
        .map(|entry| entry.into_path())
        .collect();

    for dir in dirs {
        let is_empty = std::fs::read_dir(&dir)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if is_empty && let Err(e) = std::fs::remove_dir(&dir) {
            warn!(?dir, error = %e, "failed to remove empty directory");
        }
    }
}

/// Truncate diagnostic output to at most `max_chars` characters
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
