//! Failure report file

use super::FailureRecord;
use std::path::{Path, PathBuf};

/// Report written at the output root when any row failed
pub const FAILURE_REPORT_NAME: &str = "실패한_링크.txt";

/// Render the report: header, rule, blank line, one line per failure
pub fn render_failure_report(failures: &[FailureRecord]) -> String {
    let mut out = format!("실패한 링크 목록 ({}개)\n", failures.len());
    out.push_str(&"=".repeat(80));
    out.push_str("\n\n");
    for record in failures {
        out.push_str(&record.report_line());
        out.push('\n');
    }
    out
}

/// Write the report into `output_root`
pub async fn write_failure_report(
    output_root: &Path,
    failures: &[FailureRecord],
) -> std::io::Result<PathBuf> {
    let path = output_root.join(FAILURE_REPORT_NAME);
    tokio::fs::write(&path, render_failure_report(failures)).await?;
    Ok(path)
}
