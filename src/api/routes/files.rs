//! Archive download handler.

use crate::api::AppState;
use crate::error::ApiError;
use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

/// Rejection for a name that could leave the output directory
pub const MESSAGE_INVALID_FILE_NAME: &str = "잘못된 파일 이름입니다";

/// Rejection for a file that does not exist
pub const MESSAGE_FILE_NOT_FOUND: &str = "파일을 찾을 수 없습니다";

/// Whether `name` is a single plain path segment
pub(crate) fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['/', '\\']) && !name.contains("..")
}

/// GET /download/:filename - Packaged archive as an attachment
#[utoipa::path(
    get,
    path = "/download/{filename}",
    tag = "files",
    params(
        ("filename" = String, Path, description = "Archive name, e.g. instagram_download_20240101_120000.zip")
    ),
    responses(
        (status = 200, description = "Archive contents", content_type = "application/zip"),
        (status = 400, description = "Name contains a path separator or `..`", body = ApiError),
        (status = 404, description = "No such file", body = ApiError)
    )
)]
pub async fn download_file(State(state): State<AppState>, Path(filename): Path<String>) -> Response {
    if !is_safe_file_name(&filename) {
        tracing::warn!(filename = %filename, "rejected download name");
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiError::validation(MESSAGE_INVALID_FILE_NAME)),
        )
            .into_response();
    }

    let path = state.config.paths.output_dir.join(&filename);
    let is_file = tokio::fs::metadata(&path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false);
    if !is_file {
        return (
            StatusCode::NOT_FOUND,
            Json(ApiError::new("not_found", MESSAGE_FILE_NOT_FOUND)),
        )
            .into_response();
    }

    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let content_type = if filename.to_lowercase().ends_with(".zip") {
                "application/zip"
            } else {
                "application/octet-stream"
            };
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, content_type.to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", filename),
                    ),
                ],
                Body::from(bytes),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!(path = ?path, error = %e, "failed to read download");
            (
                StatusCode::NOT_FOUND,
                Json(ApiError::new("not_found", MESSAGE_FILE_NOT_FOUND)),
            )
                .into_response()
        }
    }
}
