//! Upload and progress handlers.

use super::{TaskSummary, UploadResponse};
use crate::api::AppState;
use crate::error::ApiError;
use crate::types::TaskId;
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Rejection when the multipart body has no `file` field
pub const MESSAGE_NO_FILE: &str = "파일이 없습니다";

/// Success message of POST /upload
pub const MESSAGE_UPLOAD_STARTED: &str = "다운로드를 시작했습니다";

/// POST /upload - Upload a table and start a task
#[utoipa::path(
    post,
    path = "/upload",
    tag = "tasks",
    request_body(content = Vec<u8>, description = "Spreadsheet upload in field `file` (multipart/form-data)", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Task started", body = UploadResponse),
        (status = 400, description = "No file, empty file name or unsupported extension", body = ApiError),
        (status = 503, description = "Shutting down", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut upload: Option<(String, Vec<u8>)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ApiError::validation(format!("Invalid multipart body: {}", e))),
                )
                    .into_response();
            }
        };

        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        match field.bytes().await {
            Ok(bytes) => upload = Some((filename, bytes.to_vec())),
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ApiError::validation(format!("Failed to read file: {}", e))),
                )
                    .into_response();
            }
        }
    }

    let Some((filename, bytes)) = upload else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiError::new("missing_file", MESSAGE_NO_FILE)),
        )
            .into_response();
    };

    match state.downloader.submit_upload(&filename, &bytes).await {
        Ok(task_id) => (
            StatusCode::OK,
            Json(UploadResponse {
                success: true,
                task_id,
                message: MESSAGE_UPLOAD_STARTED.to_string(),
            }),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /progress/:task_id - Current progress of a task
#[utoipa::path(
    get,
    path = "/progress/{task_id}",
    tag = "tasks",
    params(
        ("task_id" = String, Path, description = "Task key returned by /upload")
    ),
    responses(
        (status = 200, description = "Progress snapshot", body = crate::progress::TaskProgress),
        (status = 404, description = "Unknown task", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn get_progress(State(state): State<AppState>, Path(task_id): Path<String>) -> Response {
    match state.downloader.progress(&TaskId::new(task_id)).await {
        Ok(progress) => (StatusCode::OK, Json(progress)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /tasks - Every known task
#[utoipa::path(
    get,
    path = "/tasks",
    tag = "tasks",
    responses(
        (status = 200, description = "All tasks ordered by id", body = Vec<TaskSummary>),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn list_tasks(State(state): State<AppState>) -> Response {
    match state.downloader.list_tasks().await {
        Ok(tasks) => {
            let summaries: Vec<TaskSummary> = tasks
                .into_iter()
                .map(|(task_id, progress)| TaskSummary { task_id, progress })
                .collect();
            (StatusCode::OK, Json(summaries)).into_response()
        }
        Err(e) => e.into_response(),
    }
}
