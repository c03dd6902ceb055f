use super::*;
use crate::progress::TaskStatus;

#[tokio::test]
async fn upload_starts_task_and_progress_reaches_completed() {
    let (app, downloader, _temp_dir) = test_app();

    let response = app
        .clone()
        .oneshot(upload_request("file", "posts.csv", SAMPLE_CSV.as_bytes()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "다운로드를 시작했습니다");
    let task_id = TaskId::new(json["task_id"].as_str().unwrap());

    wait_for_terminal(&downloader, &task_id).await;

    let response = app
        .oneshot(get(&format!("/progress/{task_id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "completed");
    assert_eq!(json["progress"], 100);
    assert_eq!(json["total"], 3);
    assert_eq!(
        json["download_url"],
        format!("/download/instagram_download_{task_id}.zip")
    );
}

#[tokio::test]
async fn upload_without_file_field_is_rejected() {
    let (app, _downloader, _temp_dir) = test_app();

    let response = app
        .oneshot(upload_request("attachment", "posts.csv", SAMPLE_CSV.as_bytes()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "파일이 없습니다");
}

#[tokio::test]
async fn upload_with_empty_file_name_is_rejected() {
    let (app, downloader, _temp_dir) = test_app();

    let response = app
        .oneshot(upload_request("file", "", SAMPLE_CSV.as_bytes()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "파일이 선택되지 않았습니다");
    assert!(downloader.list_tasks().await.unwrap().is_empty());
}

#[tokio::test]
async fn upload_with_unsupported_extension_is_rejected() {
    let (app, downloader, _temp_dir) = test_app();

    let response = app
        .oneshot(upload_request("file", "notes.txt", b"hello"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "엑셀, CSV, Numbers 파일만 업로드 가능합니다"
    );
    assert!(downloader.list_tasks().await.unwrap().is_empty());
}

#[tokio::test]
async fn upload_after_shutdown_is_unavailable() {
    let (app, downloader, _temp_dir) = test_app();
    downloader.shutdown().await.unwrap();

    let response = app
        .oneshot(upload_request("file", "posts.csv", SAMPLE_CSV.as_bytes()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["code"], "shutting_down");
}

#[tokio::test]
async fn unknown_task_progress_is_not_found() {
    let (app, _downloader, _temp_dir) = test_app();

    let response = app.oneshot(get("/progress/19990101_000000")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "작업을 찾을 수 없습니다");
}

#[tokio::test]
async fn task_list_includes_uploaded_task() {
    let (app, downloader, _temp_dir) = test_app();

    let task_id = downloader
        .submit_upload("posts.csv", SAMPLE_CSV.as_bytes())
        .await
        .unwrap();
    let progress = wait_for_terminal(&downloader, &task_id).await;
    assert_eq!(progress.status, TaskStatus::Completed);

    let response = app.oneshot(get("/tasks")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let tasks = json.as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["task_id"], task_id.as_str());
    assert_eq!(tasks[0]["status"], "completed");
}
