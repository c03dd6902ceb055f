//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the insta-batch-dl REST API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the insta-batch-dl REST API
///
/// The spec can be accessed via:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "insta-batch-dl REST API",
        version = "0.1.0",
        description = "Upload a table of Instagram post links, follow the batch progress and download the packaged archive",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:5001", description = "Local development server")
    ),
    paths(
        // Tasks
        crate::api::routes::upload,
        crate::api::routes::get_progress,
        crate::api::routes::list_tasks,

        // Files
        crate::api::routes::download_file,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        crate::types::TaskId,
        crate::types::Event,
        crate::progress::TaskProgress,
        crate::progress::TaskStatus,
        crate::api::routes::UploadResponse,
        crate::api::routes::TaskSummary,
        crate::error::ApiError,
        crate::error::CredentialState,
    )),
    tags(
        (name = "tasks", description = "Batch tasks - Upload a table and follow its progress"),
        (name = "files", description = "Files - Fetch packaged archives"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec, events"),
    )
)]
pub struct ApiDoc;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_has_every_route() {
        let spec = ApiDoc::openapi();

        for path in [
            "/upload",
            "/progress/{task_id}",
            "/tasks",
            "/download/{filename}",
            "/health",
            "/openapi.json",
            "/events",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing path {path}");
        }
    }

    #[test]
    fn test_openapi_spec_has_components() {
        let spec = ApiDoc::openapi();
        let components = spec.components.expect("components");

        for schema in ["TaskProgress", "TaskStatus", "UploadResponse", "ApiError"] {
            assert!(
                components.schemas.contains_key(schema),
                "missing schema {schema}"
            );
        }
    }

    #[test]
    fn test_openapi_spec_has_tags() {
        let spec = ApiDoc::openapi();
        let tags = spec.tags.unwrap();
        let tag_names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(tag_names, vec!["tasks", "files", "system"]);
    }

    #[test]
    fn test_openapi_spec_info() {
        let spec = ApiDoc::openapi();

        assert_eq!(spec.info.title, "insta-batch-dl REST API");
        assert!(spec.info.description.is_some());
    }

    #[test]
    fn test_openapi_json_serialization() {
        let spec = ApiDoc::openapi();

        let json = serde_json::to_value(&spec).expect("Should serialize to JSON");
        let version = json.get("openapi").and_then(|v| v.as_str()).unwrap();
        assert!(version.starts_with("3."), "Should use OpenAPI 3.x version");
    }
}
