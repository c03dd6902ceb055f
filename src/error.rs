//! Error types for insta-batch-dl
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (input reading, retrieval, database)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes
//!
//! Structural errors ([`InputError`]) abort a batch before any row is processed.
//! Retrieval errors ([`RetrievalError`]) only ever fail a single row.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for insta-batch-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for insta-batch-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "retrieval.timeout")
        key: Option<String>,
    },

    /// Input file could not be turned into rows
    #[error(transparent)]
    Input(#[from] InputError),

    /// A single post could not be retrieved
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Task or file not found
    #[error("{0}")]
    NotFound(String),

    /// Shutdown in progress - not accepting new tasks
    #[error("shutdown in progress: not accepting new tasks")]
    ShuttingDown,

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Packaging the task output into an archive failed
    #[error("packaging failed for {path}: {reason}")]
    Packaging {
        /// Directory or archive path involved
        path: PathBuf,
        /// The reason packaging failed
        reason: String,
    },

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Errors raised while reading the uploaded table
///
/// Display strings are user-facing and end up verbatim in the task's progress message.
#[derive(Debug, Error)]
pub enum InputError {
    /// File extension or embedded payload is not supported
    #[error("{message}")]
    UnsupportedFormat {
        /// The offending input file
        path: PathBuf,
        /// User-facing explanation
        message: String,
    },

    /// A required column is absent from the header row
    #[error("파일에 \"{column}\" 컬럼이 없습니다. (필수: Link, Id, Date)")]
    MissingColumn {
        /// Name of the missing column
        column: String,
    },

    /// Delimited text could not be parsed
    #[error("CSV 파싱 실패 ({path}): {reason}")]
    Csv {
        /// The offending input file
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// Spreadsheet could not be opened or read
    #[error("엑셀 파일 읽기 실패 ({path}): {reason}")]
    Spreadsheet {
        /// The offending input file
        path: PathBuf,
        /// Reader message
        reason: String,
    },
}

/// Whether a stored session-credential file was available to the failing strategy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CredentialState {
    /// No credential file on disk
    Missing,
    /// Credential file exists but was rejected upstream
    Rejected,
}

/// Errors from a single retrieval attempt
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RetrievalError {
    /// URL does not contain a recognizable post shortcode
    #[error("Invalid Instagram URL: {url}")]
    InvalidReference {
        /// The URL as it appeared in the row
        url: String,
    },

    /// Upstream requires a logged-in session
    #[error("{}", auth_message(.credentials))]
    AuthRequired {
        /// Whether credentials were present when the request was rejected
        credentials: CredentialState,
    },

    /// External downloader binary is not installed or could not be launched
    #[error("gallery-dl이 설치되지 않았습니다. pip install gallery-dl 실행 후 다시 시도하세요.")]
    ToolMissing,

    /// Subprocess exceeded its time budget and was killed
    #[error("다운로드 시간 초과 ({}s)", .after.as_secs())]
    Timeout {
        /// The configured timeout that elapsed
        after: Duration,
    },

    /// Any other retrieval failure
    #[error("다운로드 실패: {reason}")]
    DownloadFailed {
        /// Diagnostic detail (truncated tool output, HTTP status, ...)
        reason: String,
    },
}

fn auth_message(credentials: &CredentialState) -> &'static str {
    match credentials {
        CredentialState::Missing => {
            "쿠키 파일이 필요합니다. 브라우저에서 instagram_cookies.txt를 내보내세요"
        }
        CredentialState::Rejected => {
            "쿠키가 만료되었습니다. instagram_cookies.txt를 다시 내보내세요"
        }
    }
}

impl RetrievalError {
    /// Shorthand for [`RetrievalError::DownloadFailed`]
    pub fn failed(reason: impl Into<String>) -> Self {
        RetrievalError::DownloadFailed {
            reason: reason.into(),
        }
    }

    /// Machine-readable kind, used in logs and failure records
    pub fn kind(&self) -> &'static str {
        match self {
            RetrievalError::InvalidReference { .. } => "invalid_reference",
            RetrievalError::AuthRequired { .. } => "auth_required",
            RetrievalError::ToolMissing => "tool_missing",
            RetrievalError::Timeout { .. } => "timeout",
            RetrievalError::DownloadFailed { .. } => "download_failed",
        }
    }
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Stored row could not be decoded
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// API error response body
///
/// `error` carries the user-facing message so clients that only read that field
/// keep working; `code` is machine-readable.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": "작업을 찾을 수 없습니다",
///   "code": "not_found"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Human-readable error message
    pub error: String,

    /// Machine-readable error code (e.g., "not_found", "unsupported_format")
    pub code: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: code.into(),
            details: None,
        }
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            Error::Config { .. } => 400,
            Error::Input(InputError::UnsupportedFormat { .. }) => 400,
            Error::Input(_) => 422,
            Error::Retrieval(RetrievalError::InvalidReference { .. }) => 422,
            Error::Retrieval(RetrievalError::AuthRequired { .. }) => 401,
            Error::Retrieval(RetrievalError::Timeout { .. }) => 504,
            Error::Retrieval(RetrievalError::ToolMissing) => 503,
            Error::Retrieval(RetrievalError::DownloadFailed { .. }) => 502,
            Error::NotFound(_) => 404,
            Error::ShuttingDown => 503,
            Error::Network(_) => 502,
            Error::Database(_)
            | Error::Sqlx(_)
            | Error::Io(_)
            | Error::Serialization(_)
            | Error::Packaging { .. }
            | Error::ApiServerError(_)
            | Error::Other(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Input(e) => match e {
                InputError::UnsupportedFormat { .. } => "unsupported_format",
                InputError::MissingColumn { .. } => "missing_column",
                InputError::Csv { .. } => "csv_error",
                InputError::Spreadsheet { .. } => "spreadsheet_error",
            },
            Error::Retrieval(e) => e.kind(),
            Error::Database(_) | Error::Sqlx(_) => "database_error",
            Error::Io(_) => "io_error",
            Error::NotFound(_) => "not_found",
            Error::ShuttingDown => "shutting_down",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::Packaging { .. } => "packaging_failed",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Input(InputError::UnsupportedFormat { path, .. }) => {
                Some(serde_json::json!({ "path": path }))
            }
            Error::Input(InputError::MissingColumn { column }) => {
                Some(serde_json::json!({ "column": column }))
            }
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({ "key": key })),
            Error::Packaging { path, .. } => Some(serde_json::json!({ "path": path })),
            _ => None,
        };

        ApiError {
            error: message,
            code,
            details,
        }
    }
}
