//! Configuration types for insta-batch-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};

/// Where uploads, task output and the optional progress database live
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory uploaded spreadsheets are persisted to (default: "./uploads")
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    /// Root of per-task output directories and packaged archives (default: "./output")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// SQLite file for durable task progress (None = in-memory store)
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            output_dir: default_output_dir(),
            database_path: None,
        }
    }
}

/// When the web API strategy is consulted
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Only the gallery-dl subprocess is used
    Disabled,
    /// The web API client retries a post once gallery-dl has failed on it
    #[default]
    OnFailure,
}

/// Retrieval strategy settings (external tool, credentials, fallback client)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Path to the gallery-dl executable (auto-detected on PATH if None)
    #[serde(default)]
    pub gallery_dl_path: Option<PathBuf>,

    /// gallery-dl configuration profile, passed through unmodified (default: "gallery-dl.conf")
    #[serde(default = "default_gallery_dl_config")]
    pub gallery_dl_config: Option<PathBuf>,

    /// Netscape cookie jar shared by both strategies (default: "instagram_cookies.txt")
    ///
    /// A missing file is not an error: retrieval runs unauthenticated.
    #[serde(default = "default_cookie_file")]
    pub cookie_file: PathBuf,

    /// Upper bound on a single gallery-dl run in seconds (default: 60)
    #[serde(default = "default_tool_timeout", with = "duration_serde")]
    pub tool_timeout: Duration,

    /// Whether the web API client is tried after gallery-dl fails
    #[serde(default)]
    pub fallback: FallbackPolicy,

    /// Base URL of the web API used by the fallback client
    #[serde(default = "default_web_api_base")]
    pub web_api_base: String,

    /// Request timeout for the fallback client in seconds (default: 30)
    #[serde(default = "default_http_timeout", with = "duration_serde")]
    pub http_timeout: Duration,

    /// User-Agent header sent by the fallback client
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            gallery_dl_path: None,
            gallery_dl_config: default_gallery_dl_config(),
            cookie_file: default_cookie_file(),
            tool_timeout: default_tool_timeout(),
            fallback: FallbackPolicy::default(),
            web_api_base: default_web_api_base(),
            http_timeout: default_http_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Batch pacing
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Pause after every row regardless of outcome, in milliseconds (default: 1000, must be non-zero)
    #[serde(default = "default_row_delay", with = "millis_serde")]
    pub row_delay: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            row_delay: default_row_delay(),
        }
    }
}

/// REST API server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind to (default: 0.0.0.0:5001)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: false)
    #[serde(default)]
    pub swagger_ui: bool,

    /// Largest accepted upload in bytes (default: 50 MiB)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: false,
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// API and external server integration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ServerIntegrationConfig {
    /// REST API settings
    #[serde(default)]
    pub api: ApiConfig,
}

/// Main configuration for [`PostDownloader`](crate::PostDownloader)
///
/// Fields are organized into logical sub-configs:
/// - [`paths`](PathsConfig) - upload/output directories, progress database
/// - [`retrieval`](RetrievalConfig) - gallery-dl, cookies, fallback client
/// - [`batch`](BatchConfig) - per-row pacing
/// - [`server`](ServerIntegrationConfig) - REST API
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Filesystem locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Retrieval strategy settings
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Batch pacing
    #[serde(default)]
    pub batch: BatchConfig,

    /// API server integration
    #[serde(default)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Load a JSON config file; absent keys take their defaults
    pub fn from_json_file(path: &std::path::Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make the pipeline misbehave
    pub fn validate(&self) -> Result<()> {
        if self.retrieval.tool_timeout.is_zero() {
            return Err(Error::Config {
                message: "gallery-dl timeout must be greater than zero".to_string(),
                key: Some("retrieval.tool_timeout".to_string()),
            });
        }
        if self.retrieval.http_timeout.is_zero() {
            return Err(Error::Config {
                message: "HTTP timeout must be greater than zero".to_string(),
                key: Some("retrieval.http_timeout".to_string()),
            });
        }
        if url::Url::parse(&self.retrieval.web_api_base).is_err() {
            return Err(Error::Config {
                message: format!("invalid web API base URL: {}", self.retrieval.web_api_base),
                key: Some("retrieval.web_api_base".to_string()),
            });
        }
        if self.batch.row_delay.is_zero() {
            return Err(Error::Config {
                message: "row delay must be greater than zero".to_string(),
                key: Some("batch.row_delay".to_string()),
            });
        }
        Ok(())
    }
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_gallery_dl_config() -> Option<PathBuf> {
    Some(PathBuf::from("gallery-dl.conf"))
}

fn default_cookie_file() -> PathBuf {
    PathBuf::from("instagram_cookies.txt")
}

fn default_tool_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_web_api_base() -> String {
    "https://www.instagram.com".to_string()
}

fn default_http_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0 Safari/537.36"
        .to_string()
}

fn default_row_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5001))
}

fn default_true() -> bool {
    true
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

mod millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
