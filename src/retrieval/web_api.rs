//! Fallback strategy: direct calls to the web media-info API

use super::PostReference;
use super::cookies::{CookieJar, credential_state};
use super::traits::{DownloadResult, FetchedPost, RetrievalStrategy, collect_flat_media};
use crate::config::RetrievalConfig;
use crate::error::RetrievalError;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// App id the public web client sends with API calls
const WEB_APP_ID: &str = "936619743392459";

const COOKIE_DOMAIN: &str = "instagram.com";

/// Body markers returned instead of media when a session is needed
const LOGIN_MARKERS: [&str; 2] = ["login_required", "require_login"];

#[derive(Debug, Default, Deserialize)]
struct MediaInfoResponse {
    #[serde(default)]
    items: Vec<MediaItem>,
}

#[derive(Debug, Default, Deserialize)]
struct MediaItem {
    #[serde(default)]
    media_type: u8,
    #[serde(default)]
    caption: Option<Caption>,
    #[serde(default)]
    image_versions2: Option<ImageVersions>,
    #[serde(default)]
    video_versions: Vec<MediaUrl>,
    #[serde(default)]
    carousel_media: Vec<MediaItem>,
}

#[derive(Debug, Default, Deserialize)]
struct Caption {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Default, Deserialize)]
struct ImageVersions {
    #[serde(default)]
    candidates: Vec<MediaUrl>,
}

#[derive(Debug, Deserialize)]
struct MediaUrl {
    url: String,
}

impl MediaItem {
    const IMAGE: u8 = 1;
    const VIDEO: u8 = 2;
    const CAROUSEL: u8 = 8;

    fn is_video(&self) -> bool {
        self.media_type == Self::VIDEO || !self.video_versions.is_empty()
    }

    /// Best URL and file extension for a single (non-carousel) item
    fn source(&self) -> Option<(&str, &'static str)> {
        if self.is_video() {
            self.video_versions.first().map(|v| (v.url.as_str(), "mp4"))
        } else {
            self.image_versions2
                .as_ref()
                .and_then(|iv| iv.candidates.first())
                .map(|c| (c.url.as_str(), "jpg"))
        }
    }

    fn typename(&self) -> &'static str {
        match self.media_type {
            Self::CAROUSEL => "GraphSidecar",
            Self::IMAGE => "GraphImage",
            _ if self.is_video() => "GraphVideo",
            _ => "GraphImage",
        }
    }
}

/// One file to download: URL and target file name
#[derive(Debug, PartialEq, Eq)]
struct PlannedFile {
    url: String,
    file_name: String,
}

/// Files for a post, named `{shortcode}_{typename}[_{n}].{ext}`
fn plan_downloads(shortcode: &str, item: &MediaItem) -> Vec<PlannedFile> {
    let typename = item.typename();
    if item.media_type == MediaItem::CAROUSEL && !item.carousel_media.is_empty() {
        return item
            .carousel_media
            .iter()
            .enumerate()
            .filter_map(|(i, child)| {
                child.source().map(|(url, ext)| PlannedFile {
                    url: url.to_string(),
                    file_name: format!("{shortcode}_{typename}_{}.{ext}", i + 1),
                })
            })
            .collect();
    }
    item.source()
        .map(|(url, ext)| PlannedFile {
            url: url.to_string(),
            file_name: format!("{shortcode}_{typename}.{ext}"),
        })
        .into_iter()
        .collect()
}

/// Session material taken from the cookie jar
#[derive(Debug, Clone)]
struct Session {
    cookie_header: String,
    csrf_token: Option<String>,
}

/// Direct web API client used when gallery-dl fails
///
/// The HTTP client is built once and reused for every post. Session cookies are read
/// from the jar on first use only; concurrent first calls share a single load.
pub struct WebApiStrategy {
    client: reqwest::Client,
    base_url: String,
    cookie_file: PathBuf,
    session: OnceCell<Option<Session>>,
}

impl WebApiStrategy {
    /// Create a strategy against `base_url` (e.g. `https://www.instagram.com`)
    pub fn new(
        base_url: impl Into<String>,
        cookie_file: PathBuf,
        config: &RetrievalConfig,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.http_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cookie_file,
            session: OnceCell::new(),
        })
    }

    /// Build from configuration
    pub fn from_config(config: &RetrievalConfig) -> Result<Self, reqwest::Error> {
        Self::new(
            config.web_api_base.clone(),
            config.cookie_file.clone(),
            config,
        )
    }

    async fn session(&self) -> Option<&Session> {
        self.session
            .get_or_init(|| async {
                match CookieJar::load(&self.cookie_file) {
                    Ok(Some(jar)) => {
                        let jar = jar.for_domain(COOKIE_DOMAIN);
                        let session = jar.header_value().map(|cookie_header| Session {
                            cookie_header,
                            csrf_token: jar.get("csrftoken").map(str::to_string),
                        });
                        info!(cookies = jar.len(), "web API session cookies loaded");
                        session
                    }
                    Ok(None) => {
                        debug!(cookie_file = ?self.cookie_file, "no cookie file, web API runs anonymously");
                        None
                    }
                    Err(e) => {
                        warn!(cookie_file = ?self.cookie_file, error = %e, "failed to read cookie file");
                        None
                    }
                }
            })
            .await
            .as_ref()
    }

    fn auth_required(&self) -> RetrievalError {
        RetrievalError::AuthRequired {
            credentials: credential_state(&self.cookie_file),
        }
    }

    async fn media_info(&self, media_id: u128) -> Result<MediaItem, RetrievalError> {
        let url = format!("{}/api/v1/media/{}/info/", self.base_url, media_id);
        let mut request = self.client.get(&url).header("X-IG-App-ID", WEB_APP_ID);
        if let Some(session) = self.session().await {
            request = request.header(reqwest::header::COOKIE, &session.cookie_header);
            if let Some(token) = &session.csrf_token {
                request = request.header("X-CSRFToken", token);
            }
        }

        let response = request
            .send()
            .await
            .map_err(|e| RetrievalError::failed(format!("media info request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(self.auth_required());
        }

        let body = response
            .text()
            .await
            .map_err(|e| RetrievalError::failed(format!("failed to read media info: {}", e)))?;

        if LOGIN_MARKERS.iter().any(|marker| body.contains(marker)) {
            return Err(self.auth_required());
        }
        if !status.is_success() {
            return Err(RetrievalError::failed(format!(
                "media info returned HTTP {}",
                status.as_u16()
            )));
        }

        let info: MediaInfoResponse = serde_json::from_str(&body)
            .map_err(|e| RetrievalError::failed(format!("unexpected media info: {}", e)))?;
        info.items
            .into_iter()
            .next()
            .ok_or_else(|| RetrievalError::failed("post has no media"))
    }

    async fn download_file(&self, planned: &PlannedFile, dest: &Path) -> Result<(), RetrievalError> {
        let response = self
            .client
            .get(&planned.url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| RetrievalError::failed(format!("media download failed: {}", e)))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RetrievalError::failed(format!("media download failed: {}", e)))?;
        tokio::fs::write(dest.join(&planned.file_name), &bytes)
            .await
            .map_err(|e| RetrievalError::failed(format!("failed to write media: {}", e)))?;
        debug!(file = %planned.file_name, bytes = bytes.len(), "media saved");
        Ok(())
    }
}

#[async_trait]
impl RetrievalStrategy for WebApiStrategy {
    async fn fetch(&self, reference: &PostReference, dest: &Path) -> DownloadResult {
        let media_id = reference
            .media_id()
            .ok_or_else(|| RetrievalError::InvalidReference {
                url: reference.url().to_string(),
            })?;

        let item = self.media_info(media_id).await?;
        let caption = item
            .caption
            .as_ref()
            .map(|c| c.text.clone())
            .unwrap_or_default();

        let planned = plan_downloads(reference.shortcode(), &item);
        if planned.is_empty() {
            return Err(RetrievalError::failed("post has no downloadable media"));
        }
        for file in &planned {
            self.download_file(file, dest).await?;
        }

        let files = collect_flat_media(dest, reference.shortcode())
            .map_err(|e| RetrievalError::failed(format!("failed to scan output: {}", e)))?;
        if files.is_empty() {
            return Err(RetrievalError::failed("no media files were written"));
        }

        info!(
            shortcode = reference.shortcode(),
            files = files.len(),
            "web API download complete"
        );
        Ok(FetchedPost { files, caption })
    }

    fn name(&self) -> &'static str {
        "web-api"
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // "B" decodes to media id 1
    const POST_URL: &str = "https://www.instagram.com/p/B/";

    fn strategy(server: &MockServer, cookie_file: PathBuf) -> WebApiStrategy {
        WebApiStrategy::new(server.uri(), cookie_file, &RetrievalConfig::default()).unwrap()
    }

    #[test]
    fn plan_names_single_and_carousel_items() {
        let single: MediaItem = serde_json::from_value(json!({
            "media_type": 2,
            "video_versions": [{"url": "https://cdn/v.mp4"}]
        }))
        .unwrap();
        assert_eq!(
            plan_downloads("ABC", &single),
            vec![PlannedFile {
                url: "https://cdn/v.mp4".into(),
                file_name: "ABC_GraphVideo.mp4".into()
            }]
        );

        let carousel: MediaItem = serde_json::from_value(json!({
            "media_type": 8,
            "carousel_media": [
                {"media_type": 1, "image_versions2": {"candidates": [{"url": "https://cdn/1.jpg"}]}},
                {"media_type": 2, "video_versions": [{"url": "https://cdn/2.mp4"}]}
            ]
        }))
        .unwrap();
        let names: Vec<_> = plan_downloads("ABC", &carousel)
            .into_iter()
            .map(|p| p.file_name)
            .collect();
        assert_eq!(names, vec!["ABC_GraphSidecar_1.jpg", "ABC_GraphSidecar_2.mp4"]);
    }

    #[tokio::test]
    async fn downloads_image_post_with_caption() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/media/1/info/"))
            .and(header("X-IG-App-ID", WEB_APP_ID))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{
                    "media_type": 1,
                    "caption": {"text": "sunny day"},
                    "image_versions2": {"candidates": [{"url": format!("{}/media/b.jpg", server.uri())}]}
                }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/media/b.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg-bytes".to_vec()))
            .mount(&server)
            .await;

        let out = tempdir().unwrap();
        let post = PostReference::parse(POST_URL).unwrap();
        let fetched = strategy(&server, "/nonexistent/cookies.txt".into())
            .fetch(&post, out.path())
            .await
            .unwrap();

        assert_eq!(fetched.caption, "sunny day");
        assert_eq!(fetched.files, vec![out.path().join("B_GraphImage.jpg")]);
        assert_eq!(std::fs::read(&fetched.files[0]).unwrap(), b"jpeg-bytes");
    }

    #[tokio::test]
    async fn session_cookies_are_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/media/1/info/"))
            .and(header("X-CSRFToken", "tok"))
            .and(header("cookie", "csrftoken=tok; sessionid=s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{
                    "media_type": 2,
                    "video_versions": [{"url": format!("{}/media/v.mp4", server.uri())}]
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/media/v.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp4".to_vec()))
            .mount(&server)
            .await;

        let temp = tempdir().unwrap();
        let cookies = temp.path().join("cookies.txt");
        std::fs::write(
            &cookies,
            ".instagram.com\tTRUE\t/\tTRUE\t0\tcsrftoken\ttok\n\
             #HttpOnly_.instagram.com\tTRUE\t/\tTRUE\t0\tsessionid\ts1\n",
        )
        .unwrap();

        let out = tempdir().unwrap();
        let post = PostReference::parse(POST_URL).unwrap();
        let fetched = strategy(&server, cookies).fetch(&post, out.path()).await.unwrap();

        assert_eq!(fetched.files, vec![out.path().join("B_GraphVideo.mp4")]);
        assert_eq!(fetched.caption, "");
    }

    #[tokio::test]
    async fn unauthorized_is_auth_required() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/media/1/info/"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let out = tempdir().unwrap();
        let post = PostReference::parse(POST_URL).unwrap();
        let result = strategy(&server, "/nonexistent/cookies.txt".into())
            .fetch(&post, out.path())
            .await;

        assert_eq!(
            result,
            Err(RetrievalError::AuthRequired {
                credentials: crate::error::CredentialState::Missing
            })
        );
    }

    #[tokio::test]
    async fn login_required_body_is_auth_required() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/media/1/info/"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"message": "login_required", "status": "fail"})),
            )
            .mount(&server)
            .await;

        let out = tempdir().unwrap();
        let post = PostReference::parse(POST_URL).unwrap();
        let result = strategy(&server, "/nonexistent/cookies.txt".into())
            .fetch(&post, out.path())
            .await;
        assert!(matches!(result, Err(RetrievalError::AuthRequired { .. })));
    }

    #[tokio::test]
    async fn not_found_is_download_failed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/media/1/info/"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let out = tempdir().unwrap();
        let post = PostReference::parse(POST_URL).unwrap();
        let result = strategy(&server, "/nonexistent/cookies.txt".into())
            .fetch(&post, out.path())
            .await;
        assert_eq!(result, Err(RetrievalError::failed("media info returned HTTP 404")));
    }

    #[tokio::test]
    async fn empty_items_is_download_failed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/media/1/info/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .mount(&server)
            .await;

        let out = tempdir().unwrap();
        let post = PostReference::parse(POST_URL).unwrap();
        let result = strategy(&server, "/nonexistent/cookies.txt".into())
            .fetch(&post, out.path())
            .await;
        assert_eq!(result, Err(RetrievalError::failed("post has no media")));
    }
}
