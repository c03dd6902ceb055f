//! Post retrieval
//!
//! Two independent strategies sit behind the [`RetrievalStrategy`] trait:
//! - [`GalleryDlStrategy`] (primary): the external `gallery-dl` tool
//! - [`WebApiStrategy`] (fallback): a direct web API client
//!
//! [`RetrievalEngine`] composes them according to the configured [`FallbackPolicy`].

mod cookies;
mod gallery_dl;
mod reference;
mod traits;
mod web_api;

use crate::config::{FallbackPolicy, RetrievalConfig};
use crate::error::{Error, RetrievalError};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

pub use cookies::{Cookie, CookieJar, credential_state};
pub use gallery_dl::GalleryDlStrategy;
pub use reference::PostReference;
pub use traits::{DownloadResult, FetchedPost, RetrievalStrategy};
pub use web_api::WebApiStrategy;

/// Primary strategy with an optional fallback
///
/// The two strategies never run concurrently for one post: the fallback only
/// starts after the primary has returned an error.
#[derive(Clone)]
pub struct RetrievalEngine {
    primary: Arc<dyn RetrievalStrategy>,
    fallback: Option<Arc<dyn RetrievalStrategy>>,
}

impl RetrievalEngine {
    /// Compose an engine from explicit strategies
    pub fn new(
        primary: Arc<dyn RetrievalStrategy>,
        fallback: Option<Arc<dyn RetrievalStrategy>>,
    ) -> Self {
        Self { primary, fallback }
    }

    /// Build gallery-dl plus (unless disabled) the web API client
    ///
    /// # Errors
    ///
    /// Fails only if the HTTP client cannot be constructed.
    pub fn from_config(config: &RetrievalConfig) -> Result<Self, Error> {
        let primary: Arc<dyn RetrievalStrategy> = Arc::new(GalleryDlStrategy::from_config(config));
        let fallback: Option<Arc<dyn RetrievalStrategy>> = match config.fallback {
            FallbackPolicy::Disabled => None,
            FallbackPolicy::OnFailure => Some(Arc::new(WebApiStrategy::from_config(config)?)),
        };
        info!(
            primary = primary.name(),
            fallback = fallback.as_ref().map(|f| f.name()).unwrap_or("none"),
            "retrieval engine ready"
        );
        Ok(Self::new(primary, fallback))
    }

    /// Names of the configured strategies, primary first
    pub fn strategy_names(&self) -> Vec<&'static str> {
        std::iter::once(self.primary.name())
            .chain(self.fallback.as_ref().map(|f| f.name()))
            .collect()
    }

    /// Download one post into `dest`
    ///
    /// When both strategies fail the primary's error is reported, unless the
    /// primary could not run at all ([`RetrievalError::ToolMissing`]); then the
    /// fallback's error says more.
    pub async fn fetch(&self, reference: &PostReference, dest: &Path) -> DownloadResult {
        let primary_error = match self.primary.fetch(reference, dest).await {
            Ok(post) => return Ok(post),
            Err(e) => e,
        };

        let Some(fallback) = &self.fallback else {
            return Err(primary_error);
        };

        warn!(
            shortcode = reference.shortcode(),
            primary = self.primary.name(),
            fallback = fallback.name(),
            error = %primary_error,
            "primary retrieval failed, trying fallback"
        );

        match fallback.fetch(reference, dest).await {
            Ok(post) => Ok(post),
            Err(fallback_error) => {
                warn!(
                    shortcode = reference.shortcode(),
                    error = %fallback_error,
                    "fallback retrieval failed"
                );
                if primary_error == RetrievalError::ToolMissing {
                    Err(fallback_error)
                } else {
                    Err(primary_error)
                }
            }
        }
    }
}
