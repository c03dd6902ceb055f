//! Post references parsed from row links

use crate::error::RetrievalError;
use regex::Regex;
use std::sync::LazyLock;

static SHORTCODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"instagram\.com/(?:p|reels?|tv)/([A-Za-z0-9_-]+)").expect("valid regex")
});

/// Alphabet used to encode numeric media ids as shortcodes
const SHORTCODE_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// A post URL together with its shortcode
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostReference {
    url: String,
    shortcode: String,
}

impl PostReference {
    /// Parse a post URL
    ///
    /// Accepts `/p/`, `/reel/`, `/reels/` and `/tv/` links; query strings and
    /// trailing segments are ignored.
    ///
    /// # Errors
    ///
    /// [`RetrievalError::InvalidReference`] when no shortcode can be found.
    ///
    /// # Examples
    ///
    /// ```
    /// use insta_batch_dl::retrieval::PostReference;
    ///
    /// let post = PostReference::parse("https://www.instagram.com/reel/C1a2B3/?igsh=x")?;
    /// assert_eq!(post.shortcode(), "C1a2B3");
    /// # Ok::<(), insta_batch_dl::error::RetrievalError>(())
    /// ```
    pub fn parse(url: &str) -> Result<Self, RetrievalError> {
        let url = url.trim();
        SHORTCODE_RE
            .captures(url)
            .and_then(|caps| caps.get(1))
            .map(|code| Self {
                url: url.to_string(),
                shortcode: code.as_str().to_string(),
            })
            .ok_or_else(|| RetrievalError::InvalidReference {
                url: url.to_string(),
            })
    }

    /// The URL as given
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The post shortcode
    pub fn shortcode(&self) -> &str {
        &self.shortcode
    }

    /// Numeric media id encoded by the shortcode
    ///
    /// Returns `None` for codes too long to be a media id (private-post links
    /// carry extra characters after the id).
    pub fn media_id(&self) -> Option<u128> {
        if self.shortcode.len() > 21 {
            return None;
        }
        self.shortcode.bytes().try_fold(0u128, |acc, byte| {
            let digit = SHORTCODE_ALPHABET.iter().position(|&c| c == byte)?;
            acc.checked_mul(64)?.checked_add(digit as u128)
        })
    }
}

impl std::fmt::Display for PostReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url)
    }
}
