//! Netscape cookie-jar reading

use crate::error::CredentialState;
use std::path::Path;
use tracing::debug;

const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";

/// One cookie line from a Netscape jar
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cookie {
    /// Domain column, with any leading `.` kept
    pub domain: String,
    /// Cookie name
    pub name: String,
    /// Cookie value
    pub value: String,
}

/// Cookies loaded from a Netscape-format file
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CookieJar {
    cookies: Vec<Cookie>,
}

impl CookieJar {
    /// Parse jar content
    ///
    /// Comment and malformed lines are skipped. `#HttpOnly_` lines are real cookies.
    pub fn parse(content: &str) -> Self {
        let cookies = content
            .lines()
            .filter_map(|line| {
                let line = line.trim_end_matches('\r');
                let line = match line.strip_prefix(HTTP_ONLY_PREFIX) {
                    Some(rest) => rest,
                    None if line.starts_with('#') => return None,
                    None => line,
                };
                let fields: Vec<&str> = line.split('\t').collect();
                if fields.len() < 7 {
                    return None;
                }
                Some(Cookie {
                    domain: fields[0].to_string(),
                    name: fields[5].to_string(),
                    value: fields[6].to_string(),
                })
            })
            .collect();
        Self { cookies }
    }

    /// Load a jar from disk; a missing file yields `Ok(None)`
    pub fn load(path: &Path) -> std::io::Result<Option<Self>> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let jar = Self::parse(&content);
                debug!(?path, cookies = jar.cookies.len(), "loaded cookie jar");
                Ok(Some(jar))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Keep only cookies whose domain ends with `domain`
    pub fn for_domain(&self, domain: &str) -> Self {
        Self {
            cookies: self
                .cookies
                .iter()
                .filter(|c| c.domain.trim_start_matches('.').ends_with(domain))
                .cloned()
                .collect(),
        }
    }

    /// Value of the first cookie named `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value.as_str())
    }

    /// `Cookie:` header value, or `None` for an empty jar
    pub fn header_value(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|c| format!("{}={}", c.name, c.value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Number of cookies
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Whether the jar holds no cookies
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

/// Credential state to report when upstream asks for a login
pub fn credential_state(cookie_file: &Path) -> CredentialState {
    if cookie_file.exists() {
        CredentialState::Rejected
    } else {
        CredentialState::Missing
    }
}
