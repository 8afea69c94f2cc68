//! Permissively parsed URL values.
//!
//! Redirect targets coming from the backend are handed to a browser surface as-is, so a string
//! that does not parse as an absolute URL is still kept instead of being rejected. The raw text
//! is always preserved verbatim; the parsed form is only available when `url` accepts it.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// Schemes a browser surface renders itself rather than handing off to another app
const WEB_SCHEMES: &[&str] = &["http", "https"];

/// A URL that keeps its original text even when it cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct LooseUrl {
    raw: String,
    parsed: Option<Url>,
}

impl LooseUrl {
    /// Wrap a string, parsing it if possible
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let parsed = Url::parse(&raw).ok();
        Self { raw, parsed }
    }

    /// The original text, byte for byte
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The parsed URL, if the raw text is an absolute URL
    pub fn url(&self) -> Option<&Url> {
        self.parsed.as_ref()
    }

    /// Returns true if the raw text parsed as an absolute URL
    pub fn is_parsed(&self) -> bool {
        self.parsed.is_some()
    }

    /// Lowercased scheme of the parsed URL
    pub fn scheme(&self) -> Option<&str> {
        self.parsed.as_ref().map(Url::scheme)
    }

    /// Host of the parsed URL, if it has one
    pub fn host(&self) -> Option<&str> {
        self.parsed.as_ref().and_then(Url::host_str)
    }

    /// Path of the parsed URL
    pub fn path(&self) -> Option<&str> {
        self.parsed.as_ref().map(Url::path)
    }

    /// First value of a query parameter.
    ///
    /// Opaque URLs (`mailto:`, `data:`) have no hierarchical query and always return `None`.
    pub fn query_param(&self, key: &str) -> Option<String> {
        let url = self.parsed.as_ref()?;
        if url.cannot_be_a_base() {
            return None;
        }
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    /// Returns true for http and https URLs
    pub fn is_web(&self) -> bool {
        self.scheme()
            .map(|scheme| WEB_SCHEMES.contains(&scheme))
            .unwrap_or(false)
    }

    /// The URL without its query string or fragment, for logging
    pub fn redacted(&self) -> String {
        match &self.parsed {
            Some(url) => {
                let mut url = url.clone();
                url.set_query(None);
                url.set_fragment(None);
                url.to_string()
            }
            None => self
                .raw
                .split(['?', '#'])
                .next()
                .unwrap_or_default()
                .to_string(),
        }
    }
}

impl From<String> for LooseUrl {
    fn from(raw: String) -> Self {
        Self::parse(raw)
    }
}

impl From<&str> for LooseUrl {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<LooseUrl> for String {
    fn from(url: LooseUrl) -> Self {
        url.raw
    }
}

impl fmt::Display for LooseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
