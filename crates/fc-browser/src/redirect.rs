//! Redirect interception.

use url::Url;

use crate::error::{BrowserError, BrowserResult};

/// Matches URLs under an expected redirect URI.
///
/// Scheme, host and port must be equal. The path must equal the expected
/// path or continue it at a `/` boundary. Query and fragment are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectMatcher {
    target: Url,
}

impl RedirectMatcher {
    /// Creates a matcher for `prefix`.
    pub fn new(prefix: &str) -> BrowserResult<Self> {
        let target = Url::parse(prefix).map_err(|e| BrowserError::InvalidUrl(format!("{prefix}: {e}")))?;
        Ok(Self { target })
    }

    /// The expected redirect URI.
    #[must_use]
    pub const fn target(&self) -> &Url {
        &self.target
    }

    /// Returns whether `url` lands on the expected redirect URI.
    #[must_use]
    pub fn matches(&self, url: &Url) -> bool {
        if url.scheme() != self.target.scheme()
            || url.host_str() != self.target.host_str()
            || url.port_or_known_default() != self.target.port_or_known_default()
        {
            return false;
        }
        let expected = self.target.path();
        let path = url.path();
        match path.strip_prefix(expected) {
            Some("") => true,
            Some(rest) => expected.ends_with('/') || rest.starts_with('/'),
            None => false,
        }
    }
}
