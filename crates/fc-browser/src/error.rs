//! Browser error types.

use thiserror::Error;

/// Errors raised by browser handles and sessions.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// The browser handle was closed.
    #[error("Browser is closed")]
    Closed,

    /// The browser could not be started.
    #[error("Browser launch failed: {0}")]
    Launch(String),

    /// A request did not complete.
    #[error("Request to {url} failed: {message}")]
    Request {
        /// Target URL.
        url: String,
        /// Transport error text.
        message: String,
        /// Whether the failure was a timeout.
        timeout: bool,
    },

    /// A redirect response carried no usable `Location`.
    #[error("Redirect from {0} has no usable Location header")]
    InvalidLocation(String),

    /// The redirect chain exceeded the configured limit.
    #[error("More than {limit} redirects starting at {url}")]
    TooManyRedirects {
        /// First URL of the chain.
        url: String,
        /// Configured limit.
        limit: usize,
    },

    /// A URL could not be parsed or joined.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl BrowserError {
    /// Checks if this error is a timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Request { timeout: true, .. })
    }

    pub(crate) fn request(url: &url::Url, error: &reqwest::Error) -> Self {
        Self::Request {
            url: url.to_string(),
            message: error.to_string(),
            timeout: error.is_timeout(),
        }
    }
}

/// Result type for browser operations.
pub type BrowserResult<T> = Result<T, BrowserError>;
