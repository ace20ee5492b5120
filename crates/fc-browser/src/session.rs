//! Browser capability traits.

use async_trait::async_trait;
use url::Url;

use crate::error::BrowserResult;
use crate::html::Form;
use crate::page::Navigation;
use crate::redirect::RedirectMatcher;

/// A shared browser handle handing out isolated sessions.
///
/// One handle is launched per run and closed once at the end. Sessions do
/// not share cookies or any other state with each other.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Opens a fresh, isolated session.
    async fn new_session(&self) -> BrowserResult<Box<dyn BrowserSession>>;

    /// Number of sessions currently open.
    fn open_sessions(&self) -> usize;

    /// Closes the handle. Further `new_session` calls fail.
    async fn close(&self);
}

/// An isolated page context bound to one subject.
///
/// Implementations release their resources in `close` and, when a session is
/// dropped without being closed, in `Drop`.
#[async_trait]
pub trait BrowserSession: Send {
    /// Session identifier, for logs.
    fn id(&self) -> &str;

    /// Stops navigation at URLs matching `matcher` instead of fetching them.
    fn intercept(&mut self, matcher: RedirectMatcher);

    /// Navigates to `url`, following redirects.
    async fn navigate(&mut self, url: &Url) -> BrowserResult<Navigation>;

    /// Submits `form` with `values`, following redirects.
    async fn submit(&mut self, form: &Form, values: &[(String, String)]) -> BrowserResult<Navigation>;

    /// Releases the session. Idempotent.
    async fn close(&mut self);
}
