//! HTTP user-agent browser.
//!
//! Each session owns a `reqwest` client with its own cookie jar and automatic
//! redirects disabled. Redirects are followed by hand so the session can stop
//! at the intercepted redirect URI without ever requesting it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::cookie::Jar;
use reqwest::header::LOCATION;
use url::Url;
use uuid::Uuid;

use crate::error::{BrowserError, BrowserResult};
use crate::html::{Form, FormMethod};
use crate::page::{Navigation, Page};
use crate::redirect::RedirectMatcher;
use crate::session::{Browser, BrowserSession};

/// Options for [`HttpBrowser`].
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Redirect hops followed per navigation.
    pub max_redirects: usize,
    /// Accept self-signed certificates (local development providers).
    pub accept_invalid_certs: bool,
    /// `User-Agent` header.
    pub user_agent: String,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_redirects: 10,
            accept_invalid_certs: false,
            user_agent: concat!("flowcheck/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug)]
struct Shared {
    options: BrowserOptions,
    open: AtomicUsize,
    closed: AtomicBool,
}

/// Browser handle backed by plain HTTP.
#[derive(Debug, Clone)]
pub struct HttpBrowser {
    shared: Arc<Shared>,
}

impl HttpBrowser {
    /// Launches the browser handle.
    pub fn launch(options: BrowserOptions) -> BrowserResult<Self> {
        build_client(&options, Arc::new(Jar::default()))
            .map_err(|e| BrowserError::Launch(e.to_string()))?;
        tracing::debug!(
            timeout_secs = options.timeout.as_secs(),
            max_redirects = options.max_redirects,
            "Browser launched"
        );
        Ok(Self {
            shared: Arc::new(Shared {
                options,
                open: AtomicUsize::new(0),
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// Opens a session without boxing it.
    pub fn session(&self) -> BrowserResult<HttpSession> {
        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(BrowserError::Closed);
        }
        let client = build_client(&self.shared.options, Arc::new(Jar::default()))
            .map_err(|e| BrowserError::Launch(e.to_string()))?;
        self.shared.open.fetch_add(1, Ordering::SeqCst);

        let id = Uuid::now_v7().to_string();
        tracing::debug!(session = %id, "Session opened");
        Ok(HttpSession {
            id,
            client,
            shared: Arc::clone(&self.shared),
            matcher: None,
            released: false,
        })
    }
}

#[async_trait]
impl Browser for HttpBrowser {
    async fn new_session(&self) -> BrowserResult<Box<dyn BrowserSession>> {
        Ok(Box::new(self.session()?))
    }

    fn open_sessions(&self) -> usize {
        self.shared.open.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let open = self.open_sessions();
        if open > 0 {
            tracing::warn!(open, "Browser closed with sessions still open");
        } else {
            tracing::debug!("Browser closed");
        }
    }
}

fn build_client(options: &BrowserOptions, jar: Arc<Jar>) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .cookie_provider(jar)
        .redirect(reqwest::redirect::Policy::none())
        .timeout(options.timeout)
        .user_agent(options.user_agent.clone())
        .danger_accept_invalid_certs(options.accept_invalid_certs)
        .build()
}

/// Session of an [`HttpBrowser`].
#[derive(Debug)]
pub struct HttpSession {
    id: String,
    client: reqwest::Client,
    shared: Arc<Shared>,
    matcher: Option<RedirectMatcher>,
    released: bool,
}

impl HttpSession {
    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.shared.open.fetch_sub(1, Ordering::SeqCst);
            tracing::debug!(session = %self.id, "Session released");
        }
    }

    async fn follow(
        &mut self,
        mut method: FormMethod,
        mut url: Url,
        mut values: Vec<(String, String)>,
    ) -> BrowserResult<Navigation> {
        if self.released || self.shared.closed.load(Ordering::SeqCst) {
            return Err(BrowserError::Closed);
        }

        let start = url.clone();
        let limit = self.shared.options.max_redirects;
        for _ in 0..=limit {
            if let Some(matcher) = &self.matcher
                && matcher.matches(&url)
            {
                tracing::debug!(session = %self.id, target = %matcher.target(), "Redirect intercepted");
                return Ok(Navigation::Intercepted(url));
            }

            let request = match method {
                FormMethod::Get if values.is_empty() => self.client.get(url.clone()),
                FormMethod::Get => {
                    let mut target = url.clone();
                    target.set_query(None);
                    target.query_pairs_mut().extend_pairs(&values);
                    self.client.get(target)
                }
                FormMethod::Post => self.client.post(url.clone()).form(&values),
            };
            tracing::trace!(session = %self.id, ?method, path = url.path(), "Request");

            let response = request
                .send()
                .await
                .map_err(|e| BrowserError::request(&url, &e))?;
            let status = response.status();

            if status.is_redirection()
                && let Some(location) = response.headers().get(LOCATION)
            {
                let next = location
                    .to_str()
                    .ok()
                    .and_then(|l| url.join(l).ok())
                    .ok_or_else(|| BrowserError::InvalidLocation(url.to_string()))?;
                if !matches!(
                    status,
                    StatusCode::TEMPORARY_REDIRECT | StatusCode::PERMANENT_REDIRECT
                ) {
                    method = FormMethod::Get;
                    values.clear();
                }
                url = next;
                continue;
            }

            let body = response
                .text()
                .await
                .map_err(|e| BrowserError::request(&url, &e))?;
            return Ok(Navigation::Page(Page::new(url, status.as_u16(), body)));
        }

        Err(BrowserError::TooManyRedirects {
            url: start.to_string(),
            limit,
        })
    }
}

#[async_trait]
impl BrowserSession for HttpSession {
    fn id(&self) -> &str {
        &self.id
    }

    fn intercept(&mut self, matcher: RedirectMatcher) {
        self.matcher = Some(matcher);
    }

    async fn navigate(&mut self, url: &Url) -> BrowserResult<Navigation> {
        self.follow(FormMethod::Get, url.clone(), Vec::new()).await
    }

    async fn submit(&mut self, form: &Form, values: &[(String, String)]) -> BrowserResult<Navigation> {
        self.follow(form.method, form.action.clone(), values.to_vec())
            .await
    }

    async fn close(&mut self) {
        self.release();
    }
}

impl Drop for HttpSession {
    fn drop(&mut self) {
        self.release();
    }
}
