//! Scripted browser doubles for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use fc_browser::{
    Browser, BrowserError, BrowserResult, BrowserSession, Form, Navigation, Page, RedirectMatcher,
};

pub const LOGIN_PAGE: &str = r#"
    <html><head><title>Login</title></head><body>
    <form method="post" action="/account/login">
        <input type="hidden" name="ReturnUrl" value="/connect/authorize/callback" />
        <input type="text" name="username" />
        <input type="password" name="password" />
        <button name="button" value="login">Login</button>
    </form>
    </body></html>
"#;

pub const CONSENT_PAGE: &str = r#"
    <html><head><title>Consent</title></head><body>
    <form method="post" action="/consent">
        <input type="hidden" name="ReturnUrl" value="/connect/authorize/callback" />
        <input type="checkbox" name="ScopesConsented" value="openid" checked />
        <input type="checkbox" name="ScopesConsented" value="profile" />
        <button name="consent" value="yes">Yes, Allow</button>
        <button name="consent" value="no">No, Do Not Allow</button>
    </form>
    </body></html>
"#;

pub fn page(path: &str, body: &str) -> Navigation {
    page_with_status(path, 200, body)
}

pub fn page_with_status(path: &str, status: u16, body: &str) -> Navigation {
    let url = Url::parse("https://idp.example.com").unwrap().join(path).unwrap();
    Navigation::Page(Page::new(url, status, body.to_string()))
}

pub fn intercepted(url: &str) -> Navigation {
    Navigation::Intercepted(Url::parse(url).unwrap())
}

/// One scripted response, optionally delayed.
pub struct Scripted {
    pub delay: Duration,
    pub result: BrowserResult<Navigation>,
}

impl From<Navigation> for Scripted {
    fn from(navigation: Navigation) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(navigation),
        }
    }
}

/// Submissions recorded by a scripted session.
pub type Submissions = Arc<Mutex<Vec<Vec<(String, String)>>>>;

/// Session replaying a fixed sequence of navigation outcomes.
pub struct ScriptedSession {
    script: VecDeque<Scripted>,
    submissions: Submissions,
    open: Option<Arc<AtomicUsize>>,
}

impl ScriptedSession {
    pub fn new(script: Vec<Scripted>) -> Self {
        Self {
            script: script.into(),
            submissions: Submissions::default(),
            open: None,
        }
    }

    pub fn submissions(&self) -> Submissions {
        Arc::clone(&self.submissions)
    }

    async fn next(&mut self) -> BrowserResult<Navigation> {
        let Some(step) = self.script.pop_front() else {
            return Err(BrowserError::InvalidUrl("script exhausted".to_string()));
        };
        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }
        step.result
    }

    fn release(&mut self) {
        if let Some(open) = self.open.take() {
            open.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    fn id(&self) -> &str {
        "scripted"
    }

    fn intercept(&mut self, _matcher: RedirectMatcher) {}

    async fn navigate(&mut self, _url: &Url) -> BrowserResult<Navigation> {
        self.next().await
    }

    async fn submit(&mut self, _form: &Form, values: &[(String, String)]) -> BrowserResult<Navigation> {
        self.submissions.lock().unwrap().push(values.to_vec());
        self.next().await
    }

    async fn close(&mut self) {
        self.release();
    }
}

impl Drop for ScriptedSession {
    fn drop(&mut self) {
        self.release();
    }
}

/// Browser whose sessions all replay the same script.
pub struct ScriptedBrowser {
    script: Box<dyn Fn() -> Vec<Scripted> + Send + Sync>,
    open: Arc<AtomicUsize>,
    opened: AtomicUsize,
}

impl ScriptedBrowser {
    pub fn new(script: impl Fn() -> Vec<Scripted> + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            open: Arc::new(AtomicUsize::new(0)),
            opened: AtomicUsize::new(0),
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Browser for ScriptedBrowser {
    async fn new_session(&self) -> BrowserResult<Box<dyn BrowserSession>> {
        self.open.fetch_add(1, Ordering::SeqCst);
        self.opened.fetch_add(1, Ordering::SeqCst);
        let mut session = ScriptedSession::new((self.script)());
        session.open = Some(Arc::clone(&self.open));
        Ok(Box::new(session))
    }

    fn open_sessions(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    async fn close(&self) {}
}
