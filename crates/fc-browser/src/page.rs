//! Loaded pages and navigation outcomes.

use url::Url;

use crate::html::{self, Form};

/// A page a session settled on.
#[derive(Debug, Clone)]
pub struct Page {
    url: Url,
    status: u16,
    body: String,
}

impl Page {
    /// Creates a page from a final response.
    #[must_use]
    pub const fn new(url: Url, status: u16, body: String) -> Self {
        Self { url, status, body }
    }

    /// Final URL after redirects.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// HTTP status of the final response.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Raw response body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Forms on the page, with absolute actions.
    #[must_use]
    pub fn forms(&self) -> Vec<Form> {
        html::parse_forms(&self.body, &self.url)
    }

    /// First form carrying a control named `name`.
    #[must_use]
    pub fn form_with_field(&self, name: &str) -> Option<Form> {
        self.forms().into_iter().find(|f| f.has_field(name))
    }

    /// Page title, if any.
    #[must_use]
    pub fn title(&self) -> Option<String> {
        html::title(&self.body)
    }

    /// Visible text of the page.
    #[must_use]
    pub fn text(&self) -> String {
        html::text_content(&self.body)
    }

    /// Short description for error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut url = self.url.clone();
        url.set_query(None);
        match self.title() {
            Some(title) if !title.is_empty() => format!("'{title}' at {url} (status {})", self.status),
            _ => format!("{url} (status {})", self.status),
        }
    }
}

/// Where a navigation ended.
#[derive(Debug, Clone)]
pub enum Navigation {
    /// A page was loaded.
    Page(Page),
    /// A redirect to the intercepted prefix was reached and not followed.
    Intercepted(Url),
}

impl Navigation {
    /// The loaded page, if navigation was not intercepted.
    #[must_use]
    pub fn into_page(self) -> Option<Page> {
        match self {
            Self::Page(page) => Some(page),
            Self::Intercepted(_) => None,
        }
    }
}
