//! # fc-browser
//!
//! Browser session provider for the authorization code harness.
//!
//! The harness needs a narrow capability from a browser: isolated sessions
//! that navigate, submit forms and stop at a redirect URI instead of
//! following it. [`Browser`] and [`BrowserSession`] describe that capability.
//! [`HttpBrowser`] implements it as an HTTP user agent with a cookie jar per
//! session.
//!
//! ## Modules
//!
//! - [`session`] - `Browser` / `BrowserSession` traits
//! - [`http`] - HTTP user-agent implementation
//! - [`html`] - form extraction
//! - [`page`] - loaded pages and navigation outcomes
//! - [`redirect`] - redirect interception
//! - [`error`] - error types

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod error;
pub mod html;
pub mod http;
pub mod page;
pub mod redirect;
pub mod session;

pub use error::{BrowserError, BrowserResult};
pub use html::{Field, FieldKind, Form, FormMethod};
pub use http::{BrowserOptions, HttpBrowser, HttpSession};
pub use page::{Navigation, Page};
pub use redirect::RedirectMatcher;
pub use session::{Browser, BrowserSession};
