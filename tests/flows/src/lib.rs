//! Test support for end-to-end Flowcheck runs.
//!
//! [`provider`] is an in-process authorization server with cookie sessions,
//! a login page, a consent page and a grants page. [`harness`] points a real
//! [`HttpBrowser`](fc_browser::HttpBrowser) and the orchestrator at it.

pub mod harness;
pub mod provider;

pub use harness::{TestHarness, client_a, subject};
pub use provider::{MockProvider, ProviderFixtures};
