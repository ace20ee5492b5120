//! # fc-harness
//!
//! Flow-driving core of Flowcheck.
//!
//! For every test subject the [`Orchestrator`] runs the authorization code
//! flow against one client registration:
//!
//! 1. [`AuthorizationDriver`] - interactive login and consent, redirect capture
//! 2. token exchange, user-info and introspection through `fc-protocol`
//! 3. [`GrantVerifier`] - grant listing with the same browser session
//!
//! Setup problems abort the run before any subject is processed. Failures
//! inside a pair are recorded in its report and do not affect other pairs.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod driver;
pub mod grants;
pub mod orchestrator;
pub mod setup;

#[cfg(test)]
mod testing;

pub use driver::{Authorization, AuthorizationDriver};
pub use grants::GrantVerifier;
pub use orchestrator::{Orchestrator, PairState};
pub use setup::{RunPlan, resolve_endpoints};
