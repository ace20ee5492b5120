//! # fc-cli
//!
//! Command-line runner for Flowcheck.
//!
//! - `fc run` - run the authorization code flow for every subject
//! - `fc fixtures` - list subjects in run order and client registrations
//! - `fc discover` - print the endpoints a run would use

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::Cli;
pub use error::{CliError, CliResult};
