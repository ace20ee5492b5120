//! # fc-core
//!
//! Core types shared by every Flowcheck crate.
//!
//! This crate provides:
//! - [`config`] - harness configuration (TOML file or `FC_*` environment)
//! - [`error`] - setup and per-pair flow error taxonomy
//! - [`fixture`] - test subjects, client registrations and the fixture registry
//! - [`report`] - per-step and per-pair outcomes of a run

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod fixture;
pub mod report;

pub use config::{Concurrency, Endpoints, HarnessConfig, InteractionProfile};
pub use error::{FailureKind, FlowError, FlowResult, SetupError, SetupResult};
pub use fixture::{ClientRegistration, Credential, FixtureRegistry, TestSubject};
pub use report::{PairReport, PairReportBuilder, RunReport, Step, StepReport, StepStatus};
