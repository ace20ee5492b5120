//! Command implementations.

pub mod discover;
pub mod fixtures;
pub mod run;

pub use discover::run_discover;
pub use fixtures::run_fixtures;
pub use run::run_matrix;

use fc_core::{FixtureRegistry, HarnessConfig, SetupError};

use crate::CliResult;

/// Builds the HTTP client used for discovery and back-channel calls.
pub fn http_client(config: &HarnessConfig) -> CliResult<reqwest::Client> {
    fc_protocol::client::build_http(config.timeouts.http(), config.provider.accept_invalid_certs)
        .map_err(|e| SetupError::Config(format!("http client: {e}")).into())
}

/// Loads the fixture registry named by the configuration.
pub fn load_fixtures(config: &HarnessConfig) -> CliResult<FixtureRegistry> {
    Ok(FixtureRegistry::load(
        &config.fixtures.users_file,
        &config.fixtures.clients_file,
    )?)
}
