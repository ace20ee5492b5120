//! Configuration loading for the CLI.

use fc_core::HarnessConfig;

use crate::cli::{Cli, RunArgs};
use crate::error::CliResult;

/// Loads the harness configuration and applies command-line overrides.
///
/// The TOML file wins over the environment when given. Flags win over both.
pub fn load(cli: &Cli) -> CliResult<HarnessConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::debug!(path = %path.display(), "Loading configuration file");
            HarnessConfig::from_file(path)?
        }
        None => HarnessConfig::from_env()?,
    };

    if let Some(authority) = &cli.authority {
        config.provider.authority.clone_from(authority);
    }
    if let Some(client_id) = &cli.client_id {
        config.client.client_id.clone_from(client_id);
    }
    if let Some(path) = &cli.users_file {
        config.fixtures.users_file.clone_from(path);
    }
    if let Some(path) = &cli.clients_file {
        config.fixtures.clients_file.clone_from(path);
    }
    config.provider.discovery |= cli.discovery;
    config.provider.accept_invalid_certs |= cli.insecure;

    config.validate()?;
    Ok(config)
}

/// Applies `fc run` overrides.
pub fn apply_run_args(config: &mut HarnessConfig, args: &RunArgs) -> CliResult<()> {
    if let Some(scope) = &args.scope {
        config.client.scope.clone_from(scope);
    }
    if let Some(host) = &args.redirect_host {
        config.client.redirect_host.clone_from(host);
    }
    if let Some(concurrency) = args.concurrency {
        config.concurrency.0 = concurrency;
    }
    config.validate()?;
    Ok(())
}
