//! # Flowcheck CLI
//!
//! Runs the authorization code conformance matrix against a provider.

#![forbid(unsafe_code)]

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use fc_cli::{
    cli::{Cli, Command},
    commands::{run_discover, run_fixtures, run_matrix},
    config,
    output::error,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = match config::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            error(&format!("Failed to load configuration: {e}"));
            std::process::exit(e.exit_code());
        }
    };

    let result = match &cli.command {
        Command::Run(args) => match config::apply_run_args(&mut config, args) {
            Ok(()) => run_matrix(&config, args.report.as_deref(), cli.output).await,
            Err(e) => Err(e),
        },
        Command::Fixtures => run_fixtures(&config, cli.output).map(|()| true),
        Command::Discover => run_discover(&config, cli.output).await.map(|()| true),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error(&e.to_string());
            std::process::exit(e.exit_code());
        }
    }
}
