//! CLI argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Flowcheck - OAuth 2.0 / OpenID Connect authorization code conformance runner.
#[derive(Debug, Parser)]
#[command(name = "fc")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (TOML). Without it, `FC_*` variables are read.
    #[arg(short, long, env = "FC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Provider authority (overrides config).
    #[arg(short, long)]
    pub authority: Option<String>,

    /// Client id to select from the fixtures (overrides config).
    #[arg(long)]
    pub client_id: Option<String>,

    /// Subjects fixture file (overrides config).
    #[arg(long)]
    pub users_file: Option<PathBuf>,

    /// Client registrations fixture file (overrides config).
    #[arg(long)]
    pub clients_file: Option<PathBuf>,

    /// Resolve endpoints through OpenID discovery.
    #[arg(long)]
    pub discovery: bool,

    /// Accept self-signed TLS certificates.
    #[arg(short = 'k', long)]
    pub insecure: bool,

    /// Output format.
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,

    /// Enable debug logging (ignored when `RUST_LOG` is set).
    #[arg(short, long)]
    pub verbose: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the authorization code flow for every subject.
    Run(RunArgs),

    /// List subjects in run order and client registrations.
    Fixtures,

    /// Print the provider endpoints the run would use.
    Discover,
}

/// Options for `fc run`.
#[derive(Debug, Default, Args)]
pub struct RunArgs {
    /// Requested scope (overrides config).
    #[arg(long)]
    pub scope: Option<String>,

    /// Host segment substituted into redirect URI templates.
    #[arg(long)]
    pub redirect_host: Option<String>,

    /// Pairs run in parallel.
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// Also write the JSON report to this file.
    #[arg(long)]
    pub report: Option<PathBuf>,
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON format.
    Json,
    /// Quiet (exit status only).
    Quiet,
}
