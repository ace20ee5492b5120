//! `fc run`.

use fc_browser::{Browser, BrowserOptions, HttpBrowser};
use fc_core::{HarnessConfig, SetupError};
use fc_harness::{Orchestrator, resolve_endpoints};

use crate::cli::OutputFormat;
use crate::output;
use crate::CliResult;

use super::{http_client, load_fixtures};

/// Runs the matrix and prints the report.
///
/// Returns whether every pair passed.
pub async fn run_matrix(
    config: &HarnessConfig,
    report_path: Option<&std::path::Path>,
    format: OutputFormat,
) -> CliResult<bool> {
    let registry = load_fixtures(config)?;
    let endpoints = resolve_endpoints(config, &http_client(config)?).await?;

    let browser = HttpBrowser::launch(BrowserOptions {
        timeout: config.timeouts.interaction(),
        accept_invalid_certs: config.provider.accept_invalid_certs,
        ..BrowserOptions::default()
    })
    .map_err(|e| SetupError::Browser(e.to_string()))?;

    let outcome = match Orchestrator::new(config, &registry, &browser, endpoints) {
        Ok(orchestrator) => orchestrator.run().await,
        Err(e) => Err(e),
    };
    browser.close().await;
    let report = outcome?;

    if let Some(path) = report_path {
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
        tracing::info!(path = %path.display(), "Report written");
    }
    output::report(&report, format)?;
    Ok(report.passed())
}
