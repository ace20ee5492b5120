//! Output formatting utilities.

use colored::Colorize;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use fc_core::{PairReport, RunReport, Step, StepStatus};

use crate::cli::OutputFormat;
use crate::error::CliResult;

/// Prints a success message.
pub fn success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Prints an error message.
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Prints a warning message.
pub fn warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message);
}

/// Prints an info message.
pub fn info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Outputs rows in the specified format.
pub fn output<T: Tabled + Serialize>(data: &[T], format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Table => {
            if data.is_empty() {
                info("No results found.");
            } else {
                let table = Table::new(data).with(Style::rounded()).to_string();
                println!("{table}");
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(data)?),
        OutputFormat::Quiet => {}
    }
    Ok(())
}

/// One table row per pair.
#[derive(Debug, Serialize, Tabled)]
struct PairRow {
    #[tabled(rename = "Subject")]
    subject: String,
    #[tabled(rename = "Authorize")]
    authorize: &'static str,
    #[tabled(rename = "Token")]
    token: &'static str,
    #[tabled(rename = "UserInfo")]
    userinfo: &'static str,
    #[tabled(rename = "Introspect")]
    introspection: &'static str,
    #[tabled(rename = "Grants")]
    grants: &'static str,
    #[tabled(rename = "Time (ms)")]
    duration_ms: u64,
}

impl From<&PairReport> for PairRow {
    fn from(pair: &PairReport) -> Self {
        let mark = |step| match pair.step(step).map(|s| s.status) {
            Some(StepStatus::Passed) => "pass",
            Some(StepStatus::Failed) => "FAIL",
            Some(StepStatus::NotRun) | None => "-",
        };
        Self {
            subject: pair.subject_id.clone(),
            authorize: mark(Step::Authorize),
            token: mark(Step::ExchangeToken),
            userinfo: mark(Step::UserInfo),
            introspection: mark(Step::Introspection),
            grants: mark(Step::Grants),
            duration_ms: pair.steps.iter().map(|s| s.duration_ms).sum(),
        }
    }
}

/// Prints a run report.
pub fn report(report: &RunReport, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
            return Ok(());
        }
        OutputFormat::Quiet => return Ok(()),
        OutputFormat::Table => {}
    }

    info(&format!(
        "Run {} for client {} ({} subjects)",
        report.run_id,
        report.client_id,
        report.pairs.len()
    ));
    let rows: Vec<PairRow> = report.pairs.iter().map(PairRow::from).collect();
    output(&rows, format)?;

    for pair in report.failed_pairs() {
        if let Some(step) = pair.failure() {
            error(&format!(
                "{} / {}: {} [{}]",
                pair.subject_id,
                step.step.label(),
                step.message.as_deref().unwrap_or("failed"),
                step.failure_kind.map_or("unknown", |k| k.as_str()),
            ));
        }
    }
    for subjects in report.reused_codes() {
        warning(&format!(
            "Authorization code issued more than once: {}",
            subjects.join(", ")
        ));
    }

    let failed = report.failed_pairs().count();
    if failed == 0 {
        success(&format!("All {} pairs passed", report.pairs.len()));
    } else {
        error(&format!("{failed} of {} pairs failed", report.pairs.len()));
    }
    Ok(())
}
