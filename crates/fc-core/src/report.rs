//! Run reporting.
//!
//! Each (subject, client) pair produces one [`PairReport`] holding exactly one
//! [`StepReport`] per step. Steps after the first failure are
//! [`StepStatus::NotRun`], never silently passed.
//!
//! Reports carry no secrets. Authorization codes are kept as short
//! fingerprints so code reuse across subjects can still be detected.

use std::collections::HashMap;
use std::time::Duration;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{FailureKind, FlowError};

/// Steps of a pair, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Interactive authorization pass.
    Authorize,
    /// Authorization code exchange.
    ExchangeToken,
    /// User-info check.
    UserInfo,
    /// Introspection check.
    Introspection,
    /// Grant listing check.
    Grants,
}

impl Step {
    /// All steps in execution order.
    pub const ALL: [Self; 5] = [
        Self::Authorize,
        Self::ExchangeToken,
        Self::UserInfo,
        Self::Introspection,
        Self::Grants,
    ];

    /// Human-readable step name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Authorize => "Authorization Endpoint",
            Self::ExchangeToken => "Token Endpoint",
            Self::UserInfo => "UserInfo Endpoint",
            Self::Introspection => "Introspection Endpoint",
            Self::Grants => "Grants",
        }
    }
}

/// Outcome of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Step ran and succeeded.
    Passed,
    /// Step ran and failed.
    Failed,
    /// Step was not reached because an earlier step failed.
    NotRun,
}

/// Result of one step within a pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    /// Which step.
    pub step: Step,
    /// What happened.
    pub status: StepStatus,
    /// Failure kind, for failed steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_kind: Option<FailureKind>,
    /// Failure message, for failed steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Wall time spent in the step.
    pub duration_ms: u64,
}

/// Result of one (subject, client) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairReport {
    /// Subject identifier.
    pub subject_id: String,
    /// Client identifier.
    pub client_id: String,
    /// When the pair started.
    pub started_at: DateTime<Utc>,
    /// One entry per step, in execution order.
    pub steps: Vec<StepReport>,
    /// Fingerprint of the issued authorization code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_fingerprint: Option<String>,
}

impl PairReport {
    /// Creates a new report builder.
    #[must_use]
    pub fn builder(subject_id: impl Into<String>, client_id: impl Into<String>) -> PairReportBuilder {
        PairReportBuilder::new(subject_id, client_id)
    }

    /// Returns whether every step passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.steps.iter().all(|s| s.status == StepStatus::Passed)
    }

    /// Returns the failed step, if any.
    #[must_use]
    pub fn failure(&self) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.status == StepStatus::Failed)
    }

    /// Returns the report for `step`.
    #[must_use]
    pub fn step(&self, step: Step) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.step == step)
    }
}

/// Builder for pair reports.
///
/// Steps are recorded in order. [`build`](Self::build) fills every step that
/// was never recorded with [`StepStatus::NotRun`].
#[derive(Debug)]
pub struct PairReportBuilder {
    subject_id: String,
    client_id: String,
    started_at: DateTime<Utc>,
    steps: Vec<StepReport>,
    code_fingerprint: Option<String>,
}

impl PairReportBuilder {
    /// Creates a new builder stamped with the current time.
    #[must_use]
    pub fn new(subject_id: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            client_id: client_id.into(),
            started_at: Utc::now(),
            steps: Vec::with_capacity(Step::ALL.len()),
            code_fingerprint: None,
        }
    }

    /// Records a passed step.
    pub fn passed(&mut self, step: Step, elapsed: Duration) -> &mut Self {
        self.steps.push(StepReport {
            step,
            status: StepStatus::Passed,
            failure_kind: None,
            message: None,
            duration_ms: millis(elapsed),
        });
        self
    }

    /// Records a failed step.
    pub fn failed(&mut self, step: Step, error: &FlowError, elapsed: Duration) -> &mut Self {
        self.steps.push(StepReport {
            step,
            status: StepStatus::Failed,
            failure_kind: Some(error.kind()),
            message: Some(error.to_string()),
            duration_ms: millis(elapsed),
        });
        self
    }

    /// Records the fingerprint of an issued authorization code.
    pub fn code(&mut self, code: &str) -> &mut Self {
        self.code_fingerprint = Some(fingerprint(code));
        self
    }

    /// Builds the report.
    #[must_use]
    pub fn build(self) -> PairReport {
        let mut steps = self.steps;
        for step in Step::ALL {
            if !steps.iter().any(|s| s.step == step) {
                steps.push(StepReport {
                    step,
                    status: StepStatus::NotRun,
                    failure_kind: None,
                    message: None,
                    duration_ms: 0,
                });
            }
        }
        steps.sort_by_key(|s| Step::ALL.iter().position(|step| *step == s.step));

        PairReport {
            subject_id: self.subject_id,
            client_id: self.client_id,
            started_at: self.started_at,
            steps,
            code_fingerprint: self.code_fingerprint,
        }
    }
}

/// Result of a whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique run identifier.
    pub run_id: Uuid,
    /// Client used for the whole matrix.
    pub client_id: String,
    /// Run start.
    pub started_at: DateTime<Utc>,
    /// Run end.
    pub finished_at: DateTime<Utc>,
    /// Pair results in ascending subject order.
    pub pairs: Vec<PairReport>,
}

impl RunReport {
    /// Returns whether every pair passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.pairs.iter().all(PairReport::passed)
    }

    /// Pairs with a failed step.
    pub fn failed_pairs(&self) -> impl Iterator<Item = &PairReport> {
        self.pairs.iter().filter(|p| !p.passed())
    }

    /// Subject ids that were issued the same authorization code.
    ///
    /// Each inner list holds the subjects sharing one code, in report order.
    #[must_use]
    pub fn reused_codes(&self) -> Vec<Vec<String>> {
        let mut by_code: HashMap<&str, Vec<String>> = HashMap::new();
        for pair in &self.pairs {
            if let Some(fp) = &pair.code_fingerprint {
                by_code.entry(fp.as_str()).or_default().push(pair.subject_id.clone());
            }
        }
        let mut reused: Vec<Vec<String>> = by_code.into_values().filter(|s| s.len() > 1).collect();
        reused.sort();
        reused
    }
}

/// Short, non-reversible fingerprint of a secret value.
#[must_use]
pub fn fingerprint(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    let mut encoded = URL_SAFE_NO_PAD.encode(digest);
    encoded.truncate(16);
    encoded
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
