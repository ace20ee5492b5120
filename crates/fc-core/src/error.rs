//! Error taxonomy for Flowcheck.
//!
//! Errors fall into two scopes:
//!
//! - [`SetupError`] aborts the whole run before any subject is processed.
//! - [`FlowError`] is terminal for one (subject, client) pair only. The
//!   orchestrator records it and moves on to the next pair.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for setup operations.
pub type SetupResult<T> = std::result::Result<T, SetupError>;

/// Result type for per-pair flow steps.
pub type FlowResult<T> = std::result::Result<T, FlowError>;

/// Errors that abort the run before any pair executes.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The selected client id is not in the fixture registry.
    #[error("client not found in fixtures: {0}")]
    ClientNotFound(String),

    /// A fixture file could not be read or parsed.
    #[error("fixture error in {}: {message}", .path.display())]
    Fixture {
        /// Offending file.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// Invalid or incomplete configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A redirect URI template could not be resolved.
    #[error("redirect uri error: {0}")]
    RedirectUri(String),

    /// Provider discovery failed.
    #[error("discovery error: {0}")]
    Discovery(String),

    /// The browser handle could not be launched.
    #[error("browser error: {0}")]
    Browser(String),
}

/// Errors scoped to a single (subject, client) pair.
///
/// Every variant maps to one [`FailureKind`] so reports stay stable even if
/// messages change.
#[derive(Debug, Error)]
pub enum FlowError {
    /// The interactive pass did not end at the expected redirect with a code.
    #[error("authorization failed: {0}")]
    AuthorizationFailed(String),

    /// An interactive browser step did not finish in time.
    #[error("interaction timed out after {}s during {step}", .timeout.as_secs())]
    InteractionTimeout {
        /// Step that hung (navigation, login, consent, ...).
        step: String,
        /// Bound that was exceeded.
        timeout: Duration,
    },

    /// The token endpoint rejected the exchange.
    #[error("token exchange failed: {}", describe_exchange(.status, .error, .description))]
    TokenExchangeFailed {
        /// HTTP status, absent on transport failure.
        status: Option<u16>,
        /// OAuth error code from the response body.
        error: Option<String>,
        /// OAuth error description, or transport error text.
        description: Option<String>,
    },

    /// The user-info endpoint did not accept the token.
    #[error("resource access denied: {0}")]
    ResourceAccessDenied(String),

    /// Introspection reported the token inactive or for another resource.
    #[error("token not active: {0}")]
    TokenNotActive(String),

    /// No grant for the pair was listed.
    #[error("grant not found for subject {subject_id} and client {client_id}")]
    GrantNotFound {
        /// Subject identifier.
        subject_id: String,
        /// Client identifier.
        client_id: String,
    },
}

fn describe_exchange(
    status: &Option<u16>,
    error: &Option<String>,
    description: &Option<String>,
) -> String {
    let mut parts = Vec::new();
    if let Some(status) = status {
        parts.push(format!("status {status}"));
    }
    if let Some(error) = error {
        parts.push(error.clone());
    }
    if let Some(description) = description {
        parts.push(description.clone());
    }
    if parts.is_empty() {
        "no response".to_string()
    } else {
        parts.join(" - ")
    }
}

impl FlowError {
    /// Returns the failure kind reported for this error.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::AuthorizationFailed(_) => FailureKind::AuthorizationFailed,
            Self::InteractionTimeout { .. } => FailureKind::InteractionTimeout,
            Self::TokenExchangeFailed { .. } => FailureKind::TokenExchangeFailed,
            Self::ResourceAccessDenied(_) => FailureKind::ResourceAccessDenied,
            Self::TokenNotActive(_) => FailureKind::TokenNotActive,
            Self::GrantNotFound { .. } => FailureKind::GrantNotFound,
        }
    }

    /// Convenience constructor for transport-level exchange failures.
    #[must_use]
    pub fn exchange_transport(message: impl Into<String>) -> Self {
        Self::TokenExchangeFailed {
            status: None,
            error: None,
            description: Some(message.into()),
        }
    }
}

/// Stable failure kinds surfaced in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// See [`FlowError::AuthorizationFailed`].
    AuthorizationFailed,
    /// See [`FlowError::InteractionTimeout`].
    InteractionTimeout,
    /// See [`FlowError::TokenExchangeFailed`].
    TokenExchangeFailed,
    /// See [`FlowError::ResourceAccessDenied`].
    ResourceAccessDenied,
    /// See [`FlowError::TokenNotActive`].
    TokenNotActive,
    /// See [`FlowError::GrantNotFound`].
    GrantNotFound,
}

impl FailureKind {
    /// Returns the kind as it appears in reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuthorizationFailed => "AuthorizationFailed",
            Self::InteractionTimeout => "InteractionTimeout",
            Self::TokenExchangeFailed => "TokenExchangeFailed",
            Self::ResourceAccessDenied => "ResourceAccessDenied",
            Self::TokenNotActive => "TokenNotActive",
            Self::GrantNotFound => "GrantNotFound",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
