//! CLI error types.

use thiserror::Error;

use fc_core::SetupError;

/// CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// The run could not be set up.
    #[error(transparent)]
    Setup(#[from] SetupError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit status for this error.
    ///
    /// Setup problems exit with 2 so they can be told apart from failed
    /// pairs, which exit with 1.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Setup(_) => 2,
            Self::Io(_) | Self::Json(_) => 1,
        }
    }
}

/// CLI result type.
pub type CliResult<T> = Result<T, CliError>;
