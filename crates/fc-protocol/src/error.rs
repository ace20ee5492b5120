//! Protocol error types.
//!
//! [`ErrorResponse`] is the OAuth 2.0 error document (RFC 6749 section 5.2).
//! [`ProtocolError`] covers everything that can go wrong on the wire. Callers
//! in the harness map it onto the per-step `FlowError` kind.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OAuth 2.0 error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code.
    pub error: String,

    /// Human-readable error description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,

    /// URI with more information about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_uri: Option<String>,
}

/// Wire-level protocol errors.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status, with the OAuth error document when one was sent.
    #[error("{status}: {}", describe(.oauth, .body))]
    Status {
        /// HTTP status code.
        status: u16,
        /// Parsed OAuth error body.
        oauth: Option<ErrorResponse>,
        /// Raw body when it was not an OAuth error document.
        body: String,
    },

    /// Success status with a body that does not match the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

fn describe(oauth: &Option<ErrorResponse>, body: &str) -> String {
    match oauth {
        Some(ErrorResponse {
            error,
            error_description: Some(description),
            ..
        }) => format!("{error} ({description})"),
        Some(ErrorResponse { error, .. }) => error.clone(),
        None if body.is_empty() => "empty body".to_string(),
        None => body.chars().take(200).collect(),
    }
}

impl ProtocolError {
    /// Builds a status error from a failed response.
    pub async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let oauth = serde_json::from_str::<ErrorResponse>(&body).ok();
        Self::Status { status, oauth, body }
    }
}

/// Result type for protocol calls.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
