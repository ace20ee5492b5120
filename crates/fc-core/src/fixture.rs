//! Test fixtures: subjects, client registrations and the registry holding them.
//!
//! Fixture files are JSON arrays using the provider's PascalCase field names:
//!
//! ```json
//! [{ "SubjectId": "S1", "Username": "alice", "Password": "alice" }]
//! [{ "ClientId": "client-A", "RedirectUris": ["https://*.example.com/cb"], "AllowedScopes": ["openid"] }]
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{SetupError, SetupResult};

/// Placeholder substituted in redirect URI templates.
pub const REDIRECT_WILDCARD: char = '*';

/// An identity under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TestSubject {
    /// Stable subject identifier; also the run-order key.
    pub subject_id: String,
    /// Material needed to complete the interactive login.
    #[serde(flatten)]
    pub credential: Credential,
}

/// Interactive login credential.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Credential {
    /// Login name typed into the username field.
    pub username: String,
    /// Password typed into the password field.
    pub password: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// An OAuth client registered at the provider.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClientRegistration {
    /// Client identifier.
    pub client_id: String,
    /// Display name shown on the provider's grants page.
    #[serde(default)]
    pub client_name: Option<String>,
    /// Secret for confidential clients.
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Registered redirect URI templates.
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    /// Scopes the client may request.
    #[serde(default)]
    pub allowed_scopes: Vec<String>,
}

impl fmt::Debug for ClientRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientRegistration")
            .field("client_id", &self.client_id)
            .field("client_name", &self.client_name)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("redirect_uris", &self.redirect_uris)
            .field("allowed_scopes", &self.allowed_scopes)
            .finish()
    }
}

impl ClientRegistration {
    /// Resolves the first registered redirect template into a literal URI.
    ///
    /// The first `*` is replaced by `host`. The result is used verbatim for
    /// both the authorization request and the token exchange.
    pub fn resolve_redirect_uri(&self, host: &str) -> SetupResult<String> {
        let template = self.redirect_uris.first().ok_or_else(|| {
            SetupError::RedirectUri(format!("client {} has no redirect uris", self.client_id))
        })?;
        let resolved = template.replacen(REDIRECT_WILDCARD, host, 1);
        Url::parse(&resolved)
            .map_err(|e| SetupError::RedirectUri(format!("'{resolved}' is not a valid url: {e}")))?;
        if !self.matches_redirect_uri(&resolved, host) {
            return Err(SetupError::RedirectUri(format!(
                "'{resolved}' does not match a registered redirect uri"
            )));
        }
        Ok(resolved)
    }

    /// Returns whether `uri` equals a registered template once resolved.
    #[must_use]
    pub fn matches_redirect_uri(&self, uri: &str, host: &str) -> bool {
        self.redirect_uris
            .iter()
            .any(|template| template.replacen(REDIRECT_WILDCARD, host, 1) == uri)
    }

    /// Returns requested scope tokens the client is not registered for.
    ///
    /// An empty `allowed_scopes` list means the fixture does not restrict scopes.
    #[must_use]
    pub fn disallowed_scopes<'a>(&self, scope: &'a str) -> Vec<&'a str> {
        if self.allowed_scopes.is_empty() {
            return Vec::new();
        }
        scope
            .split_whitespace()
            .filter(|token| !self.allowed_scopes.iter().any(|allowed| allowed == token))
            .collect()
    }

    /// Name the grants page is expected to show for this client.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.client_name.as_deref().unwrap_or(&self.client_id)
    }
}

/// Ordered catalog of subjects and client registrations.
#[derive(Debug, Clone, Default)]
pub struct FixtureRegistry {
    subjects: Vec<TestSubject>,
    clients: Vec<ClientRegistration>,
}

impl FixtureRegistry {
    /// Builds a registry, ordering subjects by ascending identifier.
    pub fn new(
        mut subjects: Vec<TestSubject>,
        clients: Vec<ClientRegistration>,
    ) -> SetupResult<Self> {
        subjects.sort_by(|a, b| a.subject_id.cmp(&b.subject_id));

        let mut seen = HashSet::new();
        for subject in &subjects {
            if !seen.insert(subject.subject_id.as_str()) {
                return Err(SetupError::Config(format!(
                    "duplicate subject id: {}",
                    subject.subject_id
                )));
            }
        }

        Ok(Self { subjects, clients })
    }

    /// Loads subjects and clients from JSON files.
    pub fn load(users_file: &Path, clients_file: &Path) -> SetupResult<Self> {
        let subjects: Vec<TestSubject> = read_json(users_file)?;
        let clients: Vec<ClientRegistration> = read_json(clients_file)?;
        tracing::debug!(
            subjects = subjects.len(),
            clients = clients.len(),
            "Loaded fixtures"
        );
        Self::new(subjects, clients)
    }

    /// Subjects in run order.
    #[must_use]
    pub fn subjects(&self) -> &[TestSubject] {
        &self.subjects
    }

    /// All client registrations, in file order.
    #[must_use]
    pub fn clients(&self) -> &[ClientRegistration] {
        &self.clients
    }

    /// Selects a client registration by exact id.
    pub fn client(&self, client_id: &str) -> SetupResult<&ClientRegistration> {
        self.clients
            .iter()
            .find(|c| c.client_id == client_id)
            .ok_or_else(|| SetupError::ClientNotFound(client_id.to_string()))
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> SetupResult<T> {
    let fixture_error = |message: String| SetupError::Fixture {
        path: path.to_path_buf(),
        message,
    };
    let content = std::fs::read_to_string(path).map_err(|e| fixture_error(e.to_string()))?;
    serde_json::from_str(&content).map_err(|e| fixture_error(e.to_string()))
}
