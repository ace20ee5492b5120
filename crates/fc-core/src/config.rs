//! Harness configuration.
//!
//! Configuration is loaded from a TOML file or from `FC_*` environment
//! variables (after reading `.env` when present). Every field has a default,
//! so an empty file or an empty environment yields a runnable configuration
//! pointed at `https://localhost:5001`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{SetupError, SetupResult};

/// Main configuration structure for a harness run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Identity provider endpoints.
    pub provider: ProviderConfig,
    /// Client selection and request parameters.
    pub client: ClientConfig,
    /// Fixture file locations.
    pub fixtures: FixtureConfig,
    /// Login and consent form description.
    pub interaction: InteractionProfile,
    /// Request and interaction bounds.
    pub timeouts: TimeoutConfig,
    /// Number of pairs allowed to run at once.
    pub concurrency: Concurrency,
}

/// Identity provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Provider base URL (issuer).
    pub authority: String,
    /// Resolve endpoints from `/.well-known/openid-configuration`.
    pub discovery: bool,
    /// Authorization endpoint override.
    pub authorization_endpoint: Option<String>,
    /// Token endpoint override.
    pub token_endpoint: Option<String>,
    /// User-info endpoint override.
    pub userinfo_endpoint: Option<String>,
    /// Introspection endpoint override.
    pub introspection_endpoint: Option<String>,
    /// Grant management page override.
    pub grants_endpoint: Option<String>,
    /// Accept self-signed TLS certificates (local development providers).
    pub accept_invalid_certs: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            authority: "https://localhost:5001".to_string(),
            discovery: false,
            authorization_endpoint: None,
            token_endpoint: None,
            userinfo_endpoint: None,
            introspection_endpoint: None,
            grants_endpoint: None,
            accept_invalid_certs: false,
        }
    }
}

impl ProviderConfig {
    /// Returns the authority as a URL.
    pub fn authority_url(&self) -> SetupResult<Url> {
        Url::parse(&self.authority)
            .map_err(|e| SetupError::Config(format!("invalid authority '{}': {e}", self.authority)))
    }

    /// Resolves endpoints from the conventional paths plus explicit overrides.
    pub fn endpoints(&self) -> SetupResult<Endpoints> {
        let conventional = Endpoints::conventional(&self.authority_url()?)?;
        self.apply_overrides(conventional)
    }

    /// Applies explicitly configured endpoints on top of `base`.
    ///
    /// `base` is either the conventional set or the one obtained through
    /// discovery. Explicit configuration always wins.
    pub fn apply_overrides(&self, mut base: Endpoints) -> SetupResult<Endpoints> {
        let overrides = [
            (&self.authorization_endpoint, &mut base.authorization),
            (&self.token_endpoint, &mut base.token),
            (&self.userinfo_endpoint, &mut base.userinfo),
            (&self.introspection_endpoint, &mut base.introspection),
            (&self.grants_endpoint, &mut base.grants),
        ];
        for (configured, target) in overrides {
            if let Some(raw) = configured {
                *target = parse_endpoint(raw)?;
            }
        }
        Ok(base)
    }
}

/// Resolved provider endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    /// Authorization endpoint (browser-navigated).
    pub authorization: Url,
    /// Token endpoint.
    pub token: Url,
    /// User-info endpoint.
    pub userinfo: Url,
    /// Introspection endpoint.
    pub introspection: Url,
    /// Grant management page (browser-navigated).
    pub grants: Url,
}

impl Endpoints {
    /// Builds the endpoint set from the `/connect/*` convention.
    pub fn conventional(authority: &Url) -> SetupResult<Self> {
        let base = authority.as_str().trim_end_matches('/');
        let at = |path: &str| parse_endpoint(&format!("{base}{path}"));
        Ok(Self {
            authorization: at("/connect/authorize")?,
            token: at("/connect/token")?,
            userinfo: at("/connect/userinfo")?,
            introspection: at("/connect/introspect")?,
            grants: at("/grants")?,
        })
    }
}

fn parse_endpoint(raw: &str) -> SetupResult<Url> {
    Url::parse(raw).map_err(|e| SetupError::Config(format!("invalid endpoint '{raw}': {e}")))
}

/// Client selection and authorization request parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Client id selected from the fixture registry.
    pub client_id: String,
    /// Requested scope (space-delimited).
    pub scope: String,
    /// Literal substituted for `*` in redirect URI templates.
    pub redirect_host: String,
    /// Fixed `state`; a random value per pair when absent.
    pub state: Option<String>,
    /// Fixed `nonce`; a random value per pair when absent.
    pub nonce: Option<String>,
    /// Resource expected as the token audience during introspection.
    pub introspection_audience: String,
    /// Secret the audience uses to authenticate at the introspection endpoint.
    pub introspection_secret: Option<String>,
    /// Require the user-info `sub` claim to equal the subject identifier.
    pub match_userinfo_subject: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_id: "authorization-code-client-id".to_string(),
            scope: "openid profile email some-custom-identity some-app-scope-1".to_string(),
            redirect_host: "www".to_string(),
            state: None,
            nonce: None,
            introspection_audience: "some-app".to_string(),
            introspection_secret: None,
            match_userinfo_subject: true,
        }
    }
}

/// Fixture file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureConfig {
    /// JSON array of test subjects.
    pub users_file: PathBuf,
    /// JSON array of client registrations.
    pub clients_file: PathBuf,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            users_file: PathBuf::from("config/user-configuration.json"),
            clients_file: PathBuf::from("config/clients-configuration.json"),
        }
    }
}

/// Provider-specific description of the login and consent forms.
///
/// The driver treats a form carrying [`password_field`](Self::password_field)
/// as the login form and a form carrying a
/// [`consent_button`](Self::consent_button) submit control as the consent form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionProfile {
    /// Name of the username input.
    pub username_field: String,
    /// Name of the password input.
    pub password_field: String,
    /// Extra fields sent with the login form (e.g. a submit button value).
    pub login_fields: BTreeMap<String, String>,
    /// Name of the consent approval control.
    pub consent_button: String,
    /// Value sent for the consent approval control.
    pub consent_value: String,
    /// Upper bound on login/consent round trips before giving up.
    pub max_rounds: usize,
}

impl Default for InteractionProfile {
    fn default() -> Self {
        Self {
            username_field: "username".to_string(),
            password_field: "password".to_string(),
            login_fields: BTreeMap::new(),
            consent_button: "consent".to_string(),
            consent_value: "yes".to_string(),
            max_rounds: 8,
        }
    }
}

/// Request and interaction bounds, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Timeout for plain HTTP calls (token, user-info, introspection).
    pub http_secs: u64,
    /// Bound on each interactive browser step.
    pub interaction_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            http_secs: 30,
            interaction_secs: 30,
        }
    }
}

impl TimeoutConfig {
    /// HTTP request timeout.
    #[must_use]
    pub const fn http(&self) -> Duration {
        Duration::from_secs(self.http_secs)
    }

    /// Interactive step bound.
    #[must_use]
    pub const fn interaction(&self) -> Duration {
        Duration::from_secs(self.interaction_secs)
    }
}

/// Number of pairs run in parallel (1 = sequential).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Concurrency(pub usize);

impl Default for Concurrency {
    fn default() -> Self {
        Self(1)
    }
}

impl HarnessConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> SetupResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SetupError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| SetupError::Config(format!("failed to parse {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from `FC_*` environment variables.
    ///
    /// A `.env` file in the working directory is read first when present.
    pub fn from_env() -> SetupResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> SetupResult<Self> {
        let mut config = Self::default();

        if let Some(v) = lookup("FC_AUTHORITY") {
            config.provider.authority = v;
        }
        if let Some(v) = lookup("FC_DISCOVERY") {
            config.provider.discovery = parse_flag(&v);
        }
        config.provider.authorization_endpoint = lookup("FC_AUTHORIZATION_ENDPOINT");
        config.provider.token_endpoint = lookup("FC_TOKEN_ENDPOINT");
        config.provider.userinfo_endpoint = lookup("FC_USERINFO_ENDPOINT");
        config.provider.introspection_endpoint = lookup("FC_INTROSPECTION_ENDPOINT");
        config.provider.grants_endpoint = lookup("FC_GRANTS_ENDPOINT");
        if let Some(v) = lookup("FC_ACCEPT_INVALID_CERTS") {
            config.provider.accept_invalid_certs = parse_flag(&v);
        }

        if let Some(v) = lookup("FC_CLIENT_ID") {
            config.client.client_id = v;
        }
        if let Some(v) = lookup("FC_SCOPE") {
            config.client.scope = v;
        }
        if let Some(v) = lookup("FC_REDIRECT_HOST") {
            config.client.redirect_host = v;
        }
        config.client.state = lookup("FC_STATE");
        config.client.nonce = lookup("FC_NONCE");
        if let Some(v) = lookup("FC_INTROSPECTION_AUDIENCE") {
            config.client.introspection_audience = v;
        }
        config.client.introspection_secret = lookup("FC_INTROSPECTION_SECRET");
        if let Some(v) = lookup("FC_MATCH_USERINFO_SUBJECT") {
            config.client.match_userinfo_subject = parse_flag(&v);
        }

        if let Some(v) = lookup("FC_USERS_FILE") {
            config.fixtures.users_file = PathBuf::from(v);
        }
        if let Some(v) = lookup("FC_CLIENTS_FILE") {
            config.fixtures.clients_file = PathBuf::from(v);
        }

        if let Some(v) = lookup("FC_USERNAME_FIELD") {
            config.interaction.username_field = v;
        }
        if let Some(v) = lookup("FC_PASSWORD_FIELD") {
            config.interaction.password_field = v;
        }
        if let Some(v) = lookup("FC_CONSENT_BUTTON") {
            config.interaction.consent_button = v;
        }
        if let Some(v) = lookup("FC_CONSENT_VALUE") {
            config.interaction.consent_value = v;
        }

        config.timeouts.http_secs = parse_number(&lookup, "FC_HTTP_TIMEOUT_SECS", config.timeouts.http_secs)?;
        config.timeouts.interaction_secs = parse_number(
            &lookup,
            "FC_INTERACTION_TIMEOUT_SECS",
            config.timeouts.interaction_secs,
        )?;
        config.concurrency = Concurrency(parse_number(&lookup, "FC_CONCURRENCY", config.concurrency.0)?);

        config.validate()?;
        Ok(config)
    }

    /// Creates a configuration for in-process tests against `base_url`.
    #[must_use]
    pub fn for_testing(base_url: &str) -> Self {
        let mut config = Self::default();
        config.provider.authority = base_url.to_string();
        config.timeouts = TimeoutConfig {
            http_secs: 5,
            interaction_secs: 5,
        };
        config
    }

    /// Checks the configuration for values that cannot produce a run.
    pub fn validate(&self) -> SetupResult<()> {
        if self.client.client_id.trim().is_empty() {
            return Err(SetupError::Config("client_id must not be empty".to_string()));
        }
        if self.client.scope.split_whitespace().next().is_none() {
            return Err(SetupError::Config("scope must not be empty".to_string()));
        }
        if self.concurrency.0 == 0 {
            return Err(SetupError::Config("concurrency must be at least 1".to_string()));
        }
        if self.timeouts.http_secs == 0 || self.timeouts.interaction_secs == 0 {
            return Err(SetupError::Config("timeouts must be positive".to_string()));
        }
        if self.interaction.max_rounds == 0 {
            return Err(SetupError::Config("max_rounds must be at least 1".to_string()));
        }
        self.provider.authority_url()?;
        Ok(())
    }
}

fn parse_flag(value: &str) -> bool {
    let value = value.trim().to_lowercase();
    value != "false" && value != "0" && !value.is_empty()
}

fn parse_number<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> SetupResult<T>
where
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| SetupError::Config(format!("{key} must be a number, got '{raw}'"))),
        None => Ok(default),
    }
}
