//! Authorization request parameters and the redirect that answers them.

use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;
use rand::distr::Alphanumeric;
use serde::Serialize;
use url::Url;

use fc_core::{FlowError, FlowResult};

/// The only response type this harness requests.
pub const RESPONSE_TYPE_CODE: &str = "code";

/// Grant type used for the exchange.
pub const GRANT_TYPE_AUTHORIZATION_CODE: &str = "authorization_code";

/// Parameters of one authorization request.
///
/// Immutable once built. The same value produces both the authorization URL
/// and the matching token request, so `redirect_uri` and `scope` cannot drift
/// between the two calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequestParameters {
    client_id: String,
    scope: String,
    redirect_uri: String,
    state: String,
    nonce: String,
}

impl AuthorizationRequestParameters {
    /// Creates request parameters with explicit correlation values.
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        scope: impl Into<String>,
        redirect_uri: impl Into<String>,
        state: impl Into<String>,
        nonce: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            scope: scope.into(),
            redirect_uri: redirect_uri.into(),
            state: state.into(),
            nonce: nonce.into(),
        }
    }

    /// Creates request parameters, generating `state` and `nonce` when absent.
    #[must_use]
    pub fn with_correlation(
        client_id: impl Into<String>,
        scope: impl Into<String>,
        redirect_uri: impl Into<String>,
        state: Option<&str>,
        nonce: Option<&str>,
    ) -> Self {
        let state = state.map_or_else(random_token, str::to_string);
        let nonce = nonce.map_or_else(random_token, str::to_string);
        Self::new(client_id, scope, redirect_uri, state, nonce)
    }

    /// Client identifier.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Requested scope.
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Always `code`.
    #[must_use]
    pub const fn response_type(&self) -> &'static str {
        RESPONSE_TYPE_CODE
    }

    /// Resolved redirect URI.
    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Correlation token echoed by the provider.
    #[must_use]
    pub fn state(&self) -> &str {
        &self.state
    }

    /// OIDC replay-protection token.
    #[must_use]
    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    /// Builds the authorization endpoint URL with all parameters encoded.
    #[must_use]
    pub fn authorization_url(&self, endpoint: &Url) -> Url {
        let mut url = endpoint.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("scope", &self.scope)
            .append_pair("response_type", RESPONSE_TYPE_CODE)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("state", &self.state)
            .append_pair("nonce", &self.nonce);
        url
    }

    /// Builds the token request consuming `code`.
    #[must_use]
    pub fn token_request(&self, code: String, client_secret: Option<String>) -> TokenRequest {
        TokenRequest {
            grant_type: GRANT_TYPE_AUTHORIZATION_CODE,
            code,
            redirect_uri: self.redirect_uri.clone(),
            client_id: self.client_id.clone(),
            scope: self.scope.clone(),
            client_secret,
        }
    }
}

/// Random URL-safe correlation token.
#[must_use]
pub fn random_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// Token endpoint request for the authorization code grant.
#[derive(Clone, Serialize)]
pub struct TokenRequest {
    grant_type: &'static str,
    code: String,
    redirect_uri: String,
    client_id: String,
    scope: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_secret: Option<String>,
}

impl TokenRequest {
    /// Client identifier.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }
}

impl fmt::Debug for TokenRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRequest")
            .field("grant_type", &self.grant_type)
            .field("code", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("client_id", &self.client_id)
            .field("scope", &self.scope)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// The terminal redirect of an authorization pass.
#[derive(Clone)]
pub struct AuthorizationResult {
    url: Url,
    params: BTreeMap<String, String>,
}

impl AuthorizationResult {
    /// Parses the query of the redirect URL.
    #[must_use]
    pub fn from_url(url: Url) -> Self {
        let params = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self { url, params }
    }

    /// A query parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Authorization code, when present.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.param("code")
    }

    /// Echoed state.
    #[must_use]
    pub fn state(&self) -> Option<&str> {
        self.param("state")
    }

    /// Checks the redirect against the request and returns the code.
    ///
    /// Fails with `AuthorizationFailed` when the provider redirected with an
    /// error, when `state` does not round-trip, or when no code was issued.
    pub fn into_code(self, request: &AuthorizationRequestParameters) -> FlowResult<String> {
        if let Some(error) = self.param("error") {
            let description = self.param("error_description").unwrap_or("no description");
            return Err(FlowError::AuthorizationFailed(format!(
                "provider redirected with error {error}: {description}"
            )));
        }
        match self.state() {
            Some(state) if state == request.state() => {}
            Some(_) => {
                return Err(FlowError::AuthorizationFailed(
                    "state echoed by provider does not match request".to_string(),
                ));
            }
            None => {
                return Err(FlowError::AuthorizationFailed(
                    "redirect carried no state".to_string(),
                ));
            }
        }
        let Some(code) = self.params.get("code").filter(|c| !c.is_empty()) else {
            return Err(FlowError::AuthorizationFailed(
                "redirect carried no code".to_string(),
            ));
        };
        Ok(code.clone())
    }
}

impl fmt::Debug for AuthorizationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut url = self.url.clone();
        url.set_query(None);
        f.debug_struct("AuthorizationResult")
            .field("url", &url.as_str())
            .field("params", &self.params.keys().collect::<Vec<_>>())
            .finish()
    }
}
