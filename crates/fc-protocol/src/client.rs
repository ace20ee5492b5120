//! HTTP client for the non-interactive protocol calls.
//!
//! Token exchange, user-info and introspection are plain back-channel requests
//! and never go through a browser session. Each public call maps wire errors
//! onto the [`FlowError`] kind of its step so the orchestrator can report it
//! as-is.

use std::time::Duration;

use serde::de::DeserializeOwned;
use url::Url;

use fc_core::{Endpoints, FlowError, FlowResult, SetupError, SetupResult};

use crate::discovery::ProviderMetadata;
use crate::error::{ProtocolError, ProtocolResult};
use crate::request::TokenRequest;
use crate::token::{IntrospectionResponse, TokenSet, UserInfoClaims};

/// Back-channel protocol client bound to one set of endpoints.
#[derive(Debug, Clone)]
pub struct ProtocolClient {
    http: reqwest::Client,
    endpoints: Endpoints,
}

impl ProtocolClient {
    /// Creates a client with its own connection pool.
    pub fn new(endpoints: Endpoints, timeout: Duration) -> ProtocolResult<Self> {
        Ok(Self {
            http: build_http(timeout, false)?,
            endpoints,
        })
    }

    /// Creates a client reusing an existing connection pool.
    #[must_use]
    pub const fn with_http(http: reqwest::Client, endpoints: Endpoints) -> Self {
        Self { http, endpoints }
    }

    /// Exchanges an authorization code at the token endpoint.
    ///
    /// The request is sent exactly once. Codes are single-use, so a failed
    /// attempt is never retried.
    pub async fn exchange_code(&self, request: &TokenRequest) -> FlowResult<TokenSet> {
        tracing::debug!(
            endpoint = %self.endpoints.token,
            client_id = %request.client_id(),
            "Exchanging authorization code"
        );

        let sent = self
            .http
            .post(self.endpoints.token.clone())
            .form(request)
            .send()
            .await;
        let tokens: TokenSet = match sent {
            Ok(response) => read_json(response).await,
            Err(e) => Err(e.into()),
        }
        .map_err(exchange_failure)?;

        if tokens.access_token.is_empty() {
            return Err(FlowError::TokenExchangeFailed {
                status: None,
                error: None,
                description: Some("response carried an empty access_token".to_string()),
            });
        }
        Ok(tokens)
    }

    /// Calls the user-info endpoint with the access token.
    ///
    /// With `expected_subject` set, the returned `sub` must equal it.
    pub async fn userinfo(
        &self,
        tokens: &TokenSet,
        expected_subject: Option<&str>,
    ) -> FlowResult<UserInfoClaims> {
        tracing::debug!(endpoint = %self.endpoints.userinfo, "Fetching user info");

        let sent = self
            .http
            .get(self.endpoints.userinfo.clone())
            .bearer_auth(tokens.bearer())
            .send()
            .await;
        let claims: UserInfoClaims = match sent {
            Ok(response) => read_json(response).await,
            Err(e) => Err(e.into()),
        }
        .map_err(|e| FlowError::ResourceAccessDenied(format!("user-info request failed: {e}")))?;

        if claims.sub.is_empty() {
            return Err(FlowError::ResourceAccessDenied(
                "user-info response has no sub claim".to_string(),
            ));
        }
        if let Some(expected) = expected_subject
            && claims.sub != expected
        {
            return Err(FlowError::ResourceAccessDenied(format!(
                "user-info sub '{}' does not match subject '{expected}'",
                claims.sub
            )));
        }
        Ok(claims)
    }

    /// Introspects the access token on behalf of `audience`.
    ///
    /// The audience authenticates with HTTP Basic when `secret` is given. The
    /// token must be active and, when an `aud` claim is returned, name the
    /// audience.
    pub async fn introspect(
        &self,
        tokens: &TokenSet,
        audience: &str,
        secret: Option<&str>,
    ) -> FlowResult<IntrospectionResponse> {
        tracing::debug!(
            endpoint = %self.endpoints.introspection,
            audience,
            "Introspecting access token"
        );

        let mut builder = self
            .http
            .post(self.endpoints.introspection.clone())
            .form(&[
                ("token", tokens.access_token.as_str()),
                ("token_type_hint", "access_token"),
            ]);
        if let Some(secret) = secret {
            builder = builder.basic_auth(audience, Some(secret));
        }

        let introspection: IntrospectionResponse = match builder.send().await {
            Ok(response) => read_json(response).await,
            Err(e) => Err(e.into()),
        }
        .map_err(|e| FlowError::TokenNotActive(format!("introspection request failed: {e}")))?;

        if !introspection.active {
            return Err(FlowError::TokenNotActive(
                "provider reports the token inactive".to_string(),
            ));
        }
        if !introspection.accepts(audience) {
            let aud = introspection
                .aud
                .as_ref()
                .map(|a| a.names().join(", "))
                .unwrap_or_default();
            return Err(FlowError::TokenNotActive(format!(
                "token audience [{aud}] does not include '{audience}'"
            )));
        }
        Ok(introspection)
    }

    /// Fetches the provider metadata document for `authority`.
    pub async fn discover(http: &reqwest::Client, authority: &Url) -> SetupResult<ProviderMetadata> {
        let url = ProviderMetadata::well_known_url(authority)?;
        tracing::debug!(%url, "Fetching provider metadata");

        let response = http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| SetupError::Discovery(format!("{url}: {e}")))?;
        read_json(response)
            .await
            .map_err(|e| SetupError::Discovery(format!("{url}: {e}")))
    }
}

/// Builds the HTTP client used for back-channel calls.
pub fn build_http(timeout: Duration, accept_invalid_certs: bool) -> ProtocolResult<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .danger_accept_invalid_certs(accept_invalid_certs)
        .build()?)
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> ProtocolResult<T> {
    if !response.status().is_success() {
        return Err(ProtocolError::from_response(response).await);
    }
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| ProtocolError::InvalidResponse(e.to_string()))
}

fn exchange_failure(error: ProtocolError) -> FlowError {
    match error {
        ProtocolError::Status { status, oauth, body } => {
            let (error, description) = match oauth {
                Some(oauth) => (Some(oauth.error), oauth.error_description),
                None if body.is_empty() => (None, None),
                None => (None, Some(body.chars().take(200).collect())),
            };
            FlowError::TokenExchangeFailed {
                status: Some(status),
                error,
                description,
            }
        }
        other => FlowError::exchange_transport(other.to_string()),
    }
}
