//! Run preparation.
//!
//! Everything here happens before the first pair and fails with a
//! [`SetupError`], which aborts the run.

use fc_browser::RedirectMatcher;
use fc_core::{ClientRegistration, Endpoints, FixtureRegistry, HarnessConfig, SetupError, SetupResult};
use fc_protocol::ProtocolClient;

/// Resolves provider endpoints from configuration, using discovery when enabled.
///
/// Explicitly configured endpoints override both the conventional paths and
/// discovered ones.
pub async fn resolve_endpoints(config: &HarnessConfig, http: &reqwest::Client) -> SetupResult<Endpoints> {
    let provider = &config.provider;
    if !provider.discovery {
        return provider.endpoints();
    }

    let authority = provider.authority_url()?;
    let metadata = ProtocolClient::discover(http, &authority).await?;
    if !metadata.supports_authorization_code() {
        tracing::warn!(
            issuer = %metadata.issuer,
            "Provider does not advertise the authorization code flow"
        );
    }
    let endpoints = metadata.endpoints(Endpoints::conventional(&authority)?)?;
    tracing::info!(
        issuer = %metadata.issuer,
        authorization = %endpoints.authorization,
        token = %endpoints.token,
        "Discovered provider endpoints"
    );
    provider.apply_overrides(endpoints)
}

/// The client side of a run, fixed for every pair.
#[derive(Debug, Clone)]
pub struct RunPlan {
    /// Selected client registration.
    pub client: ClientRegistration,
    /// Resolved redirect URI, sent with both the request and the exchange.
    pub redirect_uri: String,
    /// Interception target for the redirect URI.
    pub matcher: RedirectMatcher,
}

impl RunPlan {
    /// Selects the configured client and resolves its redirect URI.
    pub fn prepare(config: &HarnessConfig, registry: &FixtureRegistry) -> SetupResult<Self> {
        let client = registry.client(&config.client.client_id)?.clone();
        let redirect_uri = client.resolve_redirect_uri(&config.client.redirect_host)?;
        let matcher =
            RedirectMatcher::new(&redirect_uri).map_err(|e| SetupError::RedirectUri(e.to_string()))?;

        let disallowed = client.disallowed_scopes(&config.client.scope);
        if !disallowed.is_empty() {
            tracing::warn!(
                client = %client.client_id,
                scopes = ?disallowed,
                "Requested scopes are not registered for the client"
            );
        }

        Ok(Self {
            client,
            redirect_uri,
            matcher,
        })
    }
}
