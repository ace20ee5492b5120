//! `OpenID` Connect Discovery 1.0 metadata.
//!
//! Only the fields the harness consumes are modelled. Unknown fields are
//! ignored.

use serde::{Deserialize, Serialize};
use url::Url;

use fc_core::{Endpoints, SetupError, SetupResult};

/// Well-known path of the provider configuration document.
pub const WELL_KNOWN_PATH: &str = "/.well-known/openid-configuration";

/// `OpenID` Provider Metadata subset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// Issuer identifier.
    pub issuer: String,

    /// URL of the authorization endpoint.
    pub authorization_endpoint: String,

    /// URL of the token endpoint.
    pub token_endpoint: String,

    /// URL of the `UserInfo` endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userinfo_endpoint: Option<String>,

    /// URL of the introspection endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub introspection_endpoint: Option<String>,

    /// List of supported response types.
    #[serde(default)]
    pub response_types_supported: Vec<String>,

    /// List of supported grant types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant_types_supported: Option<Vec<String>>,

    /// List of supported scopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes_supported: Option<Vec<String>>,
}

impl ProviderMetadata {
    /// Location of the metadata document for `authority`.
    pub fn well_known_url(authority: &Url) -> SetupResult<Url> {
        let base = authority.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}{WELL_KNOWN_PATH}"))
            .map_err(|e| SetupError::Discovery(format!("invalid authority '{authority}': {e}")))
    }

    /// Merges the advertised endpoints over `fallback`.
    ///
    /// Discovery has no notion of a grants page, so `fallback.grants` is
    /// always kept. Optional endpoints the provider does not advertise keep
    /// their fallback value.
    pub fn endpoints(&self, fallback: Endpoints) -> SetupResult<Endpoints> {
        let parse = |raw: &str| {
            Url::parse(raw)
                .map_err(|e| SetupError::Discovery(format!("advertised endpoint '{raw}': {e}")))
        };
        Ok(Endpoints {
            authorization: parse(&self.authorization_endpoint)?,
            token: parse(&self.token_endpoint)?,
            userinfo: match &self.userinfo_endpoint {
                Some(raw) => parse(raw)?,
                None => fallback.userinfo,
            },
            introspection: match &self.introspection_endpoint {
                Some(raw) => parse(raw)?,
                None => fallback.introspection,
            },
            grants: fallback.grants,
        })
    }

    /// Returns whether the provider advertises the authorization code flow.
    ///
    /// Providers omitting `grant_types_supported` default to
    /// `authorization_code` and `implicit`.
    #[must_use]
    pub fn supports_authorization_code(&self) -> bool {
        let grant = self
            .grant_types_supported
            .as_ref()
            .is_none_or(|grants| grants.iter().any(|g| g == "authorization_code"));
        let response = self.response_types_supported.is_empty()
            || self.response_types_supported.iter().any(|r| r == "code");
        grant && response
    }
}
