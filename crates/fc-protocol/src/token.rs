//! Token, user-info and introspection response documents.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Token endpoint response (RFC 6749 section 5.1).
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenSet {
    /// The access token.
    pub access_token: String,

    /// Token type (usually "Bearer").
    #[serde(default)]
    pub token_type: Option<String>,

    /// Lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,

    /// Refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// ID token (OIDC).
    #[serde(default)]
    pub id_token: Option<String>,

    /// Granted scope, when it differs from the requested one.
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenSet {
    /// Value for the `Authorization` header.
    #[must_use]
    pub fn bearer(&self) -> &str {
        &self.access_token
    }
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("TokenSet")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("refresh_token", &redact(&self.refresh_token))
            .field("id_token", &redact(&self.id_token))
            .field("scope", &self.scope)
            .finish()
    }
}

/// User-info response. Only `sub` is interpreted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserInfoClaims {
    /// Subject identifier.
    #[serde(default)]
    pub sub: String,

    /// Every other claim, as returned.
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

/// Introspection response (RFC 7662), reduced to the claims the harness checks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntrospectionResponse {
    /// Whether the provider still honours the token.
    pub active: bool,

    /// `aud` claim, when the provider returns one.
    #[serde(default)]
    pub aud: Option<Audience>,
}

impl IntrospectionResponse {
    /// Returns whether the token is usable by `audience`.
    ///
    /// A response without an `aud` claim is accepted as long as it is active.
    #[must_use]
    pub fn accepts(&self, audience: &str) -> bool {
        self.active
            && self
                .aud
                .as_ref()
                .is_none_or(|aud| aud.names().iter().any(|name| name == audience))
    }
}

/// `aud` is either one string or an array of them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    /// `"aud": "some-app"`.
    One(String),
    /// `"aud": ["api", "some-app"]`.
    Many(Vec<String>),
}

impl Audience {
    /// Every audience named by the claim.
    #[must_use]
    pub fn names(&self) -> &[String] {
        match self {
            Self::One(name) => std::slice::from_ref(name),
            Self::Many(names) => names,
        }
    }
}
