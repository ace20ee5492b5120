//! # fc-protocol
//!
//! Client side of the OAuth 2.0 / `OpenID` Connect protocol, as needed by the
//! authorization code conformance run.
//!
//! ## Modules
//!
//! - [`request`] - authorization request parameters and redirect parsing
//! - [`token`] - token, user-info and introspection response types
//! - [`discovery`] - `OpenID` Provider Metadata
//! - [`client`] - HTTP calls: token exchange, user-info, introspection, discovery
//! - [`error`] - OAuth error documents and transport errors

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod client;
pub mod discovery;
pub mod error;
pub mod request;
pub mod token;

pub use client::ProtocolClient;
pub use discovery::ProviderMetadata;
pub use error::{ErrorResponse, ProtocolError, ProtocolResult};
pub use request::{AuthorizationRequestParameters, AuthorizationResult, TokenRequest};
pub use token::{Audience, IntrospectionResponse, TokenSet, UserInfoClaims};
