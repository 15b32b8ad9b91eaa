// ABOUTME: OAuth 2.0 data models for client registration, authorization, and token exchange
// ABOUTME: Implements RFC 7591 and OAuth 2.0 request/response structures plus domain records
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 u2-mcp contributors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Internal error taxonomy for the authorization flow.
///
/// Each variant maps onto one wire shape via [`AuthError::to_oauth2_error`].
/// Expired and never-issued artifacts deliberately map to the same variant so
/// callers cannot distinguish them.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Client registration payload failed validation (RFC 7591)
    #[error("invalid client metadata: {0}")]
    InvalidClientMetadata(String),

    /// Malformed or unacceptable protocol request
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Code, token, verifier, or binding rejected at the token endpoint
    #[error("invalid grant: {0}")]
    InvalidGrant(String),

    /// The external identity provider rejected the login or misbehaved
    #[error("identity provider error: {0}")]
    IdentityProvider(String),

    /// Callback arrived for an unknown or expired authorization session
    #[error("authorization session expired or invalid")]
    SessionExpiredOrInvalid,

    /// Unexpected internal failure (RNG, state collision)
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Convert to the RFC 6749 wire error object
    #[must_use]
    pub fn to_oauth2_error(&self) -> OAuth2Error {
        match self {
            AuthError::InvalidClientMetadata(msg) => OAuth2Error::invalid_client_metadata(msg),
            AuthError::InvalidRequest(msg) => OAuth2Error::invalid_request(msg),
            AuthError::InvalidGrant(msg) => OAuth2Error::invalid_grant(msg),
            // Adapter errors carry transport detail (provider URLs, reqwest
            // messages); only the generic description goes on the wire. The
            // detail stays in the server log.
            AuthError::IdentityProvider(_) => OAuth2Error::server_error("Identity provider error"),
            AuthError::SessionExpiredOrInvalid => {
                OAuth2Error::invalid_request("Authorization session expired or invalid")
            }
            AuthError::Internal(_) => OAuth2Error::server_error("Internal server error"),
        }
    }

    /// HTTP status code for this error when returned directly as JSON
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            AuthError::InvalidClientMetadata(_)
            | AuthError::InvalidRequest(_)
            | AuthError::InvalidGrant(_)
            | AuthError::SessionExpiredOrInvalid => 400,
            AuthError::IdentityProvider(_) => 502,
            AuthError::Internal(_) => 500,
        }
    }
}

/// OAuth 2.0 Error Response (RFC 6749 Section 5.2)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuth2Error {
    /// Error code
    pub error: String,
    /// Human-readable error description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
    /// URI for error information
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_uri: Option<String>,
}

impl OAuth2Error {
    /// Create an `invalid_request` error
    #[must_use]
    pub fn invalid_request(description: &str) -> Self {
        Self {
            error: "invalid_request".to_owned(),
            error_description: Some(description.to_owned()),
            error_uri: Some(
                "https://datatracker.ietf.org/doc/html/rfc6749#section-4.1.2.1".to_owned(),
            ),
        }
    }

    /// Create an `invalid_client_metadata` error (RFC 7591 Section 3.2.2)
    #[must_use]
    pub fn invalid_client_metadata(description: &str) -> Self {
        Self {
            error: "invalid_client_metadata".to_owned(),
            error_description: Some(description.to_owned()),
            error_uri: Some(
                "https://datatracker.ietf.org/doc/html/rfc7591#section-3.2.2".to_owned(),
            ),
        }
    }

    /// Create an `invalid_grant` error
    #[must_use]
    pub fn invalid_grant(description: &str) -> Self {
        Self {
            error: "invalid_grant".to_owned(),
            error_description: Some(description.to_owned()),
            error_uri: Some("https://datatracker.ietf.org/doc/html/rfc6749#section-5.2".to_owned()),
        }
    }

    /// Create an `invalid_client` error
    #[must_use]
    pub fn invalid_client() -> Self {
        Self {
            error: "invalid_client".to_owned(),
            error_description: Some("Client authentication failed".to_owned()),
            error_uri: Some("https://datatracker.ietf.org/doc/html/rfc6749#section-5.2".to_owned()),
        }
    }

    /// Create an `unsupported_grant_type` error
    #[must_use]
    pub fn unsupported_grant_type() -> Self {
        Self {
            error: "unsupported_grant_type".to_owned(),
            error_description: Some("Grant type not supported".to_owned()),
            error_uri: Some("https://datatracker.ietf.org/doc/html/rfc6749#section-5.2".to_owned()),
        }
    }

    /// Create an `invalid_scope` error (RFC 6749 Section 4.1.2.1)
    #[must_use]
    pub fn invalid_scope(description: &str) -> Self {
        Self {
            error: "invalid_scope".to_owned(),
            error_description: Some(description.to_owned()),
            error_uri: Some(
                "https://datatracker.ietf.org/doc/html/rfc6749#section-4.1.2.1".to_owned(),
            ),
        }
    }

    /// Create a `server_error` error
    #[must_use]
    pub fn server_error(description: &str) -> Self {
        Self {
            error: "server_error".to_owned(),
            error_description: Some(description.to_owned()),
            error_uri: None,
        }
    }
}

/// Identity established by the external provider, carried through codes and
/// tokens. Provider-specific attributes stay opaque to the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Stable subject identifier from the provider
    pub subject: String,
    /// Email address, when the provider released it
    pub email: Option<String>,
    /// Display name, when the provider released it
    pub name: Option<String>,
    /// Local scopes granted to the holder
    pub scopes: Vec<String>,
    /// Raw provider attributes, passed through unmodified
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl IdentityClaims {
    /// Check whether a local scope was granted
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}

/// A dynamically registered OAuth client
#[derive(Debug, Clone)]
pub struct RegisteredClient {
    /// Unique client identifier
    pub client_id: String,
    /// Exact redirect URIs this client may use
    pub redirect_uris: Vec<String>,
    /// Display name
    pub client_name: Option<String>,
    /// Scopes this client may be granted
    pub allowed_scopes: Vec<String>,
    /// Registration time
    pub created_at: DateTime<Utc>,
}

/// An in-flight authorization: created at `/authorize`, consumed at the
/// provider callback
#[derive(Debug, Clone)]
pub struct AuthorizationSession {
    /// Server-generated state, also the key on the IdP leg
    pub state: String,
    /// Client that initiated the flow
    pub client_id: String,
    /// Redirect URI the client supplied (already validated)
    pub client_redirect_uri: String,
    /// The client's own state parameter, echoed back on completion
    pub client_state: Option<String>,
    /// Local scopes the client requested
    pub requested_scopes: Vec<String>,
    /// Client's PKCE challenge, carried to the minted code
    pub pkce_challenge: String,
    /// PKCE verifier for this server's own leg against the IdP
    pub idp_pkce_verifier: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Expiry time
    pub expires_at: DateTime<Utc>,
}

impl AuthorizationSession {
    /// Whether this session has passed its expiry
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// A single-use authorization code minted after a successful IdP callback
#[derive(Debug, Clone)]
pub struct AuthorizationCode {
    /// The code value
    pub code: String,
    /// Client the code is bound to
    pub client_id: String,
    /// Verified identity from the provider
    pub claims: IdentityClaims,
    /// PKCE challenge the redeeming verifier must match
    pub pkce_challenge: String,
    /// Redirect URI the code is bound to
    pub redirect_uri: String,
    /// Expiry time
    pub expires_at: DateTime<Utc>,
}

impl AuthorizationCode {
    /// Whether this code has passed its expiry
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// An opaque access token record
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// The token value
    pub token: String,
    /// Client the token was issued to
    pub client_id: String,
    /// Identity the token represents
    pub claims: IdentityClaims,
    /// Issue time
    pub issued_at: DateTime<Utc>,
    /// Expiry time
    pub expires_at: DateTime<Utc>,
    /// Revocation flag
    pub revoked: bool,
    /// The refresh token this access token was minted alongside, for
    /// refresh-side revocation cascade
    pub refresh_parent: Option<String>,
}

/// An opaque refresh token record
#[derive(Debug, Clone)]
pub struct RefreshToken {
    /// The token value
    pub token: String,
    /// Client the token was issued to
    pub client_id: String,
    /// Identity the token represents
    pub claims: IdentityClaims,
    /// Issue time
    pub issued_at: DateTime<Utc>,
    /// Expiry time
    pub expires_at: DateTime<Utc>,
    /// Revocation flag (set on rotation and explicit revoke)
    pub revoked: bool,
    /// How many rotations preceded this token
    pub rotation_count: u32,
}

/// OAuth 2.0 Client Registration Request (RFC 7591)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientRegistrationRequest {
    /// Redirect URIs for authorization code flow
    pub redirect_uris: Vec<String>,
    /// Optional client name for display
    pub client_name: Option<String>,
    /// Grant types the client can use
    pub grant_types: Option<Vec<String>>,
    /// Response types the client can use
    pub response_types: Option<Vec<String>>,
    /// Scopes the client can request
    pub scope: Option<String>,
}

/// OAuth 2.0 Client Registration Response (RFC 7591)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientRegistrationResponse {
    /// Unique client identifier
    pub client_id: String,
    /// When the client identifier was issued (unix seconds)
    pub client_id_issued_at: i64,
    /// Redirect URIs registered for this client
    pub redirect_uris: Vec<String>,
    /// Grant types allowed for this client
    pub grant_types: Vec<String>,
    /// Response types allowed for this client
    pub response_types: Vec<String>,
    /// Client name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    /// Scopes this client can request
    pub scope: String,
    /// Public clients authenticate with PKCE only
    pub token_endpoint_auth_method: String,
}

/// Query parameters for `GET /authorize`
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizeParams {
    /// Response type (must be `code`)
    pub response_type: String,
    /// Client identifier
    pub client_id: String,
    /// Redirect URI for response
    pub redirect_uri: String,
    /// Requested scopes
    pub scope: Option<String>,
    /// Client state parameter for CSRF protection
    pub state: Option<String>,
    /// PKCE code challenge (RFC 7636)
    pub code_challenge: Option<String>,
    /// PKCE code challenge method (only S256 accepted)
    pub code_challenge_method: Option<String>,
}

/// Query parameters delivered by the identity provider at the callback
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackParams {
    /// The state this server generated at `/authorize`
    pub state: Option<String>,
    /// Provider authorization code
    pub code: Option<String>,
    /// Provider error code, when the login failed
    pub error: Option<String>,
    /// Provider error description
    pub error_description: Option<String>,
}

/// Form body for `POST /token`
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRequest {
    /// Grant type (`authorization_code` or `refresh_token`)
    pub grant_type: String,
    /// Authorization code (for `authorization_code` grant)
    pub code: Option<String>,
    /// Redirect URI (must match the one bound to the code)
    pub redirect_uri: Option<String>,
    /// Client ID
    pub client_id: Option<String>,
    /// PKCE code verifier (RFC 7636)
    pub code_verifier: Option<String>,
    /// Refresh token (for `refresh_token` grant)
    pub refresh_token: Option<String>,
    /// Requested scopes (narrowing only, for `refresh_token` grant)
    pub scope: Option<String>,
}

/// Response body for `POST /token`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Opaque access token
    pub access_token: String,
    /// Always `bearer`
    pub token_type: String,
    /// Seconds until the access token expires
    pub expires_in: i64,
    /// Opaque refresh token
    pub refresh_token: String,
    /// Space-separated granted scopes
    pub scope: String,
}

/// Form body for `POST /revoke` (RFC 7009)
#[derive(Debug, Clone, Deserialize)]
pub struct RevokeRequest {
    /// The token to revoke (access or refresh)
    pub token: String,
    /// Optional caller hint, accepted but not trusted
    pub token_type_hint: Option<String>,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_auth_error_wire_mapping() {
        let err = AuthError::InvalidGrant("code already used".into());
        let wire = err.to_oauth2_error();
        assert_eq!(wire.error, "invalid_grant");
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn test_internal_error_is_not_leaked() {
        let err = AuthError::Internal("state collision".into());
        let wire = err.to_oauth2_error();
        assert_eq!(wire.error, "server_error");
        assert_eq!(wire.error_description.as_deref(), Some("Internal server error"));
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn test_identity_provider_detail_is_not_leaked() {
        let err = AuthError::IdentityProvider(
            "discovery failed: error sending request for url \
             (https://idp.internal.example/.well-known/openid-configuration): \
             connection refused"
                .into(),
        );
        let wire = err.to_oauth2_error();
        assert_eq!(wire.error, "server_error");
        let description = wire.error_description.unwrap();
        assert!(!description.contains("idp.internal.example"));
        assert!(!description.contains("connection refused"));
        assert_eq!(err.http_status(), 502);
    }

    #[test]
    fn test_oauth2_error_serialization_skips_empty() {
        let wire = OAuth2Error::server_error("oops");
        let json = serde_json::to_string(&wire).unwrap();
        assert!(json.contains("server_error"));
        assert!(!json.contains("error_uri"));
    }

    #[test]
    fn test_identity_claims_scope_check() {
        let claims = IdentityClaims {
            subject: "user-1".into(),
            email: None,
            name: None,
            scopes: vec!["u2:read".into()],
            attributes: serde_json::Map::new(),
        };
        assert!(claims.has_scope("u2:read"));
        assert!(!claims.has_scope("u2:write"));
    }
}
