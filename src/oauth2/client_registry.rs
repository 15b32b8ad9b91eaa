// ABOUTME: RFC 7591 dynamic client registration with redirect URI validation
// ABOUTME: In-memory registry of public PKCE clients keyed by client_id
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 u2-mcp contributors

//! Dynamic client registration (RFC 7591)
//!
//! Clients are public PKCE clients: no secret is issued, and the token
//! endpoint authenticates them through their code verifier and exact
//! redirect-URI binding instead.

use chrono::Utc;
use dashmap::DashMap;
use tracing::{info, warn};
use uuid::Uuid;

use super::models::{
    AuthError, ClientRegistrationRequest, ClientRegistrationResponse, RegisteredClient,
};
use crate::constants::scopes;

/// In-memory registry of dynamically registered clients
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: DashMap<String, RegisteredClient>,
}

impl ClientRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new client (RFC 7591).
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidClientMetadata`] when the redirect URI
    /// list is empty or any URI fails validation, or when a requested grant
    /// or response type is unsupported.
    pub fn register(
        &self,
        request: &ClientRegistrationRequest,
    ) -> Result<ClientRegistrationResponse, AuthError> {
        if request.redirect_uris.is_empty() {
            return Err(AuthError::InvalidClientMetadata(
                "At least one redirect_uri is required".into(),
            ));
        }

        for uri in &request.redirect_uris {
            if !Self::is_valid_redirect_uri(uri) {
                return Err(AuthError::InvalidClientMetadata(format!(
                    "Invalid redirect_uri: {uri}"
                )));
            }
        }

        if let Some(grant_types) = &request.grant_types {
            for grant in grant_types {
                if grant != "authorization_code" && grant != "refresh_token" {
                    return Err(AuthError::InvalidClientMetadata(format!(
                        "Unsupported grant_type: {grant}"
                    )));
                }
            }
        }

        if let Some(response_types) = &request.response_types {
            for response_type in response_types {
                if response_type != "code" {
                    return Err(AuthError::InvalidClientMetadata(format!(
                        "Unsupported response_type: {response_type}"
                    )));
                }
            }
        }

        let allowed_scopes = Self::resolve_scopes(request.scope.as_deref())?;

        let client_id = Self::generate_client_id();
        let now = Utc::now();

        let client = RegisteredClient {
            client_id: client_id.clone(),
            redirect_uris: request.redirect_uris.clone(),
            client_name: request.client_name.clone(),
            allowed_scopes: allowed_scopes.clone(),
            created_at: now,
        };

        info!(
            client_id = %client_id,
            client_name = client.client_name.as_deref().unwrap_or(""),
            redirect_uris = client.redirect_uris.len(),
            "Registered OAuth client"
        );

        self.clients.insert(client_id.clone(), client);

        Ok(ClientRegistrationResponse {
            client_id,
            client_id_issued_at: now.timestamp(),
            redirect_uris: request.redirect_uris.clone(),
            grant_types: vec!["authorization_code".into(), "refresh_token".into()],
            response_types: vec!["code".into()],
            client_name: request.client_name.clone(),
            scope: allowed_scopes.join(" "),
            token_endpoint_auth_method: "none".into(),
        })
    }

    /// Look up a registered client
    #[must_use]
    pub fn lookup(&self, client_id: &str) -> Option<RegisteredClient> {
        self.clients.get(client_id).map(|entry| entry.clone())
    }

    /// Intersect the requested scope string with the supported vocabulary,
    /// defaulting to read-only access.
    fn resolve_scopes(scope: Option<&str>) -> Result<Vec<String>, AuthError> {
        let Some(raw) = scope else {
            return Ok(vec![scopes::DEFAULT_GRANT.into()]);
        };

        let requested: Vec<&str> = raw.split_whitespace().collect();
        if requested.is_empty() {
            return Ok(vec![scopes::DEFAULT_GRANT.into()]);
        }

        let mut resolved = Vec::new();
        for s in requested {
            if !scopes::is_supported(s) {
                return Err(AuthError::InvalidClientMetadata(format!(
                    "Unsupported scope: {s}"
                )));
            }
            if !resolved.iter().any(|r: &String| r == s) {
                resolved.push(s.to_owned());
            }
        }
        Ok(resolved)
    }

    /// Validate a redirect URI per OAuth 2.0 Security Best Practices
    /// (RFC 6749 Section 3.1.2.2): absolute, no fragment, no wildcard host,
    /// https except for loopback.
    fn is_valid_redirect_uri(uri: &str) -> bool {
        if uri.trim().is_empty() {
            return false;
        }

        if uri.contains('#') {
            warn!("Rejected redirect_uri with fragment: {}", uri);
            return false;
        }

        if uri.contains('*') {
            warn!("Rejected redirect_uri with wildcard: {}", uri);
            return false;
        }

        // Out-of-band URN for native apps (RFC 8252)
        if uri == "urn:ietf:wg:oauth:2.0:oob" {
            return true;
        }

        Self::validate_http_uri(uri)
    }

    fn validate_http_uri(uri: &str) -> bool {
        let Ok(parsed_uri) = url::Url::parse(uri) else {
            warn!("Rejected malformed redirect_uri: {}", uri);
            return false;
        };

        let scheme = parsed_uri.scheme();
        let is_loopback = parsed_uri.host_str() == Some("localhost")
            || parsed_uri.host_str() == Some("127.0.0.1");

        if scheme == "https" {
            return true;
        }

        if scheme == "http" && is_loopback {
            return true;
        }

        warn!(
            "Rejected redirect_uri with non-HTTPS scheme for non-localhost: {}",
            uri
        );
        false
    }

    fn generate_client_id() -> String {
        format!("u2_client_{}", Uuid::new_v4().simple())
    }
}
