// ABOUTME: OAuth 2.0 authorization-server orchestrator composing the stores and IdP adapter
// ABOUTME: Implements register, authorize, token, revoke, and bearer validation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 u2-mcp contributors

//! Authorization-server orchestration
//!
//! [`OAuth2AuthorizationServer`] is the component the HTTP layer calls. It
//! composes the client registry, session/code/token stores, the callback
//! handler, and the configured identity provider adapter.

use base64::{engine::general_purpose, Engine as _};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};

use super::callback::{CallbackHandler, CallbackOutcome};
use super::client_registry::ClientRegistry;
use super::code_store::AuthorizationCodeStore;
use super::models::{
    AuthError, AuthorizeParams, CallbackParams, ClientRegistrationRequest,
    ClientRegistrationResponse, IdentityClaims, RevokeRequest, TokenRequest, TokenResponse,
};
use super::session_store::{AuthorizationSessionStore, SessionRequest};
use super::token_store::TokenStore;
use crate::constants::{oauth, scopes, ttl};
use crate::idp::IdpAdapter;

/// The authorization server the HTTP surface talks to
pub struct OAuth2AuthorizationServer {
    clients: Arc<ClientRegistry>,
    sessions: Arc<AuthorizationSessionStore>,
    codes: Arc<AuthorizationCodeStore>,
    tokens: Arc<TokenStore>,
    adapter: Arc<dyn IdpAdapter>,
    callback: CallbackHandler,
    issuer_url: String,
    /// This server's redirect URI on the provider leg
    callback_uri: String,
}

impl OAuth2AuthorizationServer {
    /// Wire an authorization server for the given issuer and adapter, with
    /// default token lifetimes.
    #[must_use]
    pub fn new(issuer_url: &str, adapter: Arc<dyn IdpAdapter>) -> Self {
        Self::with_ttls(
            issuer_url,
            adapter,
            ttl::ACCESS_TOKEN_TTL_SECS,
            ttl::REFRESH_TOKEN_TTL_SECS,
        )
    }

    /// Wire an authorization server with explicit token lifetimes
    #[must_use]
    pub fn with_ttls(
        issuer_url: &str,
        adapter: Arc<dyn IdpAdapter>,
        access_ttl_secs: i64,
        refresh_ttl_secs: i64,
    ) -> Self {
        let issuer_url = issuer_url.trim_end_matches('/').to_owned();
        let callback_uri = format!("{issuer_url}/oauth/callback");

        let sessions = Arc::new(AuthorizationSessionStore::default());
        let codes = Arc::new(AuthorizationCodeStore::default());
        let callback = CallbackHandler::new(
            Arc::clone(&sessions),
            Arc::clone(&codes),
            Arc::clone(&adapter),
            callback_uri.clone(),
        );

        Self {
            clients: Arc::new(ClientRegistry::new()),
            sessions,
            codes,
            tokens: Arc::new(TokenStore::new(access_ttl_secs, refresh_ttl_secs)),
            adapter,
            callback,
            issuer_url,
            callback_uri,
        }
    }

    /// Dynamic client registration (RFC 7591)
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidClientMetadata`] on malformed metadata.
    pub fn register(
        &self,
        request: &ClientRegistrationRequest,
    ) -> Result<ClientRegistrationResponse, AuthError> {
        self.clients.register(request)
    }

    /// Begin an authorization flow: validate the request, create a session,
    /// and return the identity provider URL the browser must be sent to.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidRequest`] for parameter problems (no
    /// session is created in that case) and [`AuthError::IdentityProvider`]
    /// when the provider's authorize URL cannot be built.
    pub async fn authorize(&self, params: &AuthorizeParams) -> Result<String, AuthError> {
        if params.response_type != "code" {
            return Err(AuthError::InvalidRequest(
                "Only response_type=code is supported".into(),
            ));
        }

        let client = self
            .clients
            .lookup(&params.client_id)
            .ok_or_else(|| AuthError::InvalidRequest("Unknown client".into()))?;

        // Exact match only; prefix matching would be an open redirect.
        if !client
            .redirect_uris
            .iter()
            .any(|u| u == &params.redirect_uri)
        {
            return Err(AuthError::InvalidRequest(
                "redirect_uri is not registered for this client".into(),
            ));
        }

        let requested_scopes = Self::resolve_requested_scopes(
            params.scope.as_deref(),
            &client.allowed_scopes,
        )?;

        let challenge = params
            .code_challenge
            .as_deref()
            .ok_or_else(|| AuthError::InvalidRequest("code_challenge is required".into()))?;
        if !is_valid_pkce_string(challenge) {
            return Err(AuthError::InvalidRequest(
                "code_challenge must be 43-128 unreserved characters".into(),
            ));
        }

        match params.code_challenge_method.as_deref() {
            Some(oauth::PKCE_METHOD_S256) => {}
            _ => {
                return Err(AuthError::InvalidRequest(
                    "Only code_challenge_method=S256 is supported".into(),
                ));
            }
        }

        // This server runs its own PKCE against the provider; the client's
        // challenge is carried through to the local code instead.
        let idp_pkce_verifier = super::generate_random_string(oauth::TOKEN_LENGTH_BYTES)?;
        let idp_challenge = s256_challenge(&idp_pkce_verifier);

        let state = self.sessions.begin(SessionRequest {
            client_id: params.client_id.clone(),
            client_redirect_uri: params.redirect_uri.clone(),
            client_state: params.state.clone(),
            requested_scopes,
            pkce_challenge: challenge.to_owned(),
            idp_pkce_verifier,
        })?;

        match self
            .adapter
            .build_authorization_url(&state, &self.callback_uri, &idp_challenge)
            .await
        {
            Ok(url) => {
                debug!(client_id = %params.client_id, "Authorization flow started");
                Ok(url)
            }
            Err(e) => {
                // The session is useless without a provider URL.
                let _ = self.sessions.consume(&state);
                warn!(error = %e, "Could not build identity provider authorization URL");
                Err(AuthError::IdentityProvider(e.to_string()))
            }
        }
    }

    /// Handle the identity provider's callback
    pub async fn callback(&self, params: CallbackParams) -> CallbackOutcome {
        self.callback.handle(params).await
    }

    /// Token endpoint: `authorization_code` and `refresh_token` grants
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidGrant`] for any rejected credential and
    /// [`AuthError::InvalidRequest`] for malformed requests.
    pub fn token(&self, request: &TokenRequest) -> Result<TokenResponse, AuthError> {
        match request.grant_type.as_str() {
            "authorization_code" => self.handle_authorization_code_grant(request),
            "refresh_token" => self.handle_refresh_token_grant(request),
            other => {
                debug!(grant_type = %other, "Unsupported grant type");
                Err(AuthError::InvalidRequest(format!(
                    "Unsupported grant_type: {other}"
                )))
            }
        }
    }

    fn handle_authorization_code_grant(
        &self,
        request: &TokenRequest,
    ) -> Result<TokenResponse, AuthError> {
        let code = request
            .code
            .as_deref()
            .ok_or_else(|| AuthError::InvalidRequest("code is required".into()))?;
        let client_id = request
            .client_id
            .as_deref()
            .ok_or_else(|| AuthError::InvalidRequest("client_id is required".into()))?;
        let redirect_uri = request
            .redirect_uri
            .as_deref()
            .ok_or_else(|| AuthError::InvalidRequest("redirect_uri is required".into()))?;
        let verifier = request
            .code_verifier
            .as_deref()
            .ok_or_else(|| AuthError::InvalidRequest("code_verifier is required".into()))?;

        // Consumption burns the code before any binding check, so a failed
        // redemption can never be retried with corrected parameters.
        let record = self
            .codes
            .consume(code)
            .ok_or_else(|| AuthError::InvalidGrant("Invalid or expired authorization code".into()))?;

        if record.client_id != client_id {
            warn!(client_id = %client_id, "Authorization code presented by the wrong client");
            return Err(AuthError::InvalidGrant(
                "Authorization code was not issued to this client".into(),
            ));
        }

        if record.redirect_uri != redirect_uri {
            return Err(AuthError::InvalidGrant(
                "redirect_uri does not match the authorization request".into(),
            ));
        }

        verify_pkce(verifier, &record.pkce_challenge)?;

        let issued = self.tokens.issue_pair(client_id, record.claims)?;
        info!(client_id = %client_id, "Access token issued via authorization_code grant");

        Ok(TokenResponse {
            access_token: issued.access_token,
            token_type: "bearer".into(),
            expires_in: issued.expires_in,
            refresh_token: issued.refresh_token,
            scope: issued.scope,
        })
    }

    fn handle_refresh_token_grant(
        &self,
        request: &TokenRequest,
    ) -> Result<TokenResponse, AuthError> {
        let refresh_token = request
            .refresh_token
            .as_deref()
            .ok_or_else(|| AuthError::InvalidRequest("refresh_token is required".into()))?;
        let client_id = request
            .client_id
            .as_deref()
            .ok_or_else(|| AuthError::InvalidRequest("client_id is required".into()))?;

        let issued =
            self.tokens
                .rotate(refresh_token, client_id, request.scope.as_deref())?;
        info!(client_id = %client_id, "Access token issued via refresh_token grant");

        Ok(TokenResponse {
            access_token: issued.access_token,
            token_type: "bearer".into(),
            expires_in: issued.expires_in,
            refresh_token: issued.refresh_token,
            scope: issued.scope,
        })
    }

    /// Revoke a token (RFC 7009): always succeeds
    pub fn revoke(&self, request: &RevokeRequest) {
        // The hint is advisory; the store checks both tables regardless.
        let _ = request.token_type_hint.as_deref();
        self.tokens.revoke(&request.token);
    }

    /// Validate a bearer token for downstream request authentication.
    ///
    /// Invalid covers unknown, revoked, and expired uniformly.
    #[must_use]
    pub fn validate_bearer(&self, token: &str) -> Option<IdentityClaims> {
        self.tokens.validate(token)
    }

    /// RFC 8414 discovery document
    #[must_use]
    pub fn discovery_document(&self) -> serde_json::Value {
        serde_json::json!({
            "issuer": self.issuer_url,
            "registration_endpoint": format!("{}/register", self.issuer_url),
            "authorization_endpoint": format!("{}/authorize", self.issuer_url),
            "token_endpoint": format!("{}/token", self.issuer_url),
            "revocation_endpoint": format!("{}/revoke", self.issuer_url),
            "response_types_supported": ["code"],
            "grant_types_supported": ["authorization_code", "refresh_token"],
            "code_challenge_methods_supported": [oauth::PKCE_METHOD_S256],
            "token_endpoint_auth_methods_supported": ["none"],
            "scopes_supported": scopes::SUPPORTED,
        })
    }

    /// Drop expired sessions, codes, and tokens
    pub fn sweep_expired(&self) {
        self.sessions.sweep();
        self.codes.sweep();
        self.tokens.sweep();
    }

    /// The name of the configured identity provider adapter
    #[must_use]
    pub fn idp_name(&self) -> &'static str {
        self.adapter.name()
    }

    fn resolve_requested_scopes(
        scope: Option<&str>,
        allowed: &[String],
    ) -> Result<Vec<String>, AuthError> {
        let Some(raw) = scope else {
            return Ok(allowed.to_vec());
        };

        let requested: Vec<String> = raw.split_whitespace().map(String::from).collect();
        if requested.is_empty() {
            return Ok(allowed.to_vec());
        }

        for s in &requested {
            if !allowed.iter().any(|a| a == s) {
                return Err(AuthError::InvalidRequest(format!(
                    "Scope not allowed for this client: {s}"
                )));
            }
        }
        Ok(requested)
    }
}

/// Compute the S256 challenge for a verifier (RFC 7636 Section 4.2)
#[must_use]
pub fn s256_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    general_purpose::URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// RFC 7636 Section 4.1: 43-128 unreserved characters
fn is_valid_pkce_string(s: &str) -> bool {
    (oauth::PKCE_MIN_LEN..=oauth::PKCE_MAX_LEN).contains(&s.len())
        && s.chars()
            .all(|c| matches!(c, 'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '.' | '_' | '~'))
}

/// Verify a PKCE verifier against a stored S256 challenge.
///
/// The comparison is constant-time to keep hash equality from becoming a
/// timing oracle.
fn verify_pkce(verifier: &str, stored_challenge: &str) -> Result<(), AuthError> {
    if !is_valid_pkce_string(verifier) {
        return Err(AuthError::InvalidGrant(
            "code_verifier must be 43-128 unreserved characters".into(),
        ));
    }

    let computed = s256_challenge(verifier);
    if computed.as_bytes().ct_eq(stored_challenge.as_bytes()).into() {
        Ok(())
    } else {
        Err(AuthError::InvalidGrant("code_verifier does not match".into()))
    }
}
