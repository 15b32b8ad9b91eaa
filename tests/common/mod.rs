// ABOUTME: Shared test scaffolding: scripted identity provider adapter and PKCE helpers
// ABOUTME: Used by the OAuth flow, PKCE, and token lifecycle integration tests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 u2-mcp contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(dead_code)]

use base64::{engine::general_purpose, Engine as _};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use u2_mcp_server::idp::{IdpAdapter, IdpError, IdpTokens, VerifiedIdentity};
use u2_mcp_server::oauth2::models::{ClientRegistrationRequest, IdentityClaims};
use u2_mcp_server::oauth2::OAuth2AuthorizationServer;

/// The provider code the scripted adapter accepts
pub const VALID_IDP_CODE: &str = "valid-idp-code";

/// Subject the scripted adapter asserts
pub const TEST_SUBJECT: &str = "user-123";

/// Scripted identity provider: deterministic authorize URL, accepts exactly
/// one code value
pub struct ScriptedAdapter;

#[async_trait::async_trait]
impl IdpAdapter for ScriptedAdapter {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn build_authorization_url(
        &self,
        state: &str,
        redirect_uri: &str,
        code_challenge: &str,
    ) -> Result<String, IdpError> {
        Ok(format!(
            "https://idp.example.com/authorize?response_type=code&state={}&redirect_uri={}&code_challenge={}&code_challenge_method=S256",
            urlencoding::encode(state),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(code_challenge),
        ))
    }

    async fn exchange_code(
        &self,
        code: &str,
        _redirect_uri: &str,
        _code_verifier: &str,
    ) -> Result<VerifiedIdentity, IdpError> {
        if code != VALID_IDP_CODE {
            return Err(IdpError::TokenExchangeFailed("unknown code".into()));
        }

        Ok(VerifiedIdentity {
            claims: IdentityClaims {
                subject: TEST_SUBJECT.to_owned(),
                email: Some("user@example.com".to_owned()),
                name: Some("Test User".to_owned()),
                scopes: Vec::new(),
                attributes: serde_json::Map::new(),
            },
            tokens: IdpTokens {
                access_token: "idp-access-token".to_owned(),
                id_token: None,
                refresh_token: None,
                expires_in: Some(3600),
            },
        })
    }

    async fn refresh_token(&self, _refresh_token: &str) -> Result<IdpTokens, IdpError> {
        Err(IdpError::TokenExchangeFailed("not scripted".into()))
    }
}

/// An authorization server wired to the scripted adapter
pub fn oauth_server() -> Arc<OAuth2AuthorizationServer> {
    Arc::new(OAuth2AuthorizationServer::new(
        "https://bridge.example.com",
        Arc::new(ScriptedAdapter),
    ))
}

/// Register a client with one redirect URI and return its `client_id`
pub fn register_client(server: &OAuth2AuthorizationServer, redirect_uri: &str) -> String {
    server
        .register(&ClientRegistrationRequest {
            redirect_uris: vec![redirect_uri.to_owned()],
            client_name: Some("Test Client".to_owned()),
            grant_types: None,
            response_types: None,
            scope: Some("u2:read u2:write".to_owned()),
        })
        .unwrap()
        .client_id
}

/// Generate a PKCE `code_verifier` (43-128 characters)
pub fn generate_code_verifier() -> String {
    use ring::rand::{SecureRandom, SystemRandom};
    let rng = SystemRandom::new();
    let mut random_bytes = [0u8; 32];
    rng.fill(&mut random_bytes).unwrap();
    general_purpose::URL_SAFE_NO_PAD.encode(random_bytes)
}

/// Generate the S256 `code_challenge` for a verifier
pub fn generate_code_challenge(code_verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code_verifier.as_bytes());
    general_purpose::URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Pull a query parameter out of a URL
pub fn query_param(url: &str, name: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}
