// ABOUTME: Generic OIDC identity provider adapter with cached discovery
// ABOUTME: Authorization URL building, PKCE code exchange, and claims extraction
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 u2-mcp contributors

//! Generic OIDC adapter
//!
//! Works against any provider that publishes an RFC 8414 / OIDC discovery
//! document. The Duo and Auth0 adapters delegate to this one with
//! provider-specific defaults.

use serde::Deserialize;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::{IdpError, IdpTokens, VerifiedIdentity};
use crate::config::IdpConfig;
use crate::constants::defaults;
use crate::oauth2::models::IdentityClaims;
use base64::{engine::general_purpose, Engine as _};

/// Relevant fields of the provider's discovery document
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryDocument {
    /// Provider issuer identifier
    pub issuer: String,
    /// Where the browser is sent to log in
    pub authorization_endpoint: String,
    /// Where codes are exchanged for tokens
    pub token_endpoint: String,
    /// Optional userinfo endpoint for claims
    #[serde(default)]
    pub userinfo_endpoint: Option<String>,
}

/// Adapter for any discovery-publishing OIDC provider
pub struct GenericOidcAdapter {
    name: &'static str,
    discovery_url: String,
    client_id: String,
    client_secret: String,
    scopes: String,
    http: reqwest::Client,
    discovery: OnceCell<DiscoveryDocument>,
}

impl GenericOidcAdapter {
    /// Build from configuration. Requires an explicit discovery URL.
    pub fn from_config(config: &IdpConfig) -> anyhow::Result<Self> {
        let discovery_url = config
            .discovery_url
            .clone()
            .ok_or_else(|| anyhow::anyhow!("OIDC provider requires a discovery URL"))?;
        Self::new("oidc", discovery_url, config)
    }

    /// Build with an explicit name and discovery URL; used by the wrapping
    /// adapters.
    pub(crate) fn new(
        name: &'static str,
        discovery_url: String,
        config: &IdpConfig,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(defaults::IDP_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            name,
            discovery_url,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            scopes: config.scopes.clone(),
            http,
            discovery: OnceCell::new(),
        })
    }

    /// Fetch the discovery document, once, and cache it for the process
    /// lifetime.
    async fn discovery(&self) -> Result<&DiscoveryDocument, IdpError> {
        self.discovery
            .get_or_try_init(|| async {
                debug!(url = %self.discovery_url, "Fetching OIDC discovery document");
                let response = self
                    .http
                    .get(&self.discovery_url)
                    .send()
                    .await
                    .map_err(|e| IdpError::Discovery(e.to_string()))?;

                if !response.status().is_success() {
                    return Err(IdpError::Discovery(format!(
                        "discovery endpoint returned {}",
                        response.status()
                    )));
                }

                response
                    .json::<DiscoveryDocument>()
                    .await
                    .map_err(|e| IdpError::Discovery(e.to_string()))
            })
            .await
    }

    /// Seed the discovery cache directly; test scaffolding only.
    #[cfg(test)]
    pub(crate) fn set_discovery(&self, document: DiscoveryDocument) {
        let _ = self.discovery.set(document);
    }

    /// Pull claims out of the provider response: prefer the userinfo
    /// endpoint, fall back to the ID token payload.
    async fn extract_claims(&self, tokens: &IdpTokens) -> Result<IdentityClaims, IdpError> {
        let discovery = self.discovery().await?;

        if let Some(userinfo_endpoint) = &discovery.userinfo_endpoint {
            match self.fetch_userinfo(userinfo_endpoint, &tokens.access_token).await {
                Ok(claims) => return Ok(claims),
                Err(e) => {
                    warn!(error = %e, "Userinfo fetch failed, falling back to id_token claims");
                }
            }
        }

        let id_token = tokens.id_token.as_deref().ok_or_else(|| {
            IdpError::MissingIdentity("provider returned neither userinfo nor an id_token".into())
        })?;
        let payload = decode_id_token_payload(id_token)?;
        claims_from_payload(&payload)
    }

    async fn fetch_userinfo(
        &self,
        endpoint: &str,
        access_token: &str,
    ) -> Result<IdentityClaims, IdpError> {
        let response = self
            .http
            .get(endpoint)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| IdpError::MissingIdentity(e.to_string()))?;

        if !response.status().is_success() {
            return Err(IdpError::MissingIdentity(format!(
                "userinfo endpoint returned {}",
                response.status()
            )));
        }

        let payload: serde_json::Map<String, serde_json::Value> = response
            .json()
            .await
            .map_err(|e| IdpError::MissingIdentity(e.to_string()))?;

        claims_from_payload(&payload)
    }
}

#[async_trait::async_trait]
impl super::IdpAdapter for GenericOidcAdapter {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn build_authorization_url(
        &self,
        state: &str,
        redirect_uri: &str,
        code_challenge: &str,
    ) -> Result<String, IdpError> {
        let discovery = self.discovery().await?;

        Ok(format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}&code_challenge={}&code_challenge_method=S256",
            discovery.authorization_endpoint,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&self.scopes),
            urlencoding::encode(state),
            urlencoding::encode(code_challenge),
        ))
    }

    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> Result<VerifiedIdentity, IdpError> {
        let discovery = self.discovery().await?;

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code_verifier", code_verifier),
        ];

        let response = self
            .http
            .post(&discovery.token_endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| IdpError::TokenExchangeFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(IdpError::TokenExchangeFailed(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let tokens: IdpTokens = response
            .json()
            .await
            .map_err(|e| IdpError::TokenExchangeFailed(format!("parse error: {e}")))?;

        let claims = self.extract_claims(&tokens).await?;
        debug!(subject = %claims.subject, provider = self.name, "Identity verified");

        Ok(VerifiedIdentity { claims, tokens })
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<IdpTokens, IdpError> {
        let discovery = self.discovery().await?;

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];

        let response = self
            .http
            .post(&discovery.token_endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| IdpError::TokenExchangeFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(IdpError::TokenExchangeFailed(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| IdpError::TokenExchangeFailed(format!("parse error: {e}")))
    }
}

/// Decode the payload segment of a JWT without signature verification.
///
/// The ID token arrives over the TLS channel this server itself opened to
/// the provider's token endpoint, so the transport authenticates the issuer.
fn decode_id_token_payload(
    id_token: &str,
) -> Result<serde_json::Map<String, serde_json::Value>, IdpError> {
    let payload_b64 = id_token
        .split('.')
        .nth(1)
        .ok_or_else(|| IdpError::MissingIdentity("malformed id_token".into()))?;

    let payload_bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|e| IdpError::MissingIdentity(format!("id_token payload decode: {e}")))?;

    serde_json::from_slice(&payload_bytes)
        .map_err(|e| IdpError::MissingIdentity(format!("id_token payload parse: {e}")))
}

/// Map a raw claims object into [`IdentityClaims`]. The full object is
/// preserved as opaque attributes; local scopes are assigned later.
fn claims_from_payload(
    payload: &serde_json::Map<String, serde_json::Value>,
) -> Result<IdentityClaims, IdpError> {
    let subject = payload
        .get("sub")
        .and_then(|v| v.as_str())
        .ok_or_else(|| IdpError::MissingIdentity("provider claims carry no 'sub'".into()))?
        .to_owned();

    Ok(IdentityClaims {
        subject,
        email: payload
            .get("email")
            .and_then(|v| v.as_str())
            .map(str::to_owned),
        name: payload
            .get("name")
            .and_then(|v| v.as_str())
            .map(str::to_owned),
        scopes: Vec::new(),
        attributes: payload.clone(),
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::config::{IdpConfig, IdpProvider};
    use crate::idp::IdpAdapter as _;

    fn test_config() -> IdpConfig {
        IdpConfig {
            provider: IdpProvider::Oidc,
            discovery_url: Some("https://idp.example.com/.well-known/openid-configuration".into()),
            client_id: "bridge-client".into(),
            client_secret: "secret".into(),
            scopes: "openid profile email".into(),
            duo_api_host: None,
        }
    }

    fn test_discovery() -> DiscoveryDocument {
        DiscoveryDocument {
            issuer: "https://idp.example.com".into(),
            authorization_endpoint: "https://idp.example.com/authorize".into(),
            token_endpoint: "https://idp.example.com/token".into(),
            userinfo_endpoint: None,
        }
    }

    #[tokio::test]
    async fn test_authorization_url_carries_pkce_and_state() {
        let adapter = GenericOidcAdapter::from_config(&test_config()).unwrap();
        adapter.set_discovery(test_discovery());

        let url = adapter
            .build_authorization_url("state-123", "https://bridge/oauth/callback", "chal-abc")
            .await
            .unwrap();

        assert!(url.starts_with("https://idp.example.com/authorize?"));
        assert!(url.contains("state=state-123"));
        assert!(url.contains("code_challenge=chal-abc"));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(url.contains("scope=openid%20profile%20email"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fbridge%2Foauth%2Fcallback"));
    }

    #[test]
    fn test_id_token_payload_decode() {
        let payload = serde_json::json!({
            "sub": "user-42",
            "email": "u@example.com",
            "name": "U Ser",
            "groups": ["devs"]
        });
        let payload_b64 = general_purpose::URL_SAFE_NO_PAD
            .encode(serde_json::to_vec(&payload).unwrap());
        let token = format!("eyJhbGciOiJub25lIn0.{payload_b64}.sig");

        let decoded = decode_id_token_payload(&token).unwrap();
        let claims = claims_from_payload(&decoded).unwrap();

        assert_eq!(claims.subject, "user-42");
        assert_eq!(claims.email.as_deref(), Some("u@example.com"));
        assert_eq!(claims.name.as_deref(), Some("U Ser"));
        assert!(claims.attributes.contains_key("groups"));
    }

    #[test]
    fn test_claims_require_subject() {
        let payload = serde_json::json!({"email": "u@example.com"});
        let map = payload.as_object().unwrap();
        assert!(claims_from_payload(map).is_err());
    }

    #[test]
    fn test_malformed_id_token() {
        assert!(decode_id_token_payload("no-dots-here").is_err());
    }
}
