// ABOUTME: External identity provider adapters behind a single polymorphic trait
// ABOUTME: Generic OIDC plus Duo and Auth0 variants, selected by configuration
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 u2-mcp contributors

//! # Identity Provider Adapters
//!
//! The authorization bridge delegates the actual user login to an external
//! OIDC provider. Each supported provider is an [`IdpAdapter`]; the core
//! flow never branches on which one is configured. Adding a provider means
//! adding an adapter, not editing the flow.

pub mod auth0;
pub mod duo;
pub mod oidc;

pub use auth0::Auth0Adapter;
pub use duo::DuoAdapter;
pub use oidc::GenericOidcAdapter;

use crate::config::{IdpConfig, IdpProvider};
use crate::oauth2::models::IdentityClaims;
use anyhow::Result;
use serde::Deserialize;
use std::sync::Arc;

/// Errors from the provider leg of the flow
#[derive(Debug, thiserror::Error)]
pub enum IdpError {
    /// Discovery document could not be fetched or parsed
    #[error("discovery failed: {0}")]
    Discovery(String),

    /// The code exchange was rejected or the transport failed
    #[error("token exchange failed: {0}")]
    TokenExchangeFailed(String),

    /// The provider's token response carried no usable identity
    #[error("no identity in provider response: {0}")]
    MissingIdentity(String),

    /// Adapter configuration is incomplete
    #[error("provider configuration error: {0}")]
    Configuration(String),
}

/// Tokens returned by the external provider. Held only long enough to
/// extract claims; never handed to clients.
#[derive(Debug, Clone, Deserialize)]
pub struct IdpTokens {
    /// Provider access token
    pub access_token: String,
    /// Provider ID token (JWT), when issued
    #[serde(default)]
    pub id_token: Option<String>,
    /// Provider refresh token, when issued
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Provider token lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// The outcome of a successful provider code exchange
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    /// Claims extracted from the provider response
    pub claims: IdentityClaims,
    /// The raw provider tokens
    pub tokens: IdpTokens,
}

/// Static description of a configured provider
#[derive(Debug, Clone)]
pub struct IdpMetadata {
    /// Adapter name (`oidc`, `duo`, `auth0`)
    pub name: &'static str,
    /// The provider issuer, once discovery has run
    pub issuer: Option<String>,
}

/// A pluggable external identity provider.
///
/// The callback handler and authorization endpoint drive logins through this
/// trait only; no store lock is ever held across these awaits.
#[async_trait::async_trait]
pub trait IdpAdapter: Send + Sync {
    /// Adapter name for logging and discovery metadata
    fn name(&self) -> &'static str;

    /// Build the URL the end user's browser is redirected to.
    ///
    /// `state` is this server's session key and `code_challenge` is this
    /// server's own PKCE challenge for the provider leg.
    async fn build_authorization_url(
        &self,
        state: &str,
        redirect_uri: &str,
        code_challenge: &str,
    ) -> Result<String, IdpError>;

    /// Exchange the provider's authorization code for tokens and extract
    /// the verified identity.
    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> Result<VerifiedIdentity, IdpError>;

    /// Refresh a provider-side token. Not used on the client-facing path;
    /// kept for deployments that mirror provider sessions.
    async fn refresh_token(&self, refresh_token: &str) -> Result<IdpTokens, IdpError>;
}

/// Construct the adapter selected by configuration.
///
/// # Errors
///
/// Returns an error when the configuration is incomplete for the selected
/// provider.
pub fn create_idp_adapter(config: &IdpConfig) -> Result<Arc<dyn IdpAdapter>> {
    let adapter: Arc<dyn IdpAdapter> = match config.provider {
        IdpProvider::Oidc => Arc::new(GenericOidcAdapter::from_config(config)?),
        IdpProvider::Duo => Arc::new(DuoAdapter::from_config(config)?),
        IdpProvider::Auth0 => Arc::new(Auth0Adapter::from_config(config)?),
    };
    tracing::info!(provider = adapter.name(), "Identity provider adapter ready");
    Ok(adapter)
}
