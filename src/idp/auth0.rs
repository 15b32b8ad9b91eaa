// ABOUTME: Auth0 identity provider adapter delegating to the generic OIDC adapter
// ABOUTME: Auth0 tenants publish standard OIDC discovery, so only the name differs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 u2-mcp contributors

//! Auth0 adapter

use super::oidc::GenericOidcAdapter;
use super::{IdpAdapter, IdpError, IdpTokens, VerifiedIdentity};
use crate::config::IdpConfig;

/// Adapter for Auth0 tenants
pub struct Auth0Adapter {
    inner: GenericOidcAdapter,
}

impl Auth0Adapter {
    /// Build from configuration. Auth0 discovery lives at
    /// `https://<tenant>/.well-known/openid-configuration`.
    pub fn from_config(config: &IdpConfig) -> anyhow::Result<Self> {
        let discovery_url = config
            .discovery_url
            .clone()
            .ok_or_else(|| anyhow::anyhow!("Auth0 requires a discovery URL"))?;

        Ok(Self {
            inner: GenericOidcAdapter::new("auth0", discovery_url, config)?,
        })
    }
}

#[async_trait::async_trait]
impl IdpAdapter for Auth0Adapter {
    fn name(&self) -> &'static str {
        "auth0"
    }

    async fn build_authorization_url(
        &self,
        state: &str,
        redirect_uri: &str,
        code_challenge: &str,
    ) -> Result<String, IdpError> {
        self.inner
            .build_authorization_url(state, redirect_uri, code_challenge)
            .await
    }

    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> Result<VerifiedIdentity, IdpError> {
        self.inner
            .exchange_code(code, redirect_uri, code_verifier)
            .await
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<IdpTokens, IdpError> {
        self.inner.refresh_token(refresh_token).await
    }
}
