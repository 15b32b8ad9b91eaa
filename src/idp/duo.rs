// ABOUTME: Duo identity provider adapter delegating to the generic OIDC adapter
// ABOUTME: Derives the Duo OIDC discovery URL from the tenant API hostname
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 u2-mcp contributors

//! Duo adapter
//!
//! Duo's Web SDK v4 exposes a standard OIDC surface per tenant under
//! `https://<api-host>/oauth/v1/`; everything past the discovery URL is
//! plain OIDC, so this adapter is a thin shell over the generic one.

use super::{IdpAdapter, IdpError, IdpTokens, VerifiedIdentity};
use crate::config::IdpConfig;
use super::oidc::GenericOidcAdapter;

/// Adapter for Duo Security
pub struct DuoAdapter {
    inner: GenericOidcAdapter,
}

impl DuoAdapter {
    /// Build from configuration. Uses the explicit discovery URL when set,
    /// otherwise derives it from `U2_DUO_API_HOST`.
    pub fn from_config(config: &IdpConfig) -> anyhow::Result<Self> {
        let discovery_url = match (&config.discovery_url, &config.duo_api_host) {
            (Some(url), _) => url.clone(),
            (None, Some(api_host)) => format!(
                "https://{api_host}/oauth/v1/.well-known/openid-configuration"
            ),
            (None, None) => {
                anyhow::bail!("Duo requires a discovery URL or an API hostname")
            }
        };

        Ok(Self {
            inner: GenericOidcAdapter::new("duo", discovery_url, config)?,
        })
    }
}

#[async_trait::async_trait]
impl IdpAdapter for DuoAdapter {
    fn name(&self) -> &'static str {
        "duo"
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IdpProvider;

    #[test]
    fn test_discovery_url_derived_from_api_host() {
        let config = IdpConfig {
            provider: IdpProvider::Duo,
            discovery_url: None,
            client_id: "duo-client".into(),
            client_secret: "secret".into(),
            scopes: "openid".into(),
            duo_api_host: Some("api-abc123.duosecurity.com".into()),
        };
        assert!(DuoAdapter::from_config(&config).is_ok());
    }

    #[test]
    fn test_missing_host_and_url_is_rejected() {
        let config = IdpConfig {
            provider: IdpProvider::Duo,
            discovery_url: None,
            client_id: "duo-client".into(),
            client_secret: "secret".into(),
            scopes: "openid".into(),
            duo_api_host: None,
        };
        assert!(DuoAdapter::from_config(&config).is_err());
    }
}
