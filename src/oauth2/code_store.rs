// ABOUTME: TTL-bounded store for single-use authorization codes
// ABOUTME: Atomic consume-by-remove makes code replay a guaranteed failure
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 u2-mcp contributors

//! Authorization code store
//!
//! Codes are minted at the identity provider callback and redeemed exactly
//! once at the token endpoint. Consumption is a single `DashMap::remove`, so
//! two concurrent redemptions of the same code can never both succeed.

use chrono::{Duration, Utc};
use dashmap::DashMap;
use tracing::debug;

use super::models::{AuthError, AuthorizationCode, IdentityClaims};
use crate::constants::ttl;

/// In-memory store of single-use authorization codes
#[derive(Debug)]
pub struct AuthorizationCodeStore {
    codes: DashMap<String, AuthorizationCode>,
    ttl_secs: i64,
}

impl Default for AuthorizationCodeStore {
    fn default() -> Self {
        Self::new(ttl::AUTH_CODE_TTL_SECS)
    }
}

impl AuthorizationCodeStore {
    /// Create a store with the given code TTL
    #[must_use]
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            codes: DashMap::new(),
            ttl_secs,
        }
    }

    /// Mint a fresh code bound to the client, redirect URI, PKCE challenge,
    /// and verified identity.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Internal`] if the system RNG fails.
    pub fn issue(
        &self,
        client_id: &str,
        redirect_uri: &str,
        pkce_challenge: &str,
        claims: IdentityClaims,
    ) -> Result<String, AuthError> {
        let code = super::generate_token()?;
        let record = AuthorizationCode {
            code: code.clone(),
            client_id: client_id.to_owned(),
            claims,
            pkce_challenge: pkce_challenge.to_owned(),
            redirect_uri: redirect_uri.to_owned(),
            expires_at: Utc::now() + Duration::seconds(self.ttl_secs),
        };
        self.codes.insert(code.clone(), record);
        debug!(client_id = %client_id, "Authorization code issued");
        Ok(code)
    }

    /// Atomically consume a code.
    ///
    /// Returns `None` for unknown, already-used, and expired codes alike.
    /// Binding checks (client, redirect URI, PKCE) happen after consumption
    /// so that a failed redemption still burns the code.
    #[must_use]
    pub fn consume(&self, code: &str) -> Option<AuthorizationCode> {
        let (_, record) = self.codes.remove(code)?;
        if record.is_expired() {
            debug!("Consumed authorization code was expired; treating as invalid");
            return None;
        }
        Some(record)
    }

    /// Drop expired codes
    pub fn sweep(&self) {
        let now = Utc::now();
        self.codes.retain(|_, record| record.expires_at > now);
    }

    /// Number of stored codes
    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Whether the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}
