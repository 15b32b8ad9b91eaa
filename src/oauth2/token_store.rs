// ABOUTME: Opaque access/refresh token issuance, validation, rotation, and revocation
// ABOUTME: Refresh rotation and revocation cascade run under per-entry locks
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 u2-mcp contributors

//! Token store
//!
//! Tokens are opaque random strings; all state lives server-side. Validation
//! is uniform: revoked, expired, and never-issued tokens are all reported as
//! invalid with no distinction. Refresh tokens rotate on every use, and
//! revoking a refresh token also revokes the access tokens minted alongside
//! it. Each rotation starts a fresh parent link; earlier pairs age out on
//! their own expiry.

use chrono::{Duration, Utc};
use dashmap::DashMap;
use tracing::{debug, info};

use super::models::{AccessToken, AuthError, IdentityClaims, RefreshToken};
use crate::constants::ttl;

/// The pair of credentials handed out by the token endpoint
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    /// Opaque access token
    pub access_token: String,
    /// Opaque refresh token
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    /// Space-separated granted scopes
    pub scope: String,
}

/// In-memory store of issued access and refresh tokens
#[derive(Debug)]
pub struct TokenStore {
    access_tokens: DashMap<String, AccessToken>,
    refresh_tokens: DashMap<String, RefreshToken>,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new(ttl::ACCESS_TOKEN_TTL_SECS, ttl::REFRESH_TOKEN_TTL_SECS)
    }
}

impl TokenStore {
    /// Create a store with the given token lifetimes
    #[must_use]
    pub fn new(access_ttl_secs: i64, refresh_ttl_secs: i64) -> Self {
        Self {
            access_tokens: DashMap::new(),
            refresh_tokens: DashMap::new(),
            access_ttl_secs,
            refresh_ttl_secs,
        }
    }

    /// Issue a fresh access/refresh pair for a verified identity.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Internal`] if the system RNG fails.
    pub fn issue_pair(
        &self,
        client_id: &str,
        claims: IdentityClaims,
    ) -> Result<IssuedTokens, AuthError> {
        self.issue_pair_with_rotation(client_id, claims, 0)
    }

    fn issue_pair_with_rotation(
        &self,
        client_id: &str,
        claims: IdentityClaims,
        rotation_count: u32,
    ) -> Result<IssuedTokens, AuthError> {
        let access_token = super::generate_token()?;
        let refresh_token = super::generate_token()?;
        let now = Utc::now();
        let scope = claims.scopes.join(" ");

        self.refresh_tokens.insert(
            refresh_token.clone(),
            RefreshToken {
                token: refresh_token.clone(),
                client_id: client_id.to_owned(),
                claims: claims.clone(),
                issued_at: now,
                expires_at: now + Duration::seconds(self.refresh_ttl_secs),
                revoked: false,
                rotation_count,
            },
        );

        self.access_tokens.insert(
            access_token.clone(),
            AccessToken {
                token: access_token.clone(),
                client_id: client_id.to_owned(),
                claims,
                issued_at: now,
                expires_at: now + Duration::seconds(self.access_ttl_secs),
                revoked: false,
                refresh_parent: Some(refresh_token.clone()),
            },
        );

        debug!(client_id = %client_id, rotation = rotation_count, "Issued token pair");

        Ok(IssuedTokens {
            access_token,
            refresh_token,
            expires_in: self.access_ttl_secs,
            scope,
        })
    }

    /// Validate an access token.
    ///
    /// Returns the identity claims when the token is live. Revoked, expired,
    /// and never-issued tokens all return `None`.
    #[must_use]
    pub fn validate(&self, token: &str) -> Option<IdentityClaims> {
        let entry = self.access_tokens.get(token)?;
        if entry.revoked || Utc::now() >= entry.expires_at {
            return None;
        }
        Some(entry.claims.clone())
    }

    /// Rotate a refresh token: invalidate it and mint a fresh pair.
    ///
    /// The old token is marked revoked under its entry lock before the new
    /// pair exists, so a concurrent second use of the same refresh token
    /// fails. `requested_scope`, when present, may only narrow the
    /// previously granted scopes.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidGrant`] for unknown, revoked, expired, or
    /// mismatched tokens, and for any scope-widening attempt.
    pub fn rotate(
        &self,
        refresh_token: &str,
        client_id: &str,
        requested_scope: Option<&str>,
    ) -> Result<IssuedTokens, AuthError> {
        let (claims, rotation_count) = {
            let mut entry = self
                .refresh_tokens
                .get_mut(refresh_token)
                .ok_or_else(|| AuthError::InvalidGrant("Invalid refresh token".into()))?;

            if entry.revoked
                || Utc::now() >= entry.expires_at
                || entry.client_id != client_id
            {
                return Err(AuthError::InvalidGrant("Invalid refresh token".into()));
            }

            let mut claims = entry.claims.clone();
            if let Some(raw) = requested_scope {
                let narrowed: Vec<String> =
                    raw.split_whitespace().map(String::from).collect();
                if narrowed.is_empty() {
                    return Err(AuthError::InvalidGrant("Invalid scope".into()));
                }
                for s in &narrowed {
                    if !claims.scopes.iter().any(|granted| granted == s) {
                        return Err(AuthError::InvalidGrant(
                            "Requested scope exceeds original grant".into(),
                        ));
                    }
                }
                claims.scopes = narrowed;
            }

            // Point of no return: the old token dies before the new pair is
            // minted, so a concurrent reuse cannot win.
            entry.revoked = true;
            (claims, entry.rotation_count)
        };

        self.issue_pair_with_rotation(client_id, claims, rotation_count + 1)
    }

    /// Revoke a token (RFC 7009 semantics: idempotent, unknown tokens are
    /// not an error).
    ///
    /// Revoking a refresh token cascades to every access token minted
    /// alongside it. Revoking an access token leaves its refresh token
    /// usable.
    pub fn revoke(&self, token: &str) {
        if let Some(mut entry) = self.refresh_tokens.get_mut(token) {
            entry.revoked = true;
            drop(entry);
            let mut cascaded = 0usize;
            for mut access in self.access_tokens.iter_mut() {
                if access.refresh_parent.as_deref() == Some(token) {
                    access.revoked = true;
                    cascaded += 1;
                }
            }
            info!(cascaded, "Refresh token revoked");
            return;
        }

        if let Some(mut entry) = self.access_tokens.get_mut(token) {
            entry.revoked = true;
            info!("Access token revoked");
        }
    }

    /// Drop expired tokens
    pub fn sweep(&self) {
        let now = Utc::now();
        self.access_tokens.retain(|_, t| t.expires_at > now);
        self.refresh_tokens.retain(|_, t| t.expires_at > now);
    }

    /// Number of stored access tokens
    #[must_use]
    pub fn access_token_count(&self) -> usize {
        self.access_tokens.len()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn claims(scopes: &[&str]) -> IdentityClaims {
        IdentityClaims {
            subject: "user-123".into(),
            email: None,
            name: None,
            scopes: scopes.iter().map(|s| (*s).to_owned()).collect(),
            attributes: serde_json::Map::new(),
        }
    }

    #[test]
    fn test_issue_and_validate() {
        let store = TokenStore::default();
        let pair = store.issue_pair("client", claims(&["u2:read"])).unwrap();

        let validated = store.validate(&pair.access_token).unwrap();
        assert_eq!(validated.subject, "user-123");
        assert!(store.validate("never-issued").is_none());
    }

    #[test]
    fn test_rotation_invalidates_old_refresh_token() {
        let store = TokenStore::default();
        let pair = store.issue_pair("client", claims(&["u2:read"])).unwrap();

        let rotated = store
            .rotate(&pair.refresh_token, "client", None)
            .unwrap();
        assert_ne!(rotated.refresh_token, pair.refresh_token);

        let replay = store.rotate(&pair.refresh_token, "client", None);
        assert!(matches!(replay, Err(AuthError::InvalidGrant(_))));
    }

    #[test]
    fn test_rotation_rejects_wrong_client() {
        let store = TokenStore::default();
        let pair = store.issue_pair("client", claims(&["u2:read"])).unwrap();
        assert!(store.rotate(&pair.refresh_token, "other", None).is_err());
        // and the failed attempt did not consume the token
        assert!(store.rotate(&pair.refresh_token, "client", None).is_ok());
    }

    #[test]
    fn test_scope_narrowing_only() {
        let store = TokenStore::default();
        let pair = store
            .issue_pair("client", claims(&["u2:read", "u2:write"]))
            .unwrap();

        let widened = store.rotate(&pair.refresh_token, "client", Some("u2:read admin"));
        assert!(widened.is_err());

        // the widening attempt consumed nothing; narrow now
        let narrowed = store
            .rotate(&pair.refresh_token, "client", Some("u2:read"))
            .unwrap();
        assert_eq!(narrowed.scope, "u2:read");
    }

    #[test]
    fn test_refresh_revocation_cascades_to_access() {
        let store = TokenStore::default();
        let pair = store.issue_pair("client", claims(&["u2:read"])).unwrap();

        store.revoke(&pair.refresh_token);

        assert!(store.validate(&pair.access_token).is_none());
        assert!(store.rotate(&pair.refresh_token, "client", None).is_err());
    }

    #[test]
    fn test_revocation_cascade_does_not_chain_across_rotations() {
        let store = TokenStore::default();
        let first = store.issue_pair("client", claims(&["u2:read"])).unwrap();
        let second = store.rotate(&first.refresh_token, "client", None).unwrap();

        store.revoke(&second.refresh_token);

        // only the access token minted with the revoked refresh token dies
        assert!(store.validate(&second.access_token).is_none());
        assert!(store.validate(&first.access_token).is_some());
    }

    #[test]
    fn test_access_revocation_does_not_touch_refresh() {
        let store = TokenStore::default();
        let pair = store.issue_pair("client", claims(&["u2:read"])).unwrap();

        store.revoke(&pair.access_token);

        assert!(store.validate(&pair.access_token).is_none());
        assert!(store.rotate(&pair.refresh_token, "client", None).is_ok());
    }

    #[test]
    fn test_revoke_unknown_token_is_silent() {
        let store = TokenStore::default();
        store.revoke("never-issued");
    }

    #[test]
    fn test_expired_access_token_is_invalid() {
        let store = TokenStore::new(-1, ttl::REFRESH_TOKEN_TTL_SECS);
        let pair = store.issue_pair("client", claims(&["u2:read"])).unwrap();
        assert!(store.validate(&pair.access_token).is_none());
    }

    #[test]
    fn test_sweep_drops_expired() {
        let store = TokenStore::new(-1, -1);
        store.issue_pair("client", claims(&["u2:read"])).unwrap();
        store.sweep();
        assert_eq!(store.access_token_count(), 0);
    }
}
