// ABOUTME: TTL-bounded store for in-flight authorization sessions keyed by state
// ABOUTME: Atomic single-use consumption prevents callback replay
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 u2-mcp contributors

//! Authorization session store
//!
//! A session is created when `/authorize` is accepted and consumed exactly
//! once at the identity provider callback. Consumption is a single
//! `DashMap::remove`: a replayed callback finds nothing, and two concurrent
//! callbacks race for the one removal.

use chrono::{Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, warn};

use super::models::{AuthError, AuthorizationSession};
use crate::constants::{oauth, ttl};

/// In-memory store of pending authorization sessions
#[derive(Debug)]
pub struct AuthorizationSessionStore {
    sessions: DashMap<String, AuthorizationSession>,
    ttl_secs: i64,
}

impl Default for AuthorizationSessionStore {
    fn default() -> Self {
        Self::new(ttl::SESSION_TTL_SECS)
    }
}

/// Inputs for creating a session, validated by the caller against the
/// client registry
#[derive(Debug)]
pub struct SessionRequest {
    /// Initiating client
    pub client_id: String,
    /// Validated client redirect URI
    pub client_redirect_uri: String,
    /// Client's own state, echoed on completion
    pub client_state: Option<String>,
    /// Local scopes to grant on success
    pub requested_scopes: Vec<String>,
    /// Client's PKCE challenge
    pub pkce_challenge: String,
    /// This server's PKCE verifier for the IdP leg
    pub idp_pkce_verifier: String,
}

impl AuthorizationSessionStore {
    /// Create a store with the given session TTL
    #[must_use]
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl_secs,
        }
    }

    /// Create a session under a fresh unguessable state and return that
    /// state.
    ///
    /// A generated state colliding with a live session is treated as an
    /// internal fault: the existing session is never overwritten. One
    /// regeneration is attempted before giving up.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Internal`] if the RNG fails or both generated
    /// states collide.
    pub fn begin(&self, request: SessionRequest) -> Result<String, AuthError> {
        for attempt in 0..2 {
            let state = super::generate_random_string(oauth::TOKEN_LENGTH_BYTES)?;
            let now = Utc::now();
            let session = AuthorizationSession {
                state: state.clone(),
                client_id: request.client_id.clone(),
                client_redirect_uri: request.client_redirect_uri.clone(),
                client_state: request.client_state.clone(),
                requested_scopes: request.requested_scopes.clone(),
                pkce_challenge: request.pkce_challenge.clone(),
                idp_pkce_verifier: request.idp_pkce_verifier.clone(),
                created_at: now,
                expires_at: now + Duration::seconds(self.ttl_secs),
            };

            match self.sessions.entry(state.clone()) {
                Entry::Vacant(vacant) => {
                    vacant.insert(session);
                    debug!(client_id = %request.client_id, "Authorization session created");
                    return Ok(state);
                }
                Entry::Occupied(_) => {
                    warn!(attempt, "Generated state collided with a live session");
                }
            }
        }

        Err(AuthError::Internal(
            "Could not generate a unique authorization state".into(),
        ))
    }

    /// Atomically consume the session for `state`.
    ///
    /// Returns `None` for unknown, already-consumed, and expired states
    /// alike; callers must not distinguish those cases.
    #[must_use]
    pub fn consume(&self, state: &str) -> Option<AuthorizationSession> {
        let (_, session) = self.sessions.remove(state)?;
        if session.is_expired() {
            debug!("Consumed session was expired; treating as invalid");
            return None;
        }
        Some(session)
    }

    /// Drop expired sessions
    pub fn sweep(&self) {
        let now = Utc::now();
        self.sessions.retain(|_, session| session.expires_at > now);
    }

    /// Number of live entries (includes not-yet-swept expired sessions)
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn sample_request() -> SessionRequest {
        SessionRequest {
            client_id: "u2_client_abc".into(),
            client_redirect_uri: "http://localhost:3000/cb".into(),
            client_state: Some("client-state".into()),
            requested_scopes: vec!["u2:read".into()],
            pkce_challenge: "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM".into(),
            idp_pkce_verifier: "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk".into(),
        }
    }

    #[test]
    fn test_begin_and_consume_once() {
        let store = AuthorizationSessionStore::default();
        let state = store.begin(sample_request()).unwrap();

        let session = store.consume(&state).unwrap();
        assert_eq!(session.client_id, "u2_client_abc");
        assert_eq!(session.client_state.as_deref(), Some("client-state"));

        // second consume finds nothing
        assert!(store.consume(&state).is_none());
    }

    #[test]
    fn test_unknown_state_is_none() {
        let store = AuthorizationSessionStore::default();
        assert!(store.consume("never-issued").is_none());
    }

    #[test]
    fn test_expired_session_is_indistinguishable_from_unknown() {
        let store = AuthorizationSessionStore::new(-1);
        let state = store.begin(sample_request()).unwrap();
        assert!(store.consume(&state).is_none());
    }

    #[test]
    fn test_sweep_removes_expired() {
        let store = AuthorizationSessionStore::new(-1);
        store.begin(sample_request()).unwrap();
        assert_eq!(store.len(), 1);
        store.sweep();
        assert!(store.is_empty());
    }
}
