// ABOUTME: OAuth 2.0 authorization-server bridge module root
// ABOUTME: Client registration, PKCE authorization-code flow, opaque tokens, IdP callback
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 u2-mcp contributors

//! # OAuth 2.0 Authorization-Server Bridge
//!
//! This server is a standards-facing OAuth 2.0 authorization server for its
//! clients while delegating the actual user login to an external OIDC
//! identity provider. Clients register dynamically (RFC 7591), run a
//! PKCE-protected authorization-code flow (RFC 7636, S256 only), and receive
//! opaque access/refresh tokens minted here. The external provider is never
//! exposed to clients.

pub mod callback;
pub mod client_registry;
pub mod code_store;
pub mod models;
pub mod provider;
pub mod session_store;
pub mod token_store;

pub use callback::{CallbackHandler, CallbackOutcome};
pub use client_registry::ClientRegistry;
pub use code_store::AuthorizationCodeStore;
pub use models::{
    AuthError, AuthorizeParams, CallbackParams, ClientRegistrationRequest,
    ClientRegistrationResponse, IdentityClaims, OAuth2Error, RegisteredClient, RevokeRequest,
    TokenRequest, TokenResponse,
};
pub use provider::OAuth2AuthorizationServer;
pub use session_store::AuthorizationSessionStore;
pub use token_store::TokenStore;

use crate::constants::oauth;
use base64::{engine::general_purpose, Engine as _};
use ring::rand::{SecureRandom, SystemRandom};

/// Generate a URL-safe random string from `length` bytes of system entropy.
///
/// Used for states, authorization codes, and tokens. Failure of the system
/// RNG is unrecoverable for a security-sensitive server.
pub(crate) fn generate_random_string(length: usize) -> Result<String, AuthError> {
    let rng = SystemRandom::new();
    let mut bytes = vec![0u8; length];

    rng.fill(&mut bytes).map_err(|e| {
        tracing::error!(
            "CRITICAL: SystemRandom failed - cannot generate secure random bytes: {}",
            e
        );
        AuthError::Internal("System RNG failure - server cannot operate securely".into())
    })?;

    Ok(general_purpose::URL_SAFE_NO_PAD.encode(&bytes))
}

/// Generate a token-sized (256-bit) random string.
pub(crate) fn generate_token() -> Result<String, AuthError> {
    generate_random_string(oauth::TOKEN_LENGTH_BYTES)
}
