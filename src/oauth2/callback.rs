// ABOUTME: Identity provider callback handling, session consumption, and code minting
// ABOUTME: Produces either a client redirect with a fresh code or an HTML failure page
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 u2-mcp contributors

//! Provider callback handling
//!
//! The external provider redirects the end user's browser here after login.
//! On success the browser leaves with a redirect to the client's registered
//! URI carrying this server's own authorization code. On failure there is no
//! verified redirect target to trust, so the user gets an HTML error page
//! instead of a redirect.

use std::sync::Arc;
use tracing::{info, warn};

use super::code_store::AuthorizationCodeStore;
use super::models::{AuthError, CallbackParams};
use super::session_store::AuthorizationSessionStore;
use crate::idp::IdpAdapter;

const ERROR_TEMPLATE: &str = include_str!("../../templates/oauth_error.html");

/// What the HTTP layer should send back to the browser
#[derive(Debug)]
pub enum CallbackOutcome {
    /// 302 to the client's registered redirect URI
    Redirect(String),
    /// Terminal failure rendered as HTML
    Failure {
        /// HTTP status for the page
        status: u16,
        /// Rendered page body
        html: String,
    },
}

/// Handles the provider's redirect back to this server
pub struct CallbackHandler {
    sessions: Arc<AuthorizationSessionStore>,
    codes: Arc<AuthorizationCodeStore>,
    adapter: Arc<dyn IdpAdapter>,
    /// This server's own redirect URI on the provider leg, re-sent at the
    /// code exchange
    callback_uri: String,
}

impl CallbackHandler {
    /// Wire the handler to its stores and adapter
    #[must_use]
    pub fn new(
        sessions: Arc<AuthorizationSessionStore>,
        codes: Arc<AuthorizationCodeStore>,
        adapter: Arc<dyn IdpAdapter>,
        callback_uri: String,
    ) -> Self {
        Self {
            sessions,
            codes,
            adapter,
            callback_uri,
        }
    }

    /// Process a provider callback
    pub async fn handle(&self, params: CallbackParams) -> CallbackOutcome {
        // Provider-reported error: terminate before touching any state the
        // attacker does not hold. The session, if any, is burned so the
        // state value cannot be retried.
        if let Some(error) = &params.error {
            warn!(
                provider = self.adapter.name(),
                error = %error,
                "Identity provider reported an authorization error"
            );
            if let Some(state) = &params.state {
                let _ = self.sessions.consume(state);
            }
            return Self::render_page(
                400,
                "Sign-in was not completed",
                params
                    .error_description
                    .as_deref()
                    .unwrap_or("The identity provider did not authorize the request."),
            );
        }

        match self.process(&params).await {
            Ok(redirect) => CallbackOutcome::Redirect(redirect),
            Err(error) => Self::failure_page(&error),
        }
    }

    async fn process(&self, params: &CallbackParams) -> Result<String, AuthError> {
        let (Some(state), Some(code)) = (params.state.as_deref(), params.code.as_deref())
        else {
            return Err(AuthError::InvalidRequest(
                "callback is missing required parameters".into(),
            ));
        };

        // Single-use: a replayed or expired state finds no session.
        let Some(session) = self.sessions.consume(state) else {
            warn!("Callback arrived for an unknown or expired authorization session");
            return Err(AuthError::SessionExpiredOrInvalid);
        };

        // Outbound exchange happens with no store lock held; the session is
        // already owned by this handler.
        let identity = self
            .adapter
            .exchange_code(code, &self.callback_uri, &session.idp_pkce_verifier)
            .await
            .map_err(|e| {
                warn!(
                    provider = self.adapter.name(),
                    error = %e,
                    "Code exchange with the identity provider failed"
                );
                AuthError::IdentityProvider(e.to_string())
            })?;

        let mut claims = identity.claims;
        claims.scopes = session.requested_scopes.clone();

        let local_code = self
            .codes
            .issue(
                &session.client_id,
                &session.client_redirect_uri,
                &session.pkce_challenge,
                claims,
            )
            .map_err(|e| {
                tracing::error!("Failed to mint authorization code: {}", e);
                e
            })?;

        info!(
            client_id = %session.client_id,
            provider = self.adapter.name(),
            "Authorization completed; redirecting to client"
        );

        // Only this server's code and the client's own state go back; the
        // provider's code and state never leave this handler.
        let mut redirect = format!(
            "{}?code={}",
            session.client_redirect_uri,
            urlencoding::encode(&local_code)
        );
        if let Some(client_state) = &session.client_state {
            redirect.push_str("&state=");
            redirect.push_str(&urlencoding::encode(client_state));
        }

        Ok(redirect)
    }

    /// Render a terminal failure. The page text is fixed per error class;
    /// internal detail never reaches the browser.
    fn failure_page(error: &AuthError) -> CallbackOutcome {
        let (title, description) = match error {
            AuthError::SessionExpiredOrInvalid => (
                "Session expired",
                "This sign-in attempt has expired or was already completed.",
            ),
            AuthError::IdentityProvider(_) => (
                "Sign-in could not be verified",
                "The identity provider could not confirm the sign-in. Please try again.",
            ),
            AuthError::InvalidRequest(_)
            | AuthError::InvalidClientMetadata(_)
            | AuthError::InvalidGrant(_) => (
                "Invalid callback",
                "The callback request is missing required parameters.",
            ),
            AuthError::Internal(_) => (
                "Internal error",
                "The server could not complete the sign-in. Please try again.",
            ),
        };
        Self::render_page(error.http_status(), title, description)
    }

    fn render_page(status: u16, title: &str, description: &str) -> CallbackOutcome {
        let html = ERROR_TEMPLATE
            .replace("{{error_title}}", &html_escape::encode_text(title))
            .replace(
                "{{error_description}}",
                &html_escape::encode_text(description),
            );
        CallbackOutcome::Failure { status, html }
    }
}
