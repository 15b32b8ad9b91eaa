// ABOUTME: Bearer-token authentication middleware for the protected tool surface
// ABOUTME: Validates opaque access tokens and injects identity claims into request extensions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 u2-mcp contributors

//! Request authentication
//!
//! Every protected route goes through [`require_bearer`]. Invalid tokens of
//! any kind (unknown, revoked, expired, malformed header) produce the same
//! `401` body.

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;
use tracing::debug;

use crate::oauth2::models::OAuth2Error;
use crate::oauth2::OAuth2AuthorizationServer;

/// Reject the request unless it carries a valid bearer token.
///
/// On success the verified [`crate::oauth2::models::IdentityClaims`] are
/// inserted into request extensions for handlers to read.
pub async fn require_bearer(
    State(oauth): State<Arc<OAuth2AuthorizationServer>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let Some(token) = token else {
        debug!("Request without a bearer token rejected");
        return unauthorized();
    };

    let Some(claims) = oauth.validate_bearer(token) else {
        debug!("Request with an invalid bearer token rejected");
        return unauthorized();
    };

    request.extensions_mut().insert(claims);
    next.run(request).await
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Bearer")],
        Json(OAuth2Error {
            error: "invalid_token".to_owned(),
            error_description: Some("The access token is missing or invalid".to_owned()),
            error_uri: None,
        }),
    )
        .into_response()
}
