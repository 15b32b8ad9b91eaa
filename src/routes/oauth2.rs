// ABOUTME: HTTP handlers for the OAuth authorization-server endpoints
// ABOUTME: Registration, authorize, provider callback, token, revoke, and discovery
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 u2-mcp contributors

//! OAuth endpoint handlers
//!
//! Thin translation between HTTP and [`OAuth2AuthorizationServer`]: extract,
//! delegate, map errors to the RFC 6749 wire shape.

use axum::extract::{Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use std::sync::Arc;

use crate::oauth2::models::{
    AuthError, AuthorizeParams, CallbackParams, ClientRegistrationRequest, RevokeRequest,
    TokenRequest,
};
use crate::oauth2::{CallbackOutcome, OAuth2AuthorizationServer};

/// Routes contributed by the OAuth component
pub fn routes(oauth: Arc<OAuth2AuthorizationServer>) -> Router {
    Router::new()
        .route("/register", post(register_handler))
        .route("/authorize", get(authorize_handler))
        .route("/oauth/callback", get(callback_handler))
        .route("/token", post(token_handler))
        .route("/revoke", post(revoke_handler))
        .route(
            "/.well-known/oauth-authorization-server",
            get(discovery_handler),
        )
        .with_state(oauth)
}

async fn register_handler(
    State(oauth): State<Arc<OAuth2AuthorizationServer>>,
    Json(request): Json<ClientRegistrationRequest>,
) -> Response {
    match oauth.register(&request) {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn authorize_handler(
    State(oauth): State<Arc<OAuth2AuthorizationServer>>,
    Query(params): Query<AuthorizeParams>,
) -> Response {
    match oauth.authorize(&params).await {
        Ok(idp_url) => found(&idp_url),
        Err(e) => error_response(&e),
    }
}

async fn callback_handler(
    State(oauth): State<Arc<OAuth2AuthorizationServer>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    match oauth.callback(params).await {
        CallbackOutcome::Redirect(url) => found(&url),
        CallbackOutcome::Failure { status, html } => (
            StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_REQUEST),
            Html(html),
        )
            .into_response(),
    }
}

async fn token_handler(
    State(oauth): State<Arc<OAuth2AuthorizationServer>>,
    Form(request): Form<TokenRequest>,
) -> Response {
    match oauth.token(&request) {
        Ok(response) => Json(response).into_response(),
        Err(e) => error_response(&e),
    }
}

// RFC 7009: revocation always reports success
async fn revoke_handler(
    State(oauth): State<Arc<OAuth2AuthorizationServer>>,
    Form(request): Form<RevokeRequest>,
) -> StatusCode {
    oauth.revoke(&request);
    StatusCode::OK
}

async fn discovery_handler(
    State(oauth): State<Arc<OAuth2AuthorizationServer>>,
) -> Json<serde_json::Value> {
    Json(oauth.discovery_document())
}

// 302 Found for the browser legs of the flow; axum's Redirect only offers
// 303/307/308.
fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(_) => error_response(&AuthError::Internal("invalid redirect location".into())),
    }
}

fn error_response(error: &AuthError) -> Response {
    let status =
        StatusCode::from_u16(error.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(error.to_oauth2_error())).into_response()
}
