// ABOUTME: Router assembly for the OAuth surface, tool endpoints, and health check
// ABOUTME: One construction path; the auth component attaches conditionally
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 u2-mcp contributors

//! # HTTP Routes
//!
//! [`build_router`] is the single router construction path. When the OAuth
//! component is present it contributes the authorization-server endpoints
//! and the bearer middleware on the tool surface; without it the tool
//! surface is open. There are never two server configurations to keep in
//! sync.

pub mod oauth2;
pub mod tools;

use axum::http::HeaderValue;
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::ServerResources;

/// Assemble the full application router
#[must_use]
pub fn build_router(resources: Arc<ServerResources>) -> Router {
    let mut router = Router::new()
        .route("/health", get(health_handler))
        .merge(tools::routes(Arc::clone(&resources)));

    if let Some(oauth) = &resources.oauth {
        router = router.merge(oauth2::routes(Arc::clone(oauth)));
    }

    router
        .layer(cors_layer(&resources.config.http.cors_origins))
        .layer(TraceLayer::new_for_http())
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods(Any)
        .allow_headers(Any)
}
