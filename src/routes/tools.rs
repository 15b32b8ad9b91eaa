// ABOUTME: HTTP handlers for the U2 tool surface
// ABOUTME: Bearer-protected when the OAuth component is configured
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 u2-mcp contributors

//! Tool endpoint handlers

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use std::sync::Arc;

use crate::connection::ConnectionStatus;
use crate::errors::AppError;
use crate::middleware::require_bearer;
use crate::server::ServerResources;
use crate::tools::{
    self, CallSubroutineRequest, CallSubroutineResponse, ListCatalogRequest, ListCatalogResponse,
};

/// Tool routes, wrapped in bearer authentication when OAuth is configured
pub fn routes(resources: Arc<ServerResources>) -> Router {
    let mut router = Router::new()
        .route("/tools/call_subroutine", post(call_subroutine_handler))
        .route("/tools/catalog", get(list_catalog_handler))
        .route("/tools/status", get(connection_status_handler));

    if let Some(oauth) = &resources.oauth {
        router = router.layer(middleware::from_fn_with_state(
            Arc::clone(oauth),
            require_bearer,
        ));
    }

    router.with_state(resources)
}

async fn call_subroutine_handler(
    State(resources): State<Arc<ServerResources>>,
    Json(request): Json<CallSubroutineRequest>,
) -> Result<Json<CallSubroutineResponse>, AppError> {
    let response = tools::call_subroutine(&resources.connections, request).await?;
    Ok(Json(response))
}

async fn list_catalog_handler(
    State(resources): State<Arc<ServerResources>>,
    Query(request): Query<ListCatalogRequest>,
) -> Result<Json<ListCatalogResponse>, AppError> {
    let response = tools::list_catalog(&resources.connections, request).await?;
    Ok(Json(response))
}

async fn connection_status_handler(
    State(resources): State<Arc<ServerResources>>,
) -> Json<ConnectionStatus> {
    Json(tools::connection_status(&resources.connections))
}
