// ABOUTME: Server resource wiring, background expiry sweep, and the serve loop
// ABOUTME: ServerResources is the dependency bundle shared across route handlers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 u2-mcp contributors

//! Server assembly and serve loop

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::connection::{ConnectionManager, U2Session};
use crate::constants::ttl;
use crate::idp::IdpAdapter;
use crate::oauth2::OAuth2AuthorizationServer;
use crate::routes;

/// Everything route handlers need, wired once at startup
pub struct ServerResources {
    /// Loaded configuration
    pub config: ServerConfig,
    /// The OAuth component; `None` when authentication is disabled
    pub oauth: Option<Arc<OAuth2AuthorizationServer>>,
    /// The guard-railed U2 connection boundary
    pub connections: Arc<ConnectionManager>,
}

impl ServerResources {
    /// Wire resources from configuration, an optional identity provider
    /// adapter, and an injected U2 session.
    #[must_use]
    pub fn new(
        config: ServerConfig,
        adapter: Option<Arc<dyn IdpAdapter>>,
        session: Arc<dyn U2Session>,
    ) -> Self {
        let oauth = if config.auth.enabled {
            adapter.map(|adapter| {
                Arc::new(OAuth2AuthorizationServer::with_ttls(
                    &config.auth.issuer_url,
                    adapter,
                    config.auth.token_expiry_secs,
                    config.auth.refresh_token_expiry_secs,
                ))
            })
        } else {
            None
        };

        let connections = Arc::new(ConnectionManager::new(config.u2.clone(), session));

        Self {
            config,
            oauth,
            connections,
        }
    }
}

/// Run the HTTP server until the process is signalled.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server loop fails.
pub async fn run(resources: Arc<ServerResources>) -> Result<()> {
    if let Some(oauth) = &resources.oauth {
        spawn_expiry_sweep(Arc::clone(oauth));
    }

    let addr = format!(
        "{}:{}",
        resources.config.http.host, resources.config.http.port
    );
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(%addr, "HTTP server listening");

    let router = routes::build_router(resources);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("HTTP server stopped");
    Ok(())
}

/// Periodic cleanup keeps the in-memory stores bounded; expired entries are
/// also rejected lazily on access, so the interval is not load-bearing for
/// correctness.
fn spawn_expiry_sweep(oauth: Arc<OAuth2AuthorizationServer>) {
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs(ttl::SWEEP_INTERVAL_SECS));
        loop {
            interval.tick().await;
            oauth.sweep_expired();
            debug!("Expiry sweep completed");
        }
    });
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::error!("Failed to install shutdown signal handler");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
