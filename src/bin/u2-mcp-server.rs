// ABOUTME: Process entry point for the U2 MCP server
// ABOUTME: Loads configuration, initializes logging, wires resources, and serves
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 u2-mcp contributors

//! U2 MCP server binary

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use u2_mcp_server::config::ServerConfig;
use u2_mcp_server::connection::UnconfiguredSession;
use u2_mcp_server::idp::create_idp_adapter;
use u2_mcp_server::logging;
use u2_mcp_server::server::{self, ServerResources};

#[derive(Debug, Parser)]
#[command(name = "u2-mcp-server", version, about = "OAuth bridge and tool server for UniVerse/UniData")]
struct Args {
    /// Override the configured bind address
    #[arg(long)]
    host: Option<String>,

    /// Override the configured HTTP port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init_from_env()?;

    let mut config = ServerConfig::from_env()?;
    if let Some(host) = args.host {
        config.http.host = host;
    }
    if let Some(port) = args.port {
        config.http.port = port;
    }

    info!("Configuration: {}", config.summary());

    let adapter = if config.auth.enabled {
        Some(create_idp_adapter(&config.idp)?)
    } else {
        None
    };

    // The vendor U2 client is wired here when available; without one the
    // tool surface reports the backend as unavailable.
    let session = Arc::new(UnconfiguredSession);

    let resources = Arc::new(ServerResources::new(config, adapter, session));
    server::run(resources).await
}
