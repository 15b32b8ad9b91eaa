// ABOUTME: Main library entry point for the U2 MCP server
// ABOUTME: Provides the OAuth authorization bridge and U2 database tool surface
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 u2-mcp contributors

#![deny(unsafe_code)]

//! # U2 MCP Server
//!
//! A Model Context Protocol (MCP) server for Rocket UniVerse/UniData (U2)
//! databases. Remote tool-calling clients authenticate through an external
//! OIDC identity provider (generic OIDC, Duo, Auth0) while this server
//! presents a standards-compliant OAuth 2.0 authorization-server interface
//! of its own: dynamic client registration, a PKCE-protected
//! authorization-code flow, and opaque access/refresh tokens bound to the
//! verified identity. The client never talks to the external provider
//! directly.
//!
//! ## Architecture
//!
//! - **`oauth2`**: the authorization-server bridge — client registry,
//!   session/code/token stores, callback handling, orchestration
//! - **`idp`**: adapters for the supported external identity providers
//! - **`connection`**: the vendor U2 session boundary and manager
//! - **`tools`**: stateless tool handlers over the connection boundary
//! - **`routes`**: the axum HTTP surface
//! - **`config`**: environment-based configuration
//!
//! ## Example
//!
//! ```rust,no_run
//! use u2_mcp_server::config::environment::ServerConfig;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env()?;
//!     println!("U2 MCP Server will bind {}:{}", config.http.host, config.http.port);
//!     Ok(())
//! }
//! ```

/// Environment-based configuration management
pub mod config;

/// U2 vendor connection boundary and session management
pub mod connection;

/// Application constants and protocol defaults
pub mod constants;

/// Unified error handling with HTTP response mapping
pub mod errors;

/// External identity provider adapters (generic OIDC, Duo, Auth0)
pub mod idp;

/// Structured logging configuration
pub mod logging;

/// Request authentication middleware
pub mod middleware;

/// OAuth 2.0 authorization-server bridge
pub mod oauth2;

/// HTTP route handlers and router assembly
pub mod routes;

/// Server resource wiring and serve loop
pub mod server;

/// U2 database tool handlers
pub mod tools;
