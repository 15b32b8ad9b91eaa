// ABOUTME: Configuration module root re-exporting the environment-based config types
// ABOUTME: Keeps configuration concerns in one place for server and binary wiring
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 u2-mcp contributors

//! Configuration management

pub mod environment;

pub use environment::{
    AuthConfig, Environment, HttpConfig, IdpConfig, IdpProvider, LogLevel, ServerConfig, U2Config,
};
