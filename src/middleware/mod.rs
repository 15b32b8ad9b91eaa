// ABOUTME: HTTP middleware module root
// ABOUTME: Currently request authentication only
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 u2-mcp contributors

//! HTTP middleware

pub mod auth;

pub use auth::require_bearer;
