// ABOUTME: Stateless U2 tool handlers: subroutine calls, catalog listing, status
// ABOUTME: Thin request/response wrappers over the connection manager
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 u2-mcp contributors

//! # U2 Tool Handlers
//!
//! Each tool is a stateless wrapper over [`ConnectionManager`]: validate the
//! request, run it through the guard-railed session, shape the response.
//! Protocol state lives entirely in the OAuth layer; nothing here persists
//! between requests.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::connection::{ConnectionError, ConnectionManager, ConnectionStatus};
use crate::errors::AppError;

impl From<ConnectionError> for AppError {
    fn from(error: ConnectionError) -> Self {
        match error {
            ConnectionError::Unavailable(msg) => AppError::unavailable(msg),
            ConnectionError::CommandBlocked(verb) => {
                AppError::permission_denied(format!("Command is blocked: {verb}"))
            }
            ConnectionError::ReadOnly(verb) => AppError::permission_denied(format!(
                "Command not permitted in read-only mode: {verb}"
            )),
            ConnectionError::Execution(msg) => AppError::invalid_input(msg),
        }
    }
}

/// Request body for the `call_subroutine` tool
#[derive(Debug, Clone, Deserialize)]
pub struct CallSubroutineRequest {
    /// Name of the cataloged subroutine
    pub name: String,
    /// Input argument values; passed by reference, so outputs come back in
    /// the same positions
    #[serde(default)]
    pub args: Vec<String>,
    /// Total argument count the subroutine expects. Required when the
    /// subroutine has output-only trailing arguments.
    pub num_args: Option<usize>,
}

/// Response body for the `call_subroutine` tool
#[derive(Debug, Clone, Serialize)]
pub struct CallSubroutineResponse {
    /// Subroutine that was called
    pub subroutine: String,
    /// Arguments as supplied
    pub args_in: Vec<String>,
    /// Arguments after the call, including outputs
    pub args_out: Vec<String>,
    /// Total argument count used
    pub num_args: usize,
}

/// Call a cataloged BASIC subroutine.
///
/// Missing trailing arguments up to `num_args` are sent as empty strings so
/// output-only parameters have a slot.
///
/// # Errors
///
/// Returns `InvalidInput` when `num_args` is smaller than the supplied
/// argument list, plus any connection-level failure.
pub async fn call_subroutine(
    manager: &ConnectionManager,
    request: CallSubroutineRequest,
) -> Result<CallSubroutineResponse, AppError> {
    let num_args = request.num_args.unwrap_or(request.args.len());

    if num_args < request.args.len() {
        return Err(AppError::invalid_input(format!(
            "num_args ({num_args}) cannot be less than args length ({})",
            request.args.len()
        )));
    }

    let mut args = request.args.clone();
    args.resize(num_args, String::new());

    let args_out = manager.call_subroutine(&request.name, args).await?;

    Ok(CallSubroutineResponse {
        subroutine: request.name,
        args_in: request.args,
        args_out,
        num_args,
    })
}

/// Query parameters for the `list_catalog` tool
#[derive(Debug, Clone, Deserialize)]
pub struct ListCatalogRequest {
    /// Program name pattern; `*` wildcards, case-insensitive
    #[serde(default = "default_pattern")]
    pub pattern: String,
}

fn default_pattern() -> String {
    "*".to_owned()
}

/// Response body for the `list_catalog` tool
#[derive(Debug, Clone, Serialize)]
pub struct ListCatalogResponse {
    /// The pattern that was applied
    pub pattern: String,
    /// Matching cataloged program names
    pub programs: Vec<String>,
    /// Number of matches
    pub count: usize,
}

/// List cataloged programs matching a wildcard pattern.
///
/// # Errors
///
/// Propagates connection-level failures.
pub async fn list_catalog(
    manager: &ConnectionManager,
    request: ListCatalogRequest,
) -> Result<ListCatalogResponse, AppError> {
    let command = if request.pattern == "*" {
        "CATALOG".to_owned()
    } else {
        // CATALOG's own wildcard syntax uses "..."
        format!("CATALOG \"{}\"", request.pattern.replace('*', "..."))
    };

    let output = manager.execute_command(&command).await?;

    let mut programs: Vec<String> = parse_catalog_output(&output)
        .into_iter()
        .filter(|name| matches_pattern(name, &request.pattern))
        .collect();

    if programs.len() > manager.max_records() {
        warn!(
            matches = programs.len(),
            cap = manager.max_records(),
            "Catalog listing truncated"
        );
        programs.truncate(manager.max_records());
    }

    Ok(ListCatalogResponse {
        pattern: request.pattern,
        count: programs.len(),
        programs,
    })
}

/// Report the configured connection.
#[must_use]
pub fn connection_status(manager: &ConnectionManager) -> ConnectionStatus {
    manager.status()
}

/// Extract program names from raw CATALOG output, skipping banners,
/// separators, and column headers.
fn parse_catalog_output(output: &str) -> Vec<String> {
    const HEADER_WORDS: &[&str] = &["CATALOG", "PROGRAM", "NAME", "LOCAL", "GLOBAL", "DIRECT"];

    let mut programs = Vec::new();

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with('*') || line.starts_with('-') || line.starts_with('=') {
            continue;
        }
        let upper = line.to_ascii_uppercase();
        if HEADER_WORDS.iter().any(|header| upper.contains(header)) {
            continue;
        }

        if let Some(first) = line.split_whitespace().next() {
            // Counts and status words are not program names
            if first.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            programs.push(first.to_owned());
        }
    }

    programs
}

/// Case-insensitive wildcard match where `*` spans any run of characters
fn matches_pattern(name: &str, pattern: &str) -> bool {
    fn matches(name: &[u8], pattern: &[u8]) -> bool {
        match (pattern.first(), name.first()) {
            (None, None) => true,
            (Some(b'*'), _) => {
                matches(name, &pattern[1..])
                    || (!name.is_empty() && matches(&name[1..], pattern))
            }
            (Some(p), Some(n)) => p == n && matches(&name[1..], &pattern[1..]),
            (Some(_), None) | (None, Some(_)) => false,
        }
    }

    matches(
        name.to_ascii_uppercase().as_bytes(),
        pattern.to_ascii_uppercase().as_bytes(),
    )
}
