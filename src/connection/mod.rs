// ABOUTME: U2 vendor connection boundary: session trait, guard rails, and manager
// ABOUTME: Sessions are constructor-injected so tests and deployments choose the backend
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 u2-mcp contributors

//! # U2 Connection Boundary
//!
//! The vendor UniVerse/UniData client is modeled as the [`U2Session`] trait.
//! [`ConnectionManager`] owns the configured session, enforces the
//! blocked-command and read-only guard rails before anything reaches the
//! backend, and reports connection status. There is no process-global
//! manager; whoever builds the server decides which session implementation
//! to inject.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::U2Config;

/// Errors from the U2 boundary
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// The backend is not reachable or not configured
    #[error("U2 backend unavailable: {0}")]
    Unavailable(String),

    /// Command refused by the blocked-command list
    #[error("command is blocked: {0}")]
    CommandBlocked(String),

    /// Command refused because the server runs read-only
    #[error("command not permitted in read-only mode: {0}")]
    ReadOnly(String),

    /// The backend accepted the request but execution failed
    #[error("execution failed: {0}")]
    Execution(String),
}

/// A live session against a UniVerse or UniData server.
///
/// Implementations wrap the vendor client; tests inject scripted sessions.
#[async_trait::async_trait]
pub trait U2Session: Send + Sync {
    /// Execute a TCL command and return its raw response text
    async fn execute_command(&self, command: &str) -> Result<String, ConnectionError>;

    /// Call a cataloged BASIC subroutine. Arguments are passed by
    /// reference on the wire, so the full post-call argument list comes
    /// back.
    async fn call_subroutine(
        &self,
        name: &str,
        args: Vec<String>,
    ) -> Result<Vec<String>, ConnectionError>;
}

/// Status snapshot for the `connection_status` tool
#[derive(Debug, Clone, serde::Serialize)]
pub struct ConnectionStatus {
    /// Configured U2 host
    pub host: String,
    /// Configured account
    pub account: String,
    /// `uvcs` or `udcs`
    pub service: String,
    /// Whether the server refuses modifying commands
    pub read_only: bool,
    /// When this manager was created
    pub since: DateTime<Utc>,
}

/// Commands that modify data or the account, refused in read-only mode
const MODIFYING_COMMANDS: &[&str] = &[
    "DELETE",
    "DELETE.FILE",
    "CLEAR.FILE",
    "CREATE.FILE",
    "CNAME",
    "WRITE",
    "COPY",
    "ED",
];

/// Owns the injected session and applies guard rails
pub struct ConnectionManager {
    config: U2Config,
    session: Arc<dyn U2Session>,
    since: DateTime<Utc>,
}

impl ConnectionManager {
    /// Build a manager around an injected session
    #[must_use]
    pub fn new(config: U2Config, session: Arc<dyn U2Session>) -> Self {
        Self {
            config,
            session,
            since: Utc::now(),
        }
    }

    /// Execute a TCL command after the blocked-command and read-only checks
    pub async fn execute_command(&self, command: &str) -> Result<String, ConnectionError> {
        let verb = Self::command_verb(command);

        if self
            .config
            .blocked_commands
            .iter()
            .any(|blocked| blocked.eq_ignore_ascii_case(&verb))
        {
            warn!(verb = %verb, "Blocked command refused");
            return Err(ConnectionError::CommandBlocked(verb));
        }

        if self.config.read_only
            && MODIFYING_COMMANDS
                .iter()
                .any(|modifying| modifying.eq_ignore_ascii_case(&verb))
        {
            warn!(verb = %verb, "Modifying command refused in read-only mode");
            return Err(ConnectionError::ReadOnly(verb));
        }

        debug!(verb = %verb, "Executing TCL command");
        self.session.execute_command(command).await
    }

    /// Call a cataloged subroutine; no guard rails apply beyond the
    /// backend's own catalog.
    pub async fn call_subroutine(
        &self,
        name: &str,
        args: Vec<String>,
    ) -> Result<Vec<String>, ConnectionError> {
        debug!(subroutine = %name, args = args.len(), "Calling subroutine");
        self.session.call_subroutine(name, args).await
    }

    /// Snapshot of the configured connection
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        ConnectionStatus {
            host: self.config.host.clone(),
            account: self.config.account.clone(),
            service: self.config.service.clone(),
            read_only: self.config.read_only,
            since: self.since,
        }
    }

    /// Configured cap on result list sizes
    #[must_use]
    pub fn max_records(&self) -> usize {
        self.config.max_records
    }

    fn command_verb(command: &str) -> String {
        command
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_ascii_uppercase()
    }
}

/// Placeholder session for deployments where the vendor client is not
/// wired in. Every call reports the backend as unavailable.
#[derive(Debug, Default)]
pub struct UnconfiguredSession;

#[async_trait::async_trait]
impl U2Session for UnconfiguredSession {
    async fn execute_command(&self, _command: &str) -> Result<String, ConnectionError> {
        Err(ConnectionError::Unavailable(
            "no U2 session backend is configured".into(),
        ))
    }

    async fn call_subroutine(
        &self,
        _name: &str,
        _args: Vec<String>,
    ) -> Result<Vec<String>, ConnectionError> {
        Err(ConnectionError::Unavailable(
            "no U2 session backend is configured".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::constants::{defaults, ports};

    struct EchoSession;

    #[async_trait::async_trait]
    impl U2Session for EchoSession {
        async fn execute_command(&self, command: &str) -> Result<String, ConnectionError> {
            Ok(format!("ran: {command}"))
        }

        async fn call_subroutine(
            &self,
            _name: &str,
            args: Vec<String>,
        ) -> Result<Vec<String>, ConnectionError> {
            Ok(args)
        }
    }

    fn config(read_only: bool) -> U2Config {
        U2Config {
            host: "u2.example.com".into(),
            user: "svc".into(),
            password: "pw".into(),
            account: "DEMO".into(),
            service: defaults::SERVICE_UNIVERSE.into(),
            port: ports::DEFAULT_U2_PORT,
            ssl: false,
            timeout_secs: defaults::CONNECT_TIMEOUT_SECS,
            read_only,
            max_records: defaults::MAX_RECORDS,
            blocked_commands: defaults::BLOCKED_COMMANDS
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_blocked_command_refused() {
        let manager = ConnectionManager::new(config(false), Arc::new(EchoSession));
        let result = manager.execute_command("DELETE.FILE CUSTOMERS").await;
        assert!(matches!(result, Err(ConnectionError::CommandBlocked(_))));
    }

    #[tokio::test]
    async fn test_blocked_check_is_case_insensitive() {
        let manager = ConnectionManager::new(config(false), Arc::new(EchoSession));
        let result = manager.execute_command("delete.file CUSTOMERS").await;
        assert!(matches!(result, Err(ConnectionError::CommandBlocked(_))));
    }

    #[tokio::test]
    async fn test_read_only_refuses_modifying_commands() {
        let manager = ConnectionManager::new(config(true), Arc::new(EchoSession));
        assert!(matches!(
            manager.execute_command("COPY FROM A TO B").await,
            Err(ConnectionError::ReadOnly(_))
        ));
        assert!(manager.execute_command("LIST CUSTOMERS").await.is_ok());
    }

    #[tokio::test]
    async fn test_allowed_command_passes_through() {
        let manager = ConnectionManager::new(config(false), Arc::new(EchoSession));
        let output = manager.execute_command("LIST VOC").await.unwrap();
        assert_eq!(output, "ran: LIST VOC");
    }

    #[tokio::test]
    async fn test_unconfigured_session_reports_unavailable() {
        let manager = ConnectionManager::new(config(false), Arc::new(UnconfiguredSession));
        assert!(matches!(
            manager.execute_command("LIST VOC").await,
            Err(ConnectionError::Unavailable(_))
        ));
    }
}
