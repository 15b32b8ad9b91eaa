// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Parses U2_* environment variables into typed config with validation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 u2-mcp contributors

//! Environment-based configuration management for production deployment

use crate::constants::{defaults, ports, scopes, ttl};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::{info, warn};

/// Strongly typed log level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Convert to `tracing::Level`
    #[must_use]
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }

    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "error" => LogLevel::Error,
            "warn" => LogLevel::Warn,
            "debug" => LogLevel::Debug,
            "trace" => LogLevel::Trace,
            _ => LogLevel::Info,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

/// Environment type for security and other configurations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum Environment {
    #[default]
    Development,
    Production,
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "testing" | "test" => Environment::Testing,
            _ => Environment::Development,
        }
    }

    /// Check if this is a production environment
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
            Environment::Testing => write!(f, "testing"),
        }
    }
}

/// Which external identity provider handles user login
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum IdpProvider {
    #[default]
    Oidc,
    Duo,
    Auth0,
}

impl IdpProvider {
    /// Parse from the `U2_IDP_PROVIDER` value
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "oidc" | "generic" => Ok(IdpProvider::Oidc),
            "duo" => Ok(IdpProvider::Duo),
            "auth0" => Ok(IdpProvider::Auth0),
            other => bail!("Unknown identity provider '{other}' (expected oidc, duo, or auth0)"),
        }
    }
}

impl std::fmt::Display for IdpProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdpProvider::Oidc => write!(f, "oidc"),
            IdpProvider::Duo => write!(f, "duo"),
            IdpProvider::Auth0 => write!(f, "auth0"),
        }
    }
}

/// Top-level server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listener settings
    pub http: HttpConfig,
    /// U2 (UniVerse/UniData) connection settings
    pub u2: U2Config,
    /// OAuth authorization-server settings
    pub auth: AuthConfig,
    /// External identity provider settings
    pub idp: IdpConfig,
    /// Log level
    pub log_level: LogLevel,
    /// Deployment environment
    pub environment: Environment,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Allowed CORS origins (`*` for any)
    pub cors_origins: Vec<String>,
}

/// UniVerse/UniData connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct U2Config {
    /// U2 server hostname
    pub host: String,
    /// U2 account login user
    pub user: String,
    /// U2 account login password
    #[serde(skip_serializing)]
    pub password: String,
    /// U2 account path or name
    pub account: String,
    /// Service name: `uvcs` (UniVerse) or `udcs` (UniData)
    pub service: String,
    /// unirpcd port
    pub port: u16,
    /// Use SSL for the U2 connection
    pub ssl: bool,
    /// Connection timeout in seconds
    pub timeout_secs: u64,
    /// Reject all data-modifying commands
    pub read_only: bool,
    /// Cap on SELECT list sizes returned by tools
    pub max_records: usize,
    /// TCL commands refused regardless of scope
    pub blocked_commands: Vec<String>,
}

/// OAuth authorization-server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Whether the OAuth surface is enabled at all
    pub enabled: bool,
    /// Public base URL of this server, used as the OAuth issuer and to
    /// derive the IdP callback URI
    pub issuer_url: String,
    /// Access token lifetime in seconds
    pub token_expiry_secs: i64,
    /// Refresh token lifetime in seconds
    pub refresh_token_expiry_secs: i64,
}

/// External identity provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdpConfig {
    /// Which provider adapter to use
    pub provider: IdpProvider,
    /// OIDC discovery document URL (derived for Duo when absent)
    pub discovery_url: Option<String>,
    /// Client ID registered with the provider
    pub client_id: String,
    /// Client secret registered with the provider
    #[serde(skip_serializing)]
    pub client_secret: String,
    /// Scopes requested on the provider leg
    pub scopes: String,
    /// Duo API hostname, e.g. `api-xxxx.duosecurity.com`
    pub duo_api_host: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        if let Err(e) = dotenvy::dotenv() {
            warn!("No .env file found or failed to load: {}", e);
        }

        let auth_enabled: bool = env_var_or("U2_AUTH_ENABLED", "true")?
            .parse()
            .context("Invalid U2_AUTH_ENABLED value")?;

        let config = ServerConfig {
            http: HttpConfig {
                host: env_var_or("U2_HTTP_HOST", "127.0.0.1")?,
                port: env_var_or("U2_HTTP_PORT", &ports::DEFAULT_HTTP_PORT.to_string())?
                    .parse()
                    .context("Invalid U2_HTTP_PORT value")?,
                cors_origins: parse_list(&env_var_or("U2_CORS_ORIGINS", "*")?),
            },

            u2: U2Config {
                host: required_var("U2_HOST")?,
                user: required_var("U2_USER")?,
                password: required_var("U2_PASSWORD")?,
                account: required_var("U2_ACCOUNT")?,
                service: env_var_or("U2_SERVICE", defaults::SERVICE_UNIVERSE)?,
                port: env_var_or("U2_PORT", &ports::DEFAULT_U2_PORT.to_string())?
                    .parse()
                    .context("Invalid U2_PORT value")?,
                ssl: env_var_or("U2_SSL", "false")?
                    .parse()
                    .context("Invalid U2_SSL value")?,
                timeout_secs: env_var_or(
                    "U2_TIMEOUT",
                    &defaults::CONNECT_TIMEOUT_SECS.to_string(),
                )?
                .parse()
                .context("Invalid U2_TIMEOUT value")?,
                read_only: env_var_or("U2_READ_ONLY", "false")?
                    .parse()
                    .context("Invalid U2_READ_ONLY value")?,
                max_records: env_var_or("U2_MAX_RECORDS", &defaults::MAX_RECORDS.to_string())?
                    .parse()
                    .context("Invalid U2_MAX_RECORDS value")?,
                blocked_commands: parse_list(&env_var_or(
                    "U2_BLOCKED_COMMANDS",
                    &defaults::BLOCKED_COMMANDS.join(","),
                )?),
            },

            auth: AuthConfig {
                enabled: auth_enabled,
                issuer_url: env_var_or("U2_ISSUER_URL", "")?,
                token_expiry_secs: env_var_or(
                    "U2_TOKEN_EXPIRY",
                    &ttl::ACCESS_TOKEN_TTL_SECS.to_string(),
                )?
                .parse()
                .context("Invalid U2_TOKEN_EXPIRY value")?,
                refresh_token_expiry_secs: env_var_or(
                    "U2_REFRESH_TOKEN_EXPIRY",
                    &ttl::REFRESH_TOKEN_TTL_SECS.to_string(),
                )?
                .parse()
                .context("Invalid U2_REFRESH_TOKEN_EXPIRY value")?,
            },

            idp: IdpConfig {
                provider: IdpProvider::parse(&env_var_or("U2_IDP_PROVIDER", "oidc")?)?,
                discovery_url: env::var("U2_IDP_DISCOVERY_URL").ok(),
                client_id: env_var_or("U2_IDP_CLIENT_ID", "")?,
                client_secret: env_var_or("U2_IDP_CLIENT_SECRET", "")?,
                scopes: env_var_or("U2_IDP_SCOPES", scopes::DEFAULT_IDP_SCOPES)?,
                duo_api_host: env::var("U2_DUO_API_HOST").ok(),
            },

            log_level: LogLevel::from_str_or_default(&env_var_or("U2_LOG_LEVEL", "info")?),
            environment: Environment::from_str_or_default(&env_var_or(
                "U2_ENVIRONMENT",
                "development",
            )?),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.u2.service != defaults::SERVICE_UNIVERSE
            && self.u2.service != defaults::SERVICE_UNIDATA
        {
            bail!(
                "U2_SERVICE must be '{}' or '{}', got '{}'",
                defaults::SERVICE_UNIVERSE,
                defaults::SERVICE_UNIDATA,
                self.u2.service
            );
        }

        if self.auth.enabled {
            if self.auth.issuer_url.is_empty() {
                bail!("U2_ISSUER_URL is required when authentication is enabled");
            }
            if self.idp.client_id.is_empty() {
                bail!("U2_IDP_CLIENT_ID is required when authentication is enabled");
            }
            match self.idp.provider {
                IdpProvider::Duo => {
                    if self.idp.discovery_url.is_none() && self.idp.duo_api_host.is_none() {
                        bail!(
                            "Duo requires U2_DUO_API_HOST or an explicit U2_IDP_DISCOVERY_URL"
                        );
                    }
                }
                IdpProvider::Oidc | IdpProvider::Auth0 => {
                    if self.idp.discovery_url.is_none() {
                        bail!("U2_IDP_DISCOVERY_URL is required for the {} provider", self.idp.provider);
                    }
                }
            }
        }

        Ok(())
    }

    /// One-line startup summary that never includes secrets
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "http={}:{} u2={}@{}:{}/{} service={} auth={} idp={} env={}",
            self.http.host,
            self.http.port,
            self.u2.user,
            self.u2.host,
            self.u2.port,
            self.u2.account,
            self.u2.service,
            if self.auth.enabled { "on" } else { "off" },
            self.idp.provider,
            self.environment,
        )
    }
}

fn required_var(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("Missing required environment variable {key}"))
}

fn env_var_or(key: &str, default: &str) -> Result<String> {
    Ok(env::var(key).unwrap_or_else(|_| default.to_string()))
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
