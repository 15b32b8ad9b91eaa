// ABOUTME: Application constants for protocol defaults, TTLs, and scope vocabulary
// ABOUTME: Centralizes tunable values shared across the OAuth bridge and tool surface
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 u2-mcp contributors

//! Application-wide constants

/// Default network ports
pub mod ports {
    /// Default HTTP port for the MCP/OAuth surface
    pub const DEFAULT_HTTP_PORT: u16 = 8080;

    /// Default UniVerse/UniData server port (unirpcd)
    pub const DEFAULT_U2_PORT: u16 = 31438;
}

/// Lifetimes for transient protocol state and issued credentials
pub mod ttl {
    /// Authorization sessions live this long between `/authorize` and the
    /// identity provider's callback
    pub const SESSION_TTL_SECS: i64 = 600;

    /// Authorization codes are redeemable for this long after the callback
    pub const AUTH_CODE_TTL_SECS: i64 = 600;

    /// Default access token lifetime
    pub const ACCESS_TOKEN_TTL_SECS: i64 = 3600;

    /// Default refresh token lifetime (30 days)
    pub const REFRESH_TOKEN_TTL_SECS: i64 = 30 * 24 * 3600;

    /// Interval for the background expiry sweep
    pub const SWEEP_INTERVAL_SECS: u64 = 60;
}

/// Scope vocabulary and the local/IdP scope mapping.
///
/// The scopes this server grants (`u2:read`, `u2:write`) are deliberately
/// decoupled from the scopes requested from the external identity provider:
/// the IdP leg always uses the configured `U2_IDP_SCOPES` set, and provider
/// scopes are never reflected back into local grants.
pub mod scopes {
    /// Read access to U2 data and dictionaries
    pub const READ: &str = "u2:read";

    /// Write access (commands that modify records)
    pub const WRITE: &str = "u2:write";

    /// All scopes this authorization server can grant
    pub const SUPPORTED: &[&str] = &[READ, WRITE];

    /// Granted when a client registers or authorizes without naming scopes
    pub const DEFAULT_GRANT: &str = READ;

    /// Scopes requested from the external identity provider when the
    /// deployment does not configure `U2_IDP_SCOPES`
    pub const DEFAULT_IDP_SCOPES: &str = "openid profile email";

    /// Check whether a scope belongs to the local vocabulary
    #[must_use]
    pub fn is_supported(scope: &str) -> bool {
        SUPPORTED.contains(&scope)
    }
}

/// OAuth protocol limits (RFC 7636 and token entropy requirements)
pub mod oauth {
    /// Random bytes backing generated codes, states, and tokens (256 bits)
    pub const TOKEN_LENGTH_BYTES: usize = 32;

    /// Minimum length of a PKCE challenge or verifier
    pub const PKCE_MIN_LEN: usize = 43;

    /// Maximum length of a PKCE challenge or verifier
    pub const PKCE_MAX_LEN: usize = 128;

    /// The only supported PKCE challenge method
    pub const PKCE_METHOD_S256: &str = "S256";
}

/// Connection and safety defaults mirroring the U2 deployment surface
pub mod defaults {
    /// UniVerse service name
    pub const SERVICE_UNIVERSE: &str = "uvcs";

    /// UniData service name
    pub const SERVICE_UNIDATA: &str = "udcs";

    /// Connection timeout in seconds
    pub const CONNECT_TIMEOUT_SECS: u64 = 30;

    /// Outbound identity-provider request timeout in seconds
    pub const IDP_TIMEOUT_SECS: u64 = 10;

    /// Maximum SELECT results returned by query tools
    pub const MAX_RECORDS: usize = 10_000;

    /// TCL commands blocked by default regardless of scope
    pub const BLOCKED_COMMANDS: &[&str] =
        &["DELETE.FILE", "CLEAR.FILE", "CNAME", "CREATE.FILE"];
}
