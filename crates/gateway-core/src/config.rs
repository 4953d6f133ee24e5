//! Typed configuration, assembled once at startup from the environment.
//!
//! Every recognized environment variable this gateway reads lives
//! here with its documented default. Components receive the slice of
//! `Config` they need through their constructor rather than reading
//! `std::env` directly, so tests can exercise any combination of
//! settings without mutating process environment.

use std::env;
use std::time::Duration;

/// The MCP protocol version this gateway advertises and speaks upstream.
pub const PROTOCOL_VERSION: &str = "2025-11-25";

/// Gateway-wide configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the upstream patterns API.
    pub upstream_api_url: String,
    /// Optional credential forwarded to the upstream API and also
    /// accepted (constant-time matched) as an ingress API key.
    pub pattern_api_key: Option<String>,
    /// Port this gateway listens on.
    pub port: u16,
    /// External URL advertised in OAuth discovery metadata.
    pub public_url: String,
    /// Whether the process environment is `production` (extends the
    /// origin allow-list with `public_url`'s host).
    pub production: bool,
    /// OAuth 2.1 authorization server configuration.
    pub oauth: OAuthConfig,
    /// Event store sizing.
    pub event_store: EventStoreConfig,
    /// Diagnostic hook: force-close GET /mcp SSE streams after this many
    /// milliseconds. Zero disables the hook.
    pub sse_drop_after: Duration,
    /// Raises the default tracing filter to `debug` when set and
    /// `RUST_LOG` is absent.
    pub debug: bool,
}

/// OAuth 2.1 authorization server configuration.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// The one pre-registered client this gateway trusts.
    pub client_id: String,
    /// Optional client secret, required when `token_auth_method` isn't `none`.
    pub client_secret: Option<String>,
    /// How the token endpoint authenticates confidential clients.
    pub token_auth_method: TokenAuthMethod,
    /// Maximum live sessions (access/refresh token pairs) retained.
    pub max_sessions: usize,
    /// Maximum live (unexpired, unused) authorization codes retained.
    pub max_auth_codes: usize,
    /// Interval between sweeps of expired sessions/codes.
    pub cleanup_interval: Duration,
    /// Scopes this server will grant.
    pub supported_scopes: Vec<String>,
    /// Require an explicit consent step instead of auto-approving
    /// pre-registered clients on `/auth`. Off by default.
    pub require_consent: bool,
}

/// Client authentication methods for the token endpoint (RFC 6749 §2.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenAuthMethod {
    /// Public client: no secret required.
    None,
    /// Secret presented via HTTP Basic auth.
    ClientSecretBasic,
    /// Secret presented as a body parameter.
    ClientSecretPost,
}

impl TokenAuthMethod {
    fn parse(raw: &str) -> Self {
        match raw {
            "client_secret_basic" => Self::ClientSecretBasic,
            "client_secret_post" => Self::ClientSecretPost,
            _ => Self::None,
        }
    }
}

/// Event store sizing knobs.
#[derive(Debug, Clone, Copy)]
pub struct EventStoreConfig {
    /// Maximum retained events across all streams.
    pub max_events: usize,
    /// Maximum age of a retained event.
    pub ttl: Duration,
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes"))
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from the process environment, applying the
    /// defaults documented above.
    ///
    /// # Errors
    ///
    /// Returns an error if `PORT` is present but not a valid `u16`.
    pub fn from_env() -> anyhow::Result<Self> {
        let port: u16 = match env::var("PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid port number, got {raw:?}"))?,
            Err(_) => 3001,
        };

        let public_url = env::var("MCP_SERVER_PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://localhost:{port}"));

        let production = env::var("NODE_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .map(|v| v == "production")
            .unwrap_or(false);

        let oauth = OAuthConfig {
            client_id: env_string("MCP_OAUTH_CLIENT_ID", "effect-patterns-mcp"),
            client_secret: env::var("MCP_OAUTH_CLIENT_SECRET").ok(),
            token_auth_method: TokenAuthMethod::parse(&env_string(
                "MCP_OAUTH_TOKEN_AUTH_METHOD",
                "none",
            )),
            max_sessions: env_usize("MCP_OAUTH_MAX_SESSIONS", 5000),
            max_auth_codes: env_usize("MCP_OAUTH_MAX_AUTH_CODES", 5000),
            cleanup_interval: Duration::from_millis(env_u64(
                "MCP_OAUTH_CLEANUP_INTERVAL_MS",
                60_000,
            )),
            supported_scopes: vec!["mcp:access".to_string(), "patterns:read".to_string()],
            require_consent: env_bool("MCP_OAUTH_REQUIRE_CONSENT", false),
        };

        let event_store = EventStoreConfig {
            max_events: env_usize("MCP_EVENT_STORE_MAX_EVENTS", 2000),
            ttl: Duration::from_millis(env_u64("MCP_EVENT_STORE_TTL_MS", 900_000)),
        };

        Ok(Self {
            upstream_api_url: env_string(
                "EFFECT_PATTERNS_API_URL",
                "https://effect-patterns-mcp.vercel.app",
            ),
            pattern_api_key: env::var("PATTERN_API_KEY").ok(),
            port,
            public_url,
            production,
            oauth,
            event_store,
            sse_drop_after: Duration::from_millis(env_u64("MCP_SSE_DROP_AFTER_MS", 0)),
            debug: env_bool("MCP_DEBUG", false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_auth_method_parses_known_values() {
        assert_eq!(TokenAuthMethod::parse("none"), TokenAuthMethod::None);
        assert_eq!(
            TokenAuthMethod::parse("client_secret_basic"),
            TokenAuthMethod::ClientSecretBasic
        );
        assert_eq!(
            TokenAuthMethod::parse("client_secret_post"),
            TokenAuthMethod::ClientSecretPost
        );
        assert_eq!(TokenAuthMethod::parse("garbage"), TokenAuthMethod::None);
    }
}
