//! OAuth data model: sessions and authorization codes.

/// A live access/refresh token pair, unique by `access_token` and also
/// indexed by `refresh_token` for the refresh grant.
#[derive(Debug, Clone)]
pub struct Session {
    /// Client this session was issued to.
    pub client_id: String,
    /// Scopes granted at issuance, preserved across refresh.
    pub scopes: Vec<String>,
    /// Bearer token presented on `/mcp` requests.
    pub access_token: String,
    /// Token presented to the `refresh_token` grant.
    pub refresh_token: String,
    /// Epoch-ms expiry of `access_token`.
    pub access_expires_at: u64,
    /// Epoch-ms expiry of `refresh_token`.
    pub refresh_expires_at: u64,
    /// Epoch-ms of issuance.
    pub created_at: u64,
}

impl Session {
    /// Whether the access token is still valid at `now`.
    #[must_use]
    pub fn access_token_valid(&self, now: u64) -> bool {
        self.access_expires_at > now
    }

    /// Whether the refresh token is still valid at `now`.
    #[must_use]
    pub fn refresh_token_valid(&self, now: u64) -> bool {
        self.refresh_expires_at > now
    }

    /// Space-joined scope string for the token response `scope` field.
    #[must_use]
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }
}

/// A single-use authorization code minted by `GET /auth` and redeemed by
/// `POST /token`.
#[derive(Debug, Clone)]
pub struct AuthorizationCode {
    /// The code value itself (opaque, URL-safe).
    pub code: String,
    /// Client this code was issued to.
    pub client_id: String,
    /// Redirect URI recorded at authorization time; must match exactly on
    /// redemption.
    pub redirect_uri: String,
    /// Scopes requested (and granted, since this server auto-approves).
    pub scopes: Vec<String>,
    /// PKCE `code_challenge` the verifier must hash to.
    pub code_challenge: String,
    /// Always `"S256"` — this server doesn't support the plain method.
    pub code_challenge_method: String,
    /// Epoch-ms expiry; at most 60s after minting.
    pub expires_at: u64,
    /// Set `true` on first redemption; a used code never redeems again.
    pub used: bool,
}

impl AuthorizationCode {
    /// Whether this code may still be redeemed at `now`.
    #[must_use]
    pub fn redeemable(&self, now: u64) -> bool {
        !self.used && self.expires_at > now
    }
}

/// Successful token-endpoint response body.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TokenResponse {
    /// Bearer token for `/mcp`.
    pub access_token: String,
    /// Always `"Bearer"`.
    pub token_type: &'static str,
    /// Seconds until `access_token` expires, from issuance.
    pub expires_in: u64,
    /// Token usable with the `refresh_token` grant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Space-joined granted scopes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Lifetime of a minted access token, in seconds.
pub const ACCESS_TOKEN_LIFETIME_SECS: u64 = 3600;
/// Lifetime of a minted refresh token, in seconds (30 days).
pub const REFRESH_TOKEN_LIFETIME_SECS: u64 = 30 * 24 * 3600;
/// Lifetime of a minted authorization code, in seconds. Kept short per
/// OAuth 2.1's recommendation that codes be single-use and short-lived.
pub const AUTH_CODE_LIFETIME_SECS: u64 = 60;
