//! OAuth error taxonomy, matching RFC 6749 §5.2 error codes where this
//! gateway's callers (the token endpoint handler) need to echo one.

/// Errors raised while authorizing, redeeming, or validating OAuth state.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum OAuthError {
    /// `response_type`, `client_id`, `redirect_uri`, or PKCE parameters are
    /// missing or invalid on the authorize request.
    #[error("invalid_request: {0}")]
    InvalidRequest(String),

    /// `client_id` doesn't match the registered client.
    #[error("unauthorized_client")]
    UnauthorizedClient,

    /// Requested scope isn't a subset of the supported scopes.
    #[error("invalid_scope")]
    InvalidScope,

    /// Authorization code or refresh token is absent, expired, used, or
    /// otherwise doesn't redeem — the single code RFC 6749 mandates for
    /// all of these cases.
    #[error("invalid_grant")]
    InvalidGrant,

    /// Confidential client authentication failed (bad or missing secret).
    #[error("invalid_client")]
    InvalidClient,

    /// `grant_type` isn't one this server supports.
    #[error("unsupported_grant_type")]
    UnsupportedGrantType,
}

impl OAuthError {
    /// The `error` field value for a token-endpoint or redirect response.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::InvalidScope => "invalid_scope",
            Self::InvalidGrant => "invalid_grant",
            Self::InvalidClient => "invalid_client",
            Self::UnsupportedGrantType => "unsupported_grant_type",
        }
    }
}
