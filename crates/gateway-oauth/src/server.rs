//! The OAuth 2.1 authorization server: `/auth`, `/token`, bearer
//! validation, and discovery metadata.
//!
//! This type is pure domain logic — it knows nothing about `axum` or
//! HTTP status codes. The transport/router layer translates its outcomes
//! into redirects, JSON bodies, and status codes.

use std::time::Duration;

use gateway_core::time::now_ms;
use gateway_core::{urlencode, OAuthConfig};
use subtle::ConstantTimeEq;

use crate::error::OAuthError;
use crate::pkce::{random_token, verify_s256};
use crate::store::{AuthCodeStore, SessionStore};
use crate::types::{
    AuthorizationCode, Session, TokenResponse, ACCESS_TOKEN_LIFETIME_SECS, AUTH_CODE_LIFETIME_SECS,
    REFRESH_TOKEN_LIFETIME_SECS,
};

/// Query parameters for `GET /auth`.
#[derive(Debug, Clone)]
pub struct AuthorizeRequest {
    /// Must be `"code"`; anything else is `unsupported_response_type`
    /// folded into `invalid_request` per this server's closed grant set.
    pub response_type: String,
    /// Client identifier; must match the one registered client.
    pub client_id: String,
    /// Redirect target; must exactly match the registered URI.
    pub redirect_uri: String,
    /// PKCE challenge (base64url SHA-256 of the verifier).
    pub code_challenge: String,
    /// Must be `"S256"`.
    pub code_challenge_method: String,
    /// Space-delimited requested scopes; defaults to all supported scopes.
    pub scope: Option<String>,
    /// Opaque value echoed back verbatim to guard against CSRF.
    pub state: Option<String>,
}

/// Outcome of an authorization request: always a redirect, success or
/// failure alike, per RFC 6749 §4.1.2 / §4.1.2.1.
#[derive(Debug, Clone)]
pub struct AuthorizeRedirect {
    /// Fully qualified `Location` header value.
    pub location: String,
    /// Whether this redirect carries an `error` parameter.
    pub is_error: bool,
}

/// Body parameters for `POST /token`, merged from the form body and
/// whatever client-authentication material the router extracted (Basic
/// header or body secret, depending on `token_auth_method`).
#[derive(Debug, Clone, Default)]
pub struct TokenRequest {
    /// `"authorization_code"` or `"refresh_token"`.
    pub grant_type: String,
    /// Authorization-code grant: the code to redeem.
    pub code: Option<String>,
    /// Authorization-code grant: must match the code's recorded URI.
    pub redirect_uri: Option<String>,
    /// Both grants: the requesting client.
    pub client_id: Option<String>,
    /// Authorization-code grant: the PKCE verifier.
    pub code_verifier: Option<String>,
    /// Refresh-token grant: the token to rotate.
    pub refresh_token: Option<String>,
    /// Confidential-client secret, from Basic auth or the body,
    /// depending on `token_auth_method`.
    pub client_secret: Option<String>,
}

/// The OAuth 2.1 authorization server.
pub struct OAuthServer {
    config: OAuthConfig,
    issuer: String,
    redirect_uris: Vec<String>,
    sessions: SessionStore,
    codes: AuthCodeStore,
}

impl OAuthServer {
    /// Build a server trusting exactly the client and redirect URIs given.
    ///
    /// This server trusts a single first-party client by default; multiple
    /// redirect URIs are supported (e.g. dev + prod callback) via exact
    /// match against this list.
    #[must_use]
    pub fn new(config: OAuthConfig, issuer: String, redirect_uris: Vec<String>) -> Self {
        let sessions = SessionStore::new(config.max_sessions);
        let codes = AuthCodeStore::new(config.max_auth_codes);
        Self {
            config,
            issuer,
            redirect_uris,
            sessions,
            codes,
        }
    }

    /// Handle `GET /auth`.
    pub fn authorize(&self, req: AuthorizeRequest) -> AuthorizeRedirect {
        match self.validate_authorize(&req) {
            Ok(()) => self.issue_code(&req),
            Err(err) => self.error_redirect(&req.redirect_uri, err, req.state.as_deref()),
        }
    }

    fn validate_authorize(&self, req: &AuthorizeRequest) -> Result<(), OAuthError> {
        if req.response_type != "code" {
            return Err(OAuthError::InvalidRequest("response_type must be code".into()));
        }
        if req.client_id != self.config.client_id {
            return Err(OAuthError::UnauthorizedClient);
        }
        if !self.redirect_uris.iter().any(|uri| uri == &req.redirect_uri) {
            return Err(OAuthError::InvalidRequest("redirect_uri not registered".into()));
        }
        if req.code_challenge.is_empty() || req.code_challenge_method != "S256" {
            return Err(OAuthError::InvalidRequest("PKCE S256 challenge required".into()));
        }

        let requested = requested_scopes(req.scope.as_deref(), &self.config.supported_scopes);
        if requested
            .iter()
            .any(|s| !self.config.supported_scopes.iter().any(|sup| sup == s))
        {
            return Err(OAuthError::InvalidScope);
        }

        Ok(())
    }

    fn issue_code(&self, req: &AuthorizeRequest) -> AuthorizeRedirect {
        let now = now_ms();
        let scopes = requested_scopes(req.scope.as_deref(), &self.config.supported_scopes);
        let code = random_token(32);

        self.codes.insert(AuthorizationCode {
            code: code.clone(),
            client_id: req.client_id.clone(),
            redirect_uri: req.redirect_uri.clone(),
            scopes,
            code_challenge: req.code_challenge.clone(),
            code_challenge_method: req.code_challenge_method.clone(),
            expires_at: now + AUTH_CODE_LIFETIME_SECS * 1000,
            used: false,
        });

        let mut location = format!("{}?code={}", req.redirect_uri, urlencode(&code));
        if let Some(state) = &req.state {
            location.push_str("&state=");
            location.push_str(&urlencode(state));
        }

        AuthorizeRedirect {
            location,
            is_error: false,
        }
    }

    fn error_redirect(&self, redirect_uri: &str, err: OAuthError, state: Option<&str>) -> AuthorizeRedirect {
        // A redirect_uri that never validated is still the best place to
        // send the client per RFC 6749 when one was supplied at all; an
        // empty/unregistered one falls back to the issuer itself so we
        // never redirect to an attacker-controlled host.
        let base = if self.redirect_uris.iter().any(|uri| uri == redirect_uri) {
            redirect_uri
        } else {
            self.issuer.as_str()
        };

        let mut location = format!("{base}?error={}&error_description=", err.code());
        location.push_str("&state=");
        if let Some(state) = state {
            location.push_str(&urlencode(state));
        }

        AuthorizeRedirect {
            location,
            is_error: true,
        }
    }

    /// Handle `POST /token`.
    pub fn token(&self, req: TokenRequest) -> Result<TokenResponse, OAuthError> {
        self.authenticate_client(req.client_id.as_deref(), req.client_secret.as_deref())?;

        match req.grant_type.as_str() {
            "authorization_code" => self.redeem_authorization_code(&req),
            "refresh_token" => self.redeem_refresh_token(&req),
            _ => Err(OAuthError::UnsupportedGrantType),
        }
    }

    fn authenticate_client(&self, client_id: Option<&str>, secret: Option<&str>) -> Result<(), OAuthError> {
        let client_id = client_id.ok_or_else(|| OAuthError::InvalidRequest("client_id required".into()))?;
        if client_id != self.config.client_id {
            return Err(OAuthError::InvalidClient);
        }

        if let Some(expected) = &self.config.client_secret {
            let presented = secret.ok_or(OAuthError::InvalidClient)?;
            let ok: bool = expected.as_bytes().ct_eq(presented.as_bytes()).into();
            if !ok {
                return Err(OAuthError::InvalidClient);
            }
        }

        Ok(())
    }

    fn redeem_authorization_code(&self, req: &TokenRequest) -> Result<TokenResponse, OAuthError> {
        let code_value = req.code.as_deref().ok_or_else(|| OAuthError::InvalidRequest("code required".into()))?;
        let redirect_uri = req
            .redirect_uri
            .as_deref()
            .ok_or_else(|| OAuthError::InvalidRequest("redirect_uri required".into()))?;
        let verifier = req
            .code_verifier
            .as_deref()
            .ok_or_else(|| OAuthError::InvalidRequest("code_verifier required".into()))?;

        let now = now_ms();
        let code = self.codes.get(code_value).ok_or(OAuthError::InvalidGrant)?;

        if !code.redeemable(now) {
            return Err(OAuthError::InvalidGrant);
        }
        if code.redirect_uri != redirect_uri {
            return Err(OAuthError::InvalidGrant);
        }
        if !verify_s256(verifier, &code.code_challenge) {
            return Err(OAuthError::InvalidGrant);
        }

        // Mark used before minting tokens: a concurrent redemption race
        // observes `used=true` and fails invalid_grant rather than both
        // winning, satisfying "redeems at most once" under the session
        // table's single mutex.
        self.codes.mark_used(code_value);

        let session = self.mint_session(code.client_id.clone(), code.scopes.clone(), now);
        let response = TokenResponse {
            access_token: session.access_token.clone(),
            token_type: "Bearer",
            expires_in: ACCESS_TOKEN_LIFETIME_SECS,
            refresh_token: Some(session.refresh_token.clone()),
            scope: Some(session.scope_string()),
        };
        self.sessions.insert(session);
        Ok(response)
    }

    fn redeem_refresh_token(&self, req: &TokenRequest) -> Result<TokenResponse, OAuthError> {
        let refresh_token = req
            .refresh_token
            .as_deref()
            .ok_or_else(|| OAuthError::InvalidRequest("refresh_token required".into()))?;

        let now = now_ms();
        // Look up, validate, and remove the old session in one locked
        // step so two concurrent redemptions of the same refresh token
        // can't both observe it as live before either removes it.
        let existing = self
            .sessions
            .take_valid_by_refresh_token(refresh_token, now)
            .ok_or(OAuthError::InvalidGrant)?;

        let session = self.mint_session(existing.client_id, existing.scopes, now);
        let response = TokenResponse {
            access_token: session.access_token.clone(),
            token_type: "Bearer",
            expires_in: ACCESS_TOKEN_LIFETIME_SECS,
            refresh_token: Some(session.refresh_token.clone()),
            scope: Some(session.scope_string()),
        };
        self.sessions.insert(session);
        Ok(response)
    }

    fn mint_session(&self, client_id: String, scopes: Vec<String>, now: u64) -> Session {
        Session {
            client_id,
            scopes,
            access_token: random_token(32),
            refresh_token: random_token(32),
            access_expires_at: now + ACCESS_TOKEN_LIFETIME_SECS * 1000,
            refresh_expires_at: now + REFRESH_TOKEN_LIFETIME_SECS * 1000,
            created_at: now,
        }
    }

    /// Validate a bearer token extracted from an `Authorization` header,
    /// returning the live session iff the access token hasn't expired.
    #[must_use]
    pub fn validate_bearer_token(&self, token: &str) -> Option<Session> {
        let session = self.sessions.get_by_access_token(token)?;
        if session.access_token_valid(now_ms()) {
            Some(session)
        } else {
            None
        }
    }

    /// RFC 8414 discovery document for `/.well-known/oauth-authorization-server`.
    #[must_use]
    pub fn discovery_metadata(&self, authorize_url: &str, token_url: &str) -> serde_json::Value {
        serde_json::json!({
            "issuer": self.issuer,
            "authorization_endpoint": authorize_url,
            "token_endpoint": token_url,
            "grant_types_supported": ["authorization_code", "refresh_token"],
            "code_challenge_methods_supported": ["S256"],
            "require_pkce": true,
            "scopes_supported": self.config.supported_scopes,
            "token_endpoint_auth_methods_supported": [self.token_auth_method_str()],
            "response_types_supported": ["code"],
        })
    }

    fn token_auth_method_str(&self) -> &'static str {
        match self.config.token_auth_method {
            gateway_core::TokenAuthMethod::None => "none",
            gateway_core::TokenAuthMethod::ClientSecretBasic => "client_secret_basic",
            gateway_core::TokenAuthMethod::ClientSecretPost => "client_secret_post",
        }
    }

    /// Drop every expired session and authorization code. Intended to be
    /// called from a periodic background task at `config.cleanup_interval`.
    pub fn sweep_expired(&self) {
        let now = now_ms();
        self.sessions.sweep_expired(now);
        self.codes.sweep_expired(now);
        tracing::debug!(
            sessions = self.sessions.len(),
            codes = self.codes.len(),
            "oauth cleanup sweep complete"
        );
    }

    /// The configured sweep interval, for the caller to build a
    /// `tokio::time::interval` around.
    #[must_use]
    pub fn cleanup_interval(&self) -> Duration {
        self.config.cleanup_interval
    }
}

fn requested_scopes(scope: Option<&str>, supported: &[String]) -> Vec<String> {
    match scope {
        Some(s) if !s.trim().is_empty() => s.split_whitespace().map(str::to_string).collect(),
        _ => supported.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine as _;
    use sha2::{Digest, Sha256};

    fn test_server() -> OAuthServer {
        let config = OAuthConfig {
            client_id: "effect-patterns-mcp".into(),
            client_secret: None,
            token_auth_method: gateway_core::TokenAuthMethod::None,
            max_sessions: 10,
            max_auth_codes: 10,
            cleanup_interval: Duration::from_secs(60),
            supported_scopes: vec!["mcp:access".into(), "patterns:read".into()],
            require_consent: false,
        };
        OAuthServer::new(
            config,
            "http://localhost:3001".into(),
            vec!["http://localhost:3000/callback".into()],
        )
    }

    fn challenge_for(verifier: &str) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
    }

    #[test]
    fn full_pkce_round_trip_preserves_client_and_scopes() {
        let server = test_server();
        let challenge = challenge_for("verifier123");

        let redirect = server.authorize(AuthorizeRequest {
            response_type: "code".into(),
            client_id: "effect-patterns-mcp".into(),
            redirect_uri: "http://localhost:3000/callback".into(),
            code_challenge: challenge,
            code_challenge_method: "S256".into(),
            scope: None,
            state: Some("xyz".into()),
        });
        assert!(!redirect.is_error);
        assert!(redirect.location.contains("state=xyz"));

        let code = redirect
            .location
            .split("code=")
            .nth(1)
            .unwrap()
            .split('&')
            .next()
            .unwrap()
            .to_string();

        let token = server
            .token(TokenRequest {
                grant_type: "authorization_code".into(),
                code: Some(code.clone()),
                redirect_uri: Some("http://localhost:3000/callback".into()),
                client_id: Some("effect-patterns-mcp".into()),
                code_verifier: Some("verifier123".into()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(token.expires_in, ACCESS_TOKEN_LIFETIME_SECS);
        assert!(token.refresh_token.is_some());

        // Code redeems at most once.
        let replay = server.token(TokenRequest {
            grant_type: "authorization_code".into(),
            code: Some(code),
            redirect_uri: Some("http://localhost:3000/callback".into()),
            client_id: Some("effect-patterns-mcp".into()),
            code_verifier: Some("verifier123".into()),
            ..Default::default()
        });
        assert_eq!(replay.unwrap_err(), OAuthError::InvalidGrant);

        // Refresh rotates while preserving client/scopes.
        let refreshed = server
            .token(TokenRequest {
                grant_type: "refresh_token".into(),
                refresh_token: token.refresh_token.clone(),
                client_id: Some("effect-patterns-mcp".into()),
                ..Default::default()
            })
            .unwrap();
        assert_ne!(refreshed.access_token, token.access_token);
        assert_eq!(refreshed.scope, token.scope);

        let validated = server.validate_bearer_token(&refreshed.access_token);
        assert!(validated.is_some());
        assert_eq!(validated.unwrap().client_id, "effect-patterns-mcp");
    }

    #[test]
    fn pkce_mismatch_fails_with_invalid_grant() {
        let server = test_server();
        let challenge = challenge_for("verifier123");
        let redirect = server.authorize(AuthorizeRequest {
            response_type: "code".into(),
            client_id: "effect-patterns-mcp".into(),
            redirect_uri: "http://localhost:3000/callback".into(),
            code_challenge: challenge,
            code_challenge_method: "S256".into(),
            scope: None,
            state: None,
        });
        let code = redirect
            .location
            .split("code=")
            .nth(1)
            .unwrap()
            .split('&')
            .next()
            .unwrap()
            .to_string();

        let result = server.token(TokenRequest {
            grant_type: "authorization_code".into(),
            code: Some(code),
            redirect_uri: Some("http://localhost:3000/callback".into()),
            client_id: Some("effect-patterns-mcp".into()),
            code_verifier: Some("wrong".into()),
            ..Default::default()
        });

        assert_eq!(result.unwrap_err(), OAuthError::InvalidGrant);
    }

    #[test]
    fn unregistered_redirect_uri_is_rejected() {
        let server = test_server();
        let redirect = server.authorize(AuthorizeRequest {
            response_type: "code".into(),
            client_id: "effect-patterns-mcp".into(),
            redirect_uri: "http://evil.example.com/callback".into(),
            code_challenge: "x".into(),
            code_challenge_method: "S256".into(),
            scope: None,
            state: None,
        });
        assert!(redirect.is_error);
        assert!(redirect.location.starts_with("http://localhost:3001"));
    }

    #[test]
    fn expired_access_token_fails_validation() {
        let server = test_server();
        let now = now_ms();
        server.sessions.insert(Session {
            client_id: "effect-patterns-mcp".into(),
            scopes: vec!["mcp:access".into()],
            access_token: "expired-token".into(),
            refresh_token: "rt".into(),
            access_expires_at: now.saturating_sub(1),
            refresh_expires_at: now + 1_000_000,
            created_at: now.saturating_sub(2),
        });
        assert!(server.validate_bearer_token("expired-token").is_none());
    }
}
