//! Dual-auth admission policy for `/mcp`: API key OR OAuth bearer.

use std::sync::Arc;

use gateway_oauth::OAuthServer;
use subtle::ConstantTimeEq;

use crate::error::TransportError;

/// The principal admitted onto `/mcp`, carried through the rest of the
/// request so handlers can log/attribute without re-deriving it.
#[derive(Debug, Clone)]
pub enum Principal {
    /// Admitted by a matching `x-api-key` / `?key=`.
    ApiKey,
    /// Admitted by a valid OAuth bearer token.
    OAuth {
        /// Client the bearer token was issued to.
        client_id: String,
        /// Scopes granted to that client.
        scopes: Vec<String>,
    },
}

/// Evaluate the dual-auth admission policy: API key first, bearer token second.
///
/// `presented_key` is read from `x-api-key` or the `key`/`api_key` query
/// parameter by the caller before this is invoked. `bearer` is the raw
/// value of an `Authorization: Bearer <token>` header, if present.
pub fn admit(
    presented_key: Option<&str>,
    configured_key: Option<&str>,
    bearer: Option<&str>,
    oauth: &Arc<OAuthServer>,
) -> Result<Principal, TransportError> {
    if let Some(configured) = configured_key {
        match presented_key {
            Some(presented) if constant_time_eq(presented, configured) => {
                return Ok(Principal::ApiKey);
            }
            Some(_) => return Err(TransportError::Unauthorized),
            None => {}
        }
    }

    if let Some(token) = bearer {
        if let Some(session) = oauth.validate_bearer_token(token) {
            return Ok(Principal::OAuth {
                client_id: session.client_id,
                scopes: session.scopes,
            });
        }
    }

    Err(TransportError::Unauthorized)
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.len() == b.len() && bool::from(a.as_bytes().ct_eq(b.as_bytes()))
}
