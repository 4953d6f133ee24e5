//! OAuth 2.1 authorization-code + PKCE server used to admit bearer
//! principals onto the MCP transport.

pub mod error;
pub mod pkce;
pub mod server;
pub mod store;
pub mod types;

pub use error::OAuthError;
pub use server::{AuthorizeRedirect, AuthorizeRequest, OAuthServer, TokenRequest};
pub use types::{AuthorizationCode, Session, TokenResponse};
