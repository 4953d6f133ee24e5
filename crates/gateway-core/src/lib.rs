//! Foundation types for the MCP gateway: bounded cache, event store,
//! configuration, and the base error taxonomy every other crate builds
//! on.

pub mod cache;
pub mod config;
pub mod error;
pub mod event_store;
pub mod time;
pub mod urlencode;

pub use cache::BoundedCache;
pub use config::{Config, OAuthConfig, TokenAuthMethod, PROTOCOL_VERSION};
pub use error::{CoreError, CoreResult};
pub use event_store::{EventStore, StoredEvent};
pub use urlencode::urlencode;
