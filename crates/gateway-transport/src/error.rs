//! Transport-layer error taxonomy: each variant maps to one HTTP status
//! and one JSON-RPC error code.

use crate::jsonrpc::codes;

/// Errors raised while admitting or parsing a `/mcp` request, before any
/// tool handler runs.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// No credential presented, or a presented API key didn't match.
    #[error("Unauthorized - valid API key or OAuth token required")]
    Unauthorized,
    /// `Origin` header present but not on the allow-list.
    #[error("invalid origin")]
    InvalidOrigin,
    /// Declared or cumulative body size exceeded the configured maximum.
    #[error("payload too large")]
    PayloadTooLarge,
    /// Body read exceeded `MCP_POST_BODY_TIMEOUT_MS`.
    #[error("request timed out")]
    RequestTimeout,
    /// Body bytes didn't parse as JSON.
    #[error("malformed json")]
    MalformedJson,
    /// Client disconnected mid-read.
    #[error("request aborted")]
    RequestAborted,
    /// `replayEventsAfter` couldn't find `Last-Event-ID` in the store.
    #[error("unknown event id")]
    UnknownEventId,
    /// A JSON-RPC method was invoked outside the session state that
    /// allows it (e.g. anything but `initialize` in `Uninitialized`).
    #[error("session not initialized")]
    SessionNotInitialized,
    /// Unhandled internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TransportError {
    /// HTTP status code this error maps to.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::Unauthorized => 401,
            Self::InvalidOrigin => 403,
            Self::PayloadTooLarge => 413,
            Self::RequestTimeout => 408,
            Self::MalformedJson | Self::RequestAborted | Self::SessionNotInitialized | Self::UnknownEventId => 400,
            Self::Internal(_) => 500,
        }
    }

    /// JSON-RPC `error.code` this error maps to.
    #[must_use]
    pub fn rpc_code(&self) -> i64 {
        match self {
            Self::Unauthorized => codes::UNAUTHORIZED,
            Self::InvalidOrigin | Self::RequestAborted | Self::SessionNotInitialized | Self::UnknownEventId => {
                codes::INVALID_REQUEST
            }
            Self::PayloadTooLarge => codes::PAYLOAD_TOO_LARGE,
            Self::RequestTimeout => codes::BODY_TIMEOUT,
            Self::MalformedJson => codes::PARSE_ERROR,
            Self::Internal(_) => codes::INTERNAL,
        }
    }
}
