//! Error taxonomy for the upstream API client.

use serde::{Deserialize, Serialize};

/// Result alias used throughout this crate and returned to tool handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Fine-grained network failure classification, driving upstream retry
/// policy. Mirrors the cause-sniffing the gateway this crate is modeled
/// on performs on its HTTP client's error chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// Request exceeded its deadline.
    Timeout,
    /// TCP connect was refused by the peer.
    ConnectionRefused,
    /// DNS resolution failed.
    DnsError,
    /// Peer reset an established connection.
    ConnectionReset,
    /// TLS handshake or certificate validation failed. Non-retryable.
    TlsError,
    /// Some other `reqwest`-level failure.
    FetchError,
    /// Catch-all for transport failures that don't fit the above.
    Network,
}

impl ErrorType {
    /// Whether a caller may reasonably retry a request that failed this way.
    #[must_use]
    pub fn retryable(self) -> bool {
        !matches!(self, Self::TlsError)
    }
}

/// Structured detail attached to a failed call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Name of the underlying error (e.g. the `reqwest::Error` display).
    pub error_name: String,
    /// Classified failure kind.
    pub error_type: ErrorType,
    /// Whether the caller may retry.
    pub retryable: bool,
    /// Optional human-readable cause, e.g. the OS error string.
    pub cause: Option<String>,
}

/// Error returned by [`crate::client::ApiClient::call`].
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
#[error("{error}")]
pub struct ApiError {
    /// Human-readable message; either the classified network error or the
    /// upstream response body/status line for non-2xx responses.
    pub error: String,
    /// HTTP status code, when the failure originated from a response
    /// rather than from the transport itself.
    pub status: Option<u16>,
    /// Network-failure classification, present only for transport errors.
    pub details: Option<ErrorDetails>,
}

impl ApiError {
    /// Build a timeout error (HTTP-408-shaped).
    #[must_use]
    pub fn timeout() -> Self {
        Self {
            error: "request timed out".to_string(),
            status: Some(408),
            details: Some(ErrorDetails {
                error_name: "TimeoutError".to_string(),
                error_type: ErrorType::Timeout,
                retryable: true,
                cause: None,
            }),
        }
    }

    /// Classify a `reqwest::Error` into the taxonomy above.
    #[must_use]
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::timeout();
        }

        let cause = err.source_chain_display();
        let error_type = classify_cause(&cause, err.is_connect());

        Self {
            error: err.to_string(),
            status: None,
            details: Some(ErrorDetails {
                error_name: "FetchError".to_string(),
                retryable: error_type.retryable(),
                error_type,
                cause: Some(cause),
            }),
        }
    }

    /// Build an error from a non-2xx upstream HTTP response.
    #[must_use]
    pub fn from_status(status: u16, body: String) -> Self {
        Self {
            error: if body.trim().is_empty() {
                format!("upstream returned HTTP {status}")
            } else {
                body
            },
            status: Some(status),
            details: None,
        }
    }
}

fn classify_cause(cause: &str, is_connect: bool) -> ErrorType {
    let upper = cause.to_uppercase();
    if upper.contains("ECONNREFUSED") || (is_connect && upper.contains("REFUSED")) {
        ErrorType::ConnectionRefused
    } else if upper.contains("ENOTFOUND") || upper.contains("DNS") {
        ErrorType::DnsError
    } else if upper.contains("ETIMEDOUT") || upper.contains("TIMEOUT") {
        ErrorType::Timeout
    } else if upper.contains("ECONNRESET") || upper.contains("RESET") {
        ErrorType::ConnectionReset
    } else if upper.contains("CERT") || upper.contains("SSL") || upper.contains("TLS") {
        ErrorType::TlsError
    } else if is_connect {
        ErrorType::ConnectionRefused
    } else {
        ErrorType::FetchError
    }
}

/// Helper extension to flatten a `reqwest::Error`'s `source()` chain into a
/// single string for substring classification against known OS/TLS error
/// markers (`ECONNREFUSED`, `ENOTFOUND`, `CERT`, ...).
trait SourceChainDisplay {
    fn source_chain_display(&self) -> String;
}

impl SourceChainDisplay for reqwest::Error {
    fn source_chain_display(&self) -> String {
        use std::error::Error as _;
        let mut out = self.to_string();
        let mut source = self.source();
        while let Some(err) = source {
            out.push_str(": ");
            out.push_str(&err.to_string());
            source = err.source();
        }
        out
    }
}
