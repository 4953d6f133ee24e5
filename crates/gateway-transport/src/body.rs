//! Streaming, size- and time-bounded request body reader.
//!
//! `axum` already buffers small bodies via extractors, but this gateway calls
//! for chunk-level enforcement (reject before the whole body is even
//! read) plus a hard wall-clock timeout independent of the declared
//! `Content-Length` — a malicious or broken client can omit it, or lie.

use std::time::Duration;

use axum::body::Body;
use futures::StreamExt;
use serde_json::Value;

use crate::error::TransportError;

/// Default cap on POST body size: 4 MiB.
pub const DEFAULT_MAX_BODY_BYTES: usize = 4 * 1024 * 1024;
/// Default cap on the wall-clock time allowed to fully read a body.
pub const DEFAULT_BODY_TIMEOUT: Duration = Duration::from_secs(30);

/// Read `body` under `max_bytes`/`timeout`, and parse it as JSON.
///
/// Returns `Ok(None)` for an empty or whitespace-only body (valid input,
/// distinguished from a parse failure) and the parsed
/// [`serde_json::Value`] otherwise.
pub async fn read_bounded_json(
    body: Body,
    declared_content_length: Option<usize>,
    max_bytes: usize,
    timeout: Duration,
) -> Result<Option<Value>, TransportError> {
    if let Some(declared) = declared_content_length {
        if declared > max_bytes {
            return Err(TransportError::PayloadTooLarge);
        }
    }

    let read = tokio::time::timeout(timeout, read_all_bounded(body, max_bytes));
    let bytes = match read.await {
        Ok(inner) => inner?,
        Err(_) => return Err(TransportError::RequestTimeout),
    };

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|_| TransportError::MalformedJson)
}

async fn read_all_bounded(body: Body, max_bytes: usize) -> Result<Vec<u8>, TransportError> {
    let mut stream = body.into_data_stream();
    let mut buf = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|_| TransportError::RequestAborted)?;
        buf.extend_from_slice(&chunk);
        if buf.len() > max_bytes {
            // Drain the remainder so the connection can be reused, but
            // stop accumulating — we've already failed.
            while stream.next().await.is_some() {}
            return Err(TransportError::PayloadTooLarge);
        }
    }

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_from(bytes: &'static [u8]) -> Body {
        Body::from(bytes)
    }

    #[tokio::test]
    async fn empty_body_yields_none() {
        let result = read_bounded_json(body_from(b""), None, 1024, Duration::from_secs(1))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn whitespace_only_body_yields_none() {
        let result = read_bounded_json(body_from(b"   \n"), None, 1024, Duration::from_secs(1))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn valid_json_parses() {
        let result = read_bounded_json(body_from(br#"{"a":1}"#), None, 1024, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(result, Some(serde_json::json!({ "a": 1 })));
    }

    #[tokio::test]
    async fn malformed_json_is_rejected() {
        let err = read_bounded_json(body_from(b"{not json"), None, 1024, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::MalformedJson));
    }

    #[tokio::test]
    async fn oversized_declared_length_is_rejected_without_reading_body() {
        let err = read_bounded_json(body_from(b"{}"), Some(10_000), 1024, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::PayloadTooLarge));
    }

    #[tokio::test]
    async fn oversized_actual_body_is_rejected() {
        let big = vec![b'a'; 2048];
        let err = read_bounded_json(Body::from(big), None, 1024, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::PayloadTooLarge));
    }
}
