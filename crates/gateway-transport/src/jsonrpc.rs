//! JSON-RPC 2.0 envelope types used on `/mcp`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single JSON-RPC request or notification (notifications omit `id`).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JsonRpcRequest {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Present on requests, absent on notifications.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Method name, e.g. `"initialize"` or `"tools/call"`.
    pub method: String,
    /// Method parameters, method-defined shape.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// A batch is one or many requests delivered in a single POST body.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum JsonRpcPayload {
    /// A single JSON-RPC request object.
    Single(JsonRpcRequest),
    /// A JSON array of request objects.
    Batch(Vec<JsonRpcRequest>),
}

impl JsonRpcPayload {
    /// Flatten into a `Vec` regardless of whether the wire form was a
    /// single object or a batch array.
    #[must_use]
    pub fn into_requests(self) -> Vec<JsonRpcRequest> {
        match self {
            Self::Single(r) => vec![r],
            Self::Batch(rs) => rs,
        }
    }
}

/// A JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// One of the codes in [`codes`].
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Optional structured detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Build a successful JSON-RPC response.
#[must_use]
pub fn response(id: Value, result: Value) -> Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result,
    })
}

/// Build a JSON-RPC error response. `id` is `None` when the request
/// couldn't even be parsed far enough to recover one.
#[must_use]
pub fn error_response(id: Option<Value>, code: i64, message: impl Into<String>, data: Option<Value>) -> Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": code,
            "message": message.into(),
            "data": data,
        },
    })
}

/// JSON-RPC error codes this gateway emits.
pub mod codes {
    /// Missing or invalid credential.
    pub const UNAUTHORIZED: i64 = -32001;
    /// Malformed request, bad origin, or aborted body.
    pub const INVALID_REQUEST: i64 = -32600;
    /// Unhandled server-side failure.
    pub const INTERNAL: i64 = -32603;
    /// Body did not parse as JSON.
    pub const PARSE_ERROR: i64 = -32700;
    /// Body read exceeded the configured timeout.
    pub const BODY_TIMEOUT: i64 = -32008;
    /// Body exceeded the configured size limit.
    pub const PAYLOAD_TOO_LARGE: i64 = -32013;
}
