//! The seam between transport and tool dispatch.
//!
//! `gateway-tools` implements this trait; `gateway-transport` only knows
//! it can hand a method name and params to *something* and get a
//! complete JSON-RPC result or error value back. Kept as a trait object
//! (rather than a direct dependency) so this crate never depends on
//! `gateway-tools`, and so tests can substitute a stub dispatcher.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

/// A boxed future, the manual equivalent of an `async fn` in a
/// dyn-compatible trait.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Routes a JSON-RPC method call to its handler and returns the
/// method's `result` (never wrapped in the outer JSON-RPC envelope —
/// the transport adds `jsonrpc`/`id` around whatever this returns).
pub trait ToolDispatcher: Send + Sync {
    /// Dispatch `method` with `params`, returning `Ok(result)` on success
    /// or `Err(message)` for a tool/dispatch-level failure (still
    /// delivered as a JSON-RPC `error` by the transport, not an HTTP
    /// error — a failed tool call is a successful transport round trip).
    fn dispatch<'a>(&'a self, method: &'a str, params: Option<&'a Value>) -> BoxFuture<'a, Result<Value, String>>;
}
