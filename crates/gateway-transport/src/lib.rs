//! Streamable HTTP transport for the MCP gateway: origin and admission
//! guards, bounded body parsing, the JSON-RPC/session state machine, the
//! replayable event bus, and the `axum` router wiring it all together.

mod auth_gate;
mod body;
mod dispatch;
mod error;
mod event_bus;
mod jsonrpc;
mod origin;
mod router;
mod session;
mod sse;
mod transport;

pub use auth_gate::{admit, Principal};
pub use body::{read_bounded_json, DEFAULT_BODY_TIMEOUT, DEFAULT_MAX_BODY_BYTES};
pub use dispatch::{BoxFuture, ToolDispatcher};
pub use error::TransportError;
pub use event_bus::{EventBus, LiveEvent};
pub use jsonrpc::{codes, error_response, response, JsonRpcError, JsonRpcPayload, JsonRpcRequest};
pub use origin::check_origin;
pub use router::{build_router, GatewayState};
pub use session::{McpSession, SessionState, SessionTable};
pub use sse::McpSseEvent;
pub use transport::{PostOutcome, Transport};
