//! Orchestrates a `/mcp` POST: session lifecycle, per-request dispatch,
//! and filing each response as an event on the session's stream.

use std::sync::Arc;

use serde_json::Value;

use crate::dispatch::ToolDispatcher;
use crate::event_bus::EventBus;
use crate::jsonrpc::{self, codes, JsonRpcPayload, JsonRpcRequest};
use crate::session::{SessionTable, SessionState};

/// Everything a POST `/mcp` handler needs, `Arc`-shared across requests.
pub struct Transport {
    sessions: Arc<SessionTable>,
    events: Arc<EventBus>,
}

/// Result of handling one POST: the (possibly newly minted) session id
/// to echo in `Mcp-Session-Id`, and the ordered events to stream back.
pub struct PostOutcome {
    /// Session this request is now bound to.
    pub session_id: String,
    /// Events filed on this session's stream, in emission order, each
    /// already assigned an event-store id.
    pub events: Vec<(String, Value)>,
}

impl Transport {
    /// Build a transport over shared session/event state.
    #[must_use]
    pub fn new(sessions: Arc<SessionTable>, events: Arc<EventBus>) -> Self {
        Self { sessions, events }
    }

    /// Handle one POST body (a single request or a batch), dispatching
    /// each JSON-RPC call through `dispatcher` and filing the responses
    /// as SSE events on the bound session's stream.
    pub async fn handle_post(
        &self,
        existing_session_id: Option<String>,
        payload: JsonRpcPayload,
        dispatcher: &dyn ToolDispatcher,
    ) -> PostOutcome {
        let session = match existing_session_id.and_then(|id| self.sessions.get(&id)) {
            Some(session) => session,
            None => self.sessions.create(),
        };

        let mut events = Vec::new();

        for request in payload.into_requests() {
            let response = self.handle_one(&session.session_id, request, dispatcher).await;
            let event_id = self.events.publish(&session.session_id, response.clone());
            events.push((event_id, response));
        }

        PostOutcome {
            session_id: session.session_id,
            events,
        }
    }

    async fn handle_one(&self, session_id: &str, request: JsonRpcRequest, dispatcher: &dyn ToolDispatcher) -> Value {
        let id = request.id.clone().unwrap_or(Value::Null);

        if request.method == "initialize" {
            self.sessions.activate(session_id);
            return jsonrpc::response(
                id,
                serde_json::json!({
                    "protocolVersion": gateway_core::PROTOCOL_VERSION,
                    "capabilities": { "tools": {} },
                    "serverInfo": { "name": "effect-patterns-mcp-gateway", "version": env!("CARGO_PKG_VERSION") },
                }),
            );
        }

        let session = self.sessions.get(session_id);
        let allowed = session.as_ref().is_some_and(|s| s.allows(&request.method));
        if !allowed {
            return jsonrpc::error_response(
                Some(id),
                codes::INVALID_REQUEST,
                "session not initialized",
                None,
            );
        }

        match dispatcher.dispatch(&request.method, request.params.as_ref()).await {
            Ok(result) => jsonrpc::response(id, result),
            Err(message) => jsonrpc::error_response(Some(id), codes::INTERNAL, message, None),
        }
    }

    /// Shut a session down explicitly (closed sessions never reopen).
    pub fn close_session(&self, session_id: &str) {
        self.sessions.close(session_id);
    }

    /// Whether `session_id` names a session that is `Active` (used by the
    /// GET handler to decide whether to accept server-initiated
    /// notifications at all).
    #[must_use]
    pub fn is_active(&self, session_id: &str) -> bool {
        self.sessions
            .get(session_id)
            .is_some_and(|s| s.state == SessionState::Active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::BoxFuture;
    use gateway_core::EventStore;

    struct EchoDispatcher;

    impl ToolDispatcher for EchoDispatcher {
        fn dispatch<'a>(&'a self, method: &'a str, _params: Option<&'a Value>) -> BoxFuture<'a, Result<Value, String>> {
            Box::pin(async move { Ok(serde_json::json!({ "echo": method })) })
        }
    }

    fn test_transport() -> Transport {
        let sessions = Arc::new(SessionTable::new());
        let events = Arc::new(EventBus::new(Arc::new(EventStore::new(100, 60_000))));
        Transport::new(sessions, events)
    }

    #[tokio::test]
    async fn initialize_mints_session_and_activates_it() {
        let transport = test_transport();
        let payload = JsonRpcPayload::Single(JsonRpcRequest {
            jsonrpc: "2.0".into(),
            id: Some(serde_json::json!(1)),
            method: "initialize".into(),
            params: None,
        });

        let outcome = transport.handle_post(None, payload, &EchoDispatcher).await;
        assert_eq!(outcome.events.len(), 1);
        assert!(transport.is_active(&outcome.session_id));
    }

    #[tokio::test]
    async fn method_before_initialize_is_rejected() {
        let transport = test_transport();
        let payload = JsonRpcPayload::Single(JsonRpcRequest {
            jsonrpc: "2.0".into(),
            id: Some(serde_json::json!(1)),
            method: "tools/call".into(),
            params: None,
        });

        let outcome = transport.handle_post(None, payload, &EchoDispatcher).await;
        let (_, response) = &outcome.events[0];
        assert_eq!(response["error"]["code"], serde_json::json!(codes::INVALID_REQUEST));
    }

    #[tokio::test]
    async fn active_session_dispatches_to_tool_handler() {
        let transport = test_transport();
        let init = JsonRpcPayload::Single(JsonRpcRequest {
            jsonrpc: "2.0".into(),
            id: Some(serde_json::json!(1)),
            method: "initialize".into(),
            params: None,
        });
        let outcome = transport.handle_post(None, init, &EchoDispatcher).await;

        let call = JsonRpcPayload::Single(JsonRpcRequest {
            jsonrpc: "2.0".into(),
            id: Some(serde_json::json!(2)),
            method: "tools/call".into(),
            params: None,
        });
        let outcome = transport
            .handle_post(Some(outcome.session_id), call, &EchoDispatcher)
            .await;

        let (_, response) = &outcome.events[0];
        assert_eq!(response["result"]["echo"], serde_json::json!("tools/call"));
    }
}
