//! Per-connection MCP session: the `Uninitialized → Active → Closed`
//! state machine and the bounded table of live sessions.

use std::collections::HashMap;

use parking_lot::Mutex;
use uuid::Uuid;

use gateway_core::time::now_ms;

/// Lifecycle state of an `McpSession`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Only the `initialize` method may be called.
    Uninitialized,
    /// Session is live; any method may be called.
    Active,
    /// Terminal. The session id may never be reused.
    Closed,
}

/// A transport-level session, independent of OAuth/API-key identity —
/// this tracks the JSON-RPC `initialize` handshake and the stream this
/// session's events are filed under.
#[derive(Debug, Clone)]
pub struct McpSession {
    /// The `Mcp-Session-Id` value, echoed on every response.
    pub session_id: String,
    /// Epoch-ms of session creation.
    pub created_at: u64,
    /// Current lifecycle state.
    pub state: SessionState,
}

impl McpSession {
    fn new(session_id: String) -> Self {
        Self {
            session_id,
            created_at: now_ms(),
            state: SessionState::Uninitialized,
        }
    }

    /// Whether `method` may be invoked in the current state.
    #[must_use]
    pub fn allows(&self, method: &str) -> bool {
        match self.state {
            SessionState::Uninitialized => method == "initialize",
            SessionState::Active => true,
            SessionState::Closed => false,
        }
    }
}

/// Table of live sessions, keyed by `Mcp-Session-Id`.
#[derive(Default)]
pub struct SessionTable {
    sessions: Mutex<HashMap<String, McpSession>>,
}

impl SessionTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a new session with a random UUID id.
    pub fn create(&self) -> McpSession {
        let session_id = Uuid::new_v4().to_string();
        let session = McpSession::new(session_id);
        self.sessions.lock().insert(session.session_id.clone(), session.clone());
        session
    }

    /// Look up a session by id.
    #[must_use]
    pub fn get(&self, session_id: &str) -> Option<McpSession> {
        self.sessions.lock().get(session_id).cloned()
    }

    /// Transition a session to `Active` (called after a successful
    /// `initialize`).
    pub fn activate(&self, session_id: &str) {
        if let Some(session) = self.sessions.lock().get_mut(session_id) {
            if session.state == SessionState::Uninitialized {
                session.state = SessionState::Active;
            }
        }
    }

    /// Transition a session to `Closed`. Idempotent.
    pub fn close(&self, session_id: &str) {
        if let Some(session) = self.sessions.lock().get_mut(session_id) {
            session.state = SessionState::Closed;
        }
    }

    /// Number of tracked sessions (test/diagnostic helper).
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    /// True when no sessions are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_only_allows_initialize() {
        let table = SessionTable::new();
        let session = table.create();
        assert!(session.allows("initialize"));
        assert!(!session.allows("tools/call"));
    }

    #[test]
    fn activated_session_allows_any_method() {
        let table = SessionTable::new();
        let session = table.create();
        table.activate(&session.session_id);
        let session = table.get(&session.session_id).unwrap();
        assert!(session.allows("tools/call"));
    }

    #[test]
    fn closed_session_is_terminal() {
        let table = SessionTable::new();
        let session = table.create();
        table.activate(&session.session_id);
        table.close(&session.session_id);
        let session = table.get(&session.session_id).unwrap();
        assert!(!session.allows("tools/call"));
        assert!(!session.allows("initialize"));
    }

    #[test]
    fn session_ids_are_unique() {
        let table = SessionTable::new();
        let a = table.create();
        let b = table.create();
        assert_ne!(a.session_id, b.session_id);
    }
}
