//! Per-stream append-only event log used for SSE reconnection replay.
//!
//! Events are bounded by both count (`max_events`, FIFO) and age
//! (`ttl_ms`, trimmed from the head on every `store_event` call). IDs are
//! a monotonically increasing counter rendered as a base-10 string —
//! simple, orderable by string comparison is not required since callers
//! compare by parsed position, and it keeps the wire format identical to
//! what the streamable HTTP transport puts in `id:` fields.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde_json::Value;

use crate::error::{CoreError, CoreResult};
use crate::time::now_ms;

/// A single stored event, ready to be replayed onto an SSE stream.
#[derive(Debug, Clone)]
pub struct StoredEvent {
    /// Monotonic event id, unique within the store's lifetime.
    pub event_id: String,
    /// The stream this event belongs to.
    pub stream_id: String,
    /// Opaque JSON-RPC payload.
    pub message: Value,
    /// Creation time in epoch milliseconds.
    pub created_at: u64,
}

/// Bounded, TTL-trimmed, replayable event log.
pub struct EventStore {
    max_events: usize,
    ttl_ms: u64,
    counter: AtomicU64,
    events: Mutex<VecDeque<StoredEvent>>,
}

impl EventStore {
    /// Create a store holding at most `max_events` entries, each retained
    /// for at most `ttl_ms` milliseconds.
    #[must_use]
    pub fn new(max_events: usize, ttl_ms: u64) -> Self {
        Self {
            max_events: max_events.max(1),
            ttl_ms,
            counter: AtomicU64::new(0),
            events: Mutex::new(VecDeque::new()),
        }
    }

    /// Append `message` to `stream_id`'s log, trimming expired entries
    /// first and overflow entries after. Returns the assigned event id.
    pub fn store_event(&self, stream_id: &str, message: Value) -> String {
        let mut events = self.events.lock();
        let now = now_ms();

        self.trim_expired_locked(&mut events, now);

        let event_id = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let event_id = event_id.to_string();

        events.push_back(StoredEvent {
            event_id: event_id.clone(),
            stream_id: stream_id.to_string(),
            message,
            created_at: now,
        });

        while events.len() > self.max_events {
            events.pop_front();
        }

        event_id
    }

    fn trim_expired_locked(&self, events: &mut VecDeque<StoredEvent>, now: u64) {
        let cutoff = now.saturating_sub(self.ttl_ms);
        while let Some(front) = events.front() {
            if front.created_at < cutoff {
                events.pop_front();
            } else {
                break;
            }
        }
    }

    /// Find which stream an event id belongs to, if it's still retained.
    #[must_use]
    pub fn stream_id_for_event(&self, event_id: &str) -> Option<String> {
        self.events
            .lock()
            .iter()
            .find(|e| e.event_id == event_id)
            .map(|e| e.stream_id.clone())
    }

    /// Replay every event after `last_event_id` belonging to the same
    /// stream, in order, invoking `send` for each.
    ///
    /// Returns the stream id on success, or [`CoreError::UnknownEventId`]
    /// if `last_event_id` has fallen outside the TTL/size window (or was
    /// never issued) — the caller must tell the client to re-initialize.
    pub fn replay_after(
        &self,
        last_event_id: &str,
        mut send: impl FnMut(&str, &Value),
    ) -> CoreResult<String> {
        let events = self.events.lock();

        let anchor = events
            .iter()
            .position(|e| e.event_id == last_event_id)
            .ok_or_else(|| CoreError::UnknownEventId(last_event_id.to_string()))?;

        let stream_id = events[anchor].stream_id.clone();

        for event in events.iter().skip(anchor + 1) {
            if event.stream_id == stream_id {
                send(&event.event_id, &event.message);
            }
        }

        Ok(stream_id)
    }

    /// Current number of retained events (test/diagnostic helper).
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// True when no events are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_ids_are_strictly_increasing_and_unique() {
        let store = EventStore::new(100, 60_000);
        let mut ids = Vec::new();
        for i in 0..20 {
            ids.push(store.store_event("s1", json!({ "i": i })));
        }
        let parsed: Vec<u64> = ids.iter().map(|s| s.parse().unwrap()).collect();
        for w in parsed.windows(2) {
            assert!(w[1] > w[0]);
        }
        let unique: std::collections::HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn bounded_by_max_events_fifo() {
        let store = EventStore::new(3, 60_000);
        for i in 0..10 {
            store.store_event("s1", json!(i));
        }
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn replay_after_returns_only_later_events_in_order() {
        let store = EventStore::new(100, 60_000);
        let id1 = store.store_event("s1", json!("first"));
        let _id2 = store.store_event("s1", json!("second"));
        let id3 = store.store_event("s1", json!("third"));

        let mut seen = Vec::new();
        let stream = store
            .replay_after(&id1, |id, msg| seen.push((id.to_string(), msg.clone())))
            .unwrap();

        assert_eq!(stream, "s1");
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].0, id3);
        assert_eq!(seen[1].1, json!("third"));
    }

    #[test]
    fn replay_after_only_includes_same_stream() {
        let store = EventStore::new(100, 60_000);
        let id1 = store.store_event("s1", json!("a1"));
        store.store_event("s2", json!("b1"));
        store.store_event("s1", json!("a2"));

        let mut seen = Vec::new();
        store
            .replay_after(&id1, |_, msg| seen.push(msg.clone()))
            .unwrap();

        assert_eq!(seen, vec![json!("a2")]);
    }

    #[test]
    fn replay_after_unknown_id_fails() {
        let store = EventStore::new(100, 60_000);
        store.store_event("s1", json!("a"));
        let err = store.replay_after("does-not-exist", |_, _| {}).unwrap_err();
        assert!(matches!(err, CoreError::UnknownEventId(_)));
    }

    #[test]
    fn stream_id_for_event_looks_up_owning_stream() {
        let store = EventStore::new(100, 60_000);
        let id = store.store_event("stream-a", json!("x"));
        assert_eq!(store.stream_id_for_event(&id), Some("stream-a".to_string()));
        assert_eq!(store.stream_id_for_event("nope"), None);
    }
}
