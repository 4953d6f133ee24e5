//! Couples the bounded, replayable [`EventStore`] with a live fan-out
//! channel per stream, so a GET `/mcp` SSE connection can both replay
//! history (`Last-Event-ID`) and receive events produced after it
//! subscribed, without a gap between the two.

use std::collections::HashMap;
use std::sync::Arc;

use gateway_core::{CoreResult, EventStore};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::broadcast;

const LIVE_CHANNEL_CAPACITY: usize = 256;

/// An event as delivered to a live SSE subscriber.
#[derive(Debug, Clone)]
pub struct LiveEvent {
    /// Event-store id.
    pub id: String,
    /// JSON-RPC payload.
    pub data: Value,
}

/// Append-and-broadcast front end for the event store.
pub struct EventBus {
    store: Arc<EventStore>,
    channels: Mutex<HashMap<String, broadcast::Sender<LiveEvent>>>,
}

impl EventBus {
    /// Wrap an event store with live fan-out.
    #[must_use]
    pub fn new(store: Arc<EventStore>) -> Self {
        Self {
            store,
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Store `message` under `stream_id` and fan it out to any live
    /// subscribers. Returns the assigned event id.
    pub fn publish(&self, stream_id: &str, message: Value) -> String {
        let event_id = self.store.store_event(stream_id, message.clone());

        let channels = self.channels.lock();
        if let Some(tx) = channels.get(stream_id) {
            // No live subscriber is not an error: the event is still in
            // the store for a future GET with Last-Event-ID to replay.
            let _ = tx.send(LiveEvent {
                id: event_id.clone(),
                data: message,
            });
        }

        event_id
    }

    /// Subscribe to live events for `stream_id`, creating the channel if
    /// this is the first subscriber.
    pub fn subscribe(&self, stream_id: &str) -> broadcast::Receiver<LiveEvent> {
        let mut channels = self.channels.lock();
        channels
            .entry(stream_id.to_string())
            .or_insert_with(|| broadcast::channel(LIVE_CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Replay every event after `last_event_id`, invoking `send` for each,
    /// in order. See [`EventStore::replay_after`].
    pub fn replay_after(&self, last_event_id: &str, send: impl FnMut(&str, &Value)) -> CoreResult<String> {
        self.store.replay_after(last_event_id, send)
    }

    /// Access the underlying store (for diagnostics / tests).
    #[must_use]
    pub fn store(&self) -> &Arc<EventStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_without_subscriber_still_lands_in_store() {
        let bus = EventBus::new(Arc::new(EventStore::new(10, 60_000)));
        let id = bus.publish("s1", serde_json::json!("hello"));
        assert_eq!(bus.store().len(), 1);
        assert_eq!(bus.store().stream_id_for_event(&id), Some("s1".to_string()));
    }

    #[tokio::test]
    async fn subscriber_receives_events_published_after_subscribing() {
        let bus = EventBus::new(Arc::new(EventStore::new(10, 60_000)));
        let mut rx = bus.subscribe("s1");
        bus.publish("s1", serde_json::json!(1));
        let event = rx.recv().await.unwrap();
        assert_eq!(event.data, serde_json::json!(1));
    }
}
