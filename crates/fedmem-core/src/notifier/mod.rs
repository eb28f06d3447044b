//! C7 — Change Notifier (spec §4.2/§6, grounded in the teacher's
//! `dashboard/events.rs` + `websocket.rs`).
//!
//! Topic-per-tenant, subscriber-owned receivers (Design Notes §9): the
//! publisher never blocks on a slow subscriber — a lagged or full receiver
//! is dropped-and-logged rather than back-pressuring the writer.

pub mod events;

pub use events::ChangeEvent;

use dashmap::DashMap;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 256;

/// Per-tenant fan-out of change events to any number of live subscriber
/// connections. Best-effort only (spec §1 non-goal: "durable message-queue
/// delivery guarantees").
pub struct ChangeNotifier {
    topics: DashMap<String, broadcast::Sender<ChangeEvent>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self { topics: DashMap::new() }
    }

    /// Subscribes to `tenant_id`'s topic, creating it if this is the first
    /// subscriber. The returned receiver is owned by the caller; dropping it
    /// is how a disconnected subscriber is removed (spec §5: "channels are
    /// owned by the connection task and closed on disconnect").
    pub fn subscribe(&self, tenant_id: &str) -> broadcast::Receiver<ChangeEvent> {
        self.topics
            .entry(tenant_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Publishes to `tenant_id`'s topic. A tenant with zero subscribers has
    /// no sender yet; publishing is then a no-op rather than an error.
    pub fn publish(&self, tenant_id: &str, event: ChangeEvent) {
        if let Some(sender) = self.topics.get(tenant_id) {
            // broadcast::Sender::send only fails when there are no
            // receivers left; that is expected and not an error to log.
            let _ = sender.send(event);
        }
    }

    pub fn subscriber_count(&self, tenant_id: &str) -> usize {
        self.topics.get(tenant_id).map(|s| s.receiver_count()).unwrap_or(0)
    }

    /// Broadcasts a terminal `ServerShutdown` event to every tenant topic,
    /// then drops them (spec §6: "on shutdown emits a terminal
    /// `{type:"server_shutdown"}` record before closing").
    pub fn shutdown(&self) {
        for entry in self.topics.iter() {
            let _ = entry.value().send(ChangeEvent::server_shutdown());
        }
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}
