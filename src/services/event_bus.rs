//! In-process publish/subscribe fan-out of domain events.
//!
//! Domain state never depends on event delivery — publish happens strictly
//! after the authoritative store write. Each subscriber gets a bounded
//! `tokio::sync::broadcast` channel; a slow subscriber's oldest-unread
//! messages are dropped first (the channel's own `Lagged` semantics), and
//! `EventBus::dropped_count` reports how many were lost crate-wide.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Domain events published by the kernel (spec §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum EventPayload {
    TaskCreated { task_id: Uuid },
    TaskAssigned { task_id: Uuid, agent_id: String },
    TaskUpdated { task_id: Uuid, status: String },
    TaskCompleted { task_id: Uuid, status: String },
    AgentStatusChanged { agent_id: String, status: String },
    ToolCalled { task_id: Uuid, step: u32, action: String, is_loop_detected: bool },
    LoopDetected { task_id: Uuid, verdict: String },
    BudgetWarning { daily_spent_cents: u64, daily_limit_cents: u64 },
    BudgetExceeded { daily_spent_cents: u64, daily_limit_cents: u64 },
    CodeReviewCompleted { task_id: Uuid, approved: bool },
    TaskTimeout { task_id: Uuid },
}

/// A stamped, ordered event as seen by subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

pub struct EventBus {
    sender: broadcast::Sender<Event>,
    sequence: AtomicU64,
    dropped_total: AtomicU64,
}

impl EventBus {
    #[must_use]
    pub fn new(channel_capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(channel_capacity.max(1));
        Self {
            sender,
            sequence: AtomicU64::new(0),
            dropped_total: AtomicU64::new(0),
        }
    }

    /// Stamp and fan out an event. Never blocks domain logic: a channel with
    /// no subscribers simply drops the event.
    pub async fn publish(&self, payload: EventPayload) {
        let event = Event {
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
            timestamp: Utc::now(),
            payload,
        };
        // send() only errors when there are zero receivers; that's fine.
        let _ = self.sender.send(event);
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Receive the next event for a subscriber, transparently accounting for
    /// lagged (dropped) messages rather than surfacing the raw channel error.
    pub async fn recv(&self, rx: &mut broadcast::Receiver<Event>) -> Option<Event> {
        loop {
            match rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    self.dropped_total.fetch_add(skipped, Ordering::Relaxed);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_total.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        bus.publish(EventPayload::TaskCreated { task_id: Uuid::new_v4() })
            .await;
        let event = bus.recv(&mut rx).await.expect("event");
        assert!(matches!(event.payload, EventPayload::TaskCreated { .. }));
    }

    #[tokio::test]
    async fn sequence_numbers_increase() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        for _ in 0..3 {
            bus.publish(EventPayload::TaskCreated { task_id: Uuid::new_v4() })
                .await;
        }
        let first = bus.recv(&mut rx).await.unwrap().sequence;
        let second = bus.recv(&mut rx).await.unwrap().sequence;
        assert!(second > first);
    }

    #[tokio::test]
    async fn lagging_subscriber_counts_drops_not_errors() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();
        for _ in 0..10 {
            bus.publish(EventPayload::TaskCreated { task_id: Uuid::new_v4() })
                .await;
        }
        // First recv transparently skips the lagged-and-dropped entries.
        let event = bus.recv(&mut rx).await.expect("event after lag");
        assert!(matches!(event.payload, EventPayload::TaskCreated { .. }));
        assert!(bus.dropped_count() > 0);
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::new(16);
        bus.publish(EventPayload::TaskCreated { task_id: Uuid::new_v4() })
            .await;
    }
}
