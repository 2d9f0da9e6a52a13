//! Event bus for broadcasting events to subscribers .
//!
//! Publishing is non-blocking best-effort: a slow subscriber falls behind
//! and the broadcast channel drops its oldest backlog rather than block
//! the publisher (the pipeline, or a container output reader). Drops are
//! surfaced as a `dropped` counter and a `Lagged` warning on next `recv`.

use crate::event::CarapaceEvent;
use crate::subscriber::SubscriberRegistry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

/// Default channel capacity for the event bus.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Event bus for broadcasting events to all subscribers (the PUB socket's
/// single publisher, plus the lifecycle manager's internal SUB fan-out).
pub struct EventBus {
    sender: broadcast::Sender<Arc<CarapaceEvent>>,
    registry: SubscriberRegistry,
    capacity: usize,
    dropped: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a new event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new event bus with a specific channel capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            registry: SubscriberRegistry::new(),
            capacity,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Publish an event to all subscribers. Returns the number of async
    /// receivers that had room for it (: best-effort, non-blocking).
    pub fn publish(&self, event: CarapaceEvent) -> usize {
        let event = Arc::new(event);

        trace!(topic = %event.topic, "publishing event");
        self.registry().notify(&event);

        match self.sender.send(Arc::clone(&event)) {
            Ok(count) => {
                debug!(topic = %event.topic, receivers = count, "event published");
                count
            },
            Err(_) => {
                trace!(topic = %event.topic, "no receivers for event");
                0
            },
        }
    }

    /// Subscribe to the bus, receiving every subsequently published event.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
            dropped: Arc::clone(&self.dropped),
        }
    }

    /// Access the synchronous subscriber registry.
    #[must_use]
    pub fn registry(&self) -> &SubscriberRegistry {
        &self.registry
    }

    /// Current number of active async subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total events dropped across all receivers due to backpressure
    /// (backpressure).
    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            registry: SubscriberRegistry::new(),
            capacity: self.capacity(),
            dropped: Arc::clone(&self.dropped),
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("capacity", &self.capacity())
            .field("subscribers", &self.subscriber_count())
            .field("dropped", &self.dropped_count())
            .finish()
    }
}

/// A subscription handle returned by [`EventBus::subscribe`].
pub struct EventReceiver {
    receiver: broadcast::Receiver<Arc<CarapaceEvent>>,
    dropped: Arc<AtomicU64>,
}

impl EventReceiver {
    /// Await the next event. Returns `None` only when the bus itself has
    /// been dropped.
    pub async fn recv(&mut self) -> Option<Arc<CarapaceEvent>> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    self.dropped.fetch_add(skipped, Ordering::Relaxed);
                    warn!(skipped, "event receiver lagged, events dropped");
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking poll for the next event.
    pub fn try_recv(&mut self) -> Option<Arc<CarapaceEvent>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    self.dropped.fetch_add(skipped, Ordering::Relaxed);
                    warn!(skipped, "event receiver lagged, events dropped");
                },
                Err(broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed) => {
                    return None;
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carapace_core::{GroupId, Topic};

    fn sample_event(topic: &'static str) -> CarapaceEvent {
        CarapaceEvent::new(Topic::Fixed(topic), "carapace", GroupId::new("g"), serde_json::json!({}))
    }

    #[tokio::test]
    async fn publish_and_receive() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let n = bus.publish(sample_event("agent.started"));
        assert_eq!(n, 1);
        let event = rx.recv().await.unwrap();
        assert_eq!(event.topic, Topic::Fixed("agent.started"));
    }

    #[tokio::test]
    async fn no_subscribers_is_fine() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(sample_event("agent.started")), 0);
    }

    #[tokio::test]
    async fn multiple_subscribers_all_receive() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.publish(sample_event("task.created")), 2);
        assert!(rx1.recv().await.is_some());
        assert!(rx2.recv().await.is_some());
    }

    #[tokio::test]
    async fn lagging_receiver_reports_drops_not_a_block() {
        let bus = EventBus::with_capacity(2);
        let mut rx = bus.subscribe();
        for _ in 0..5 {
            bus.publish(sample_event("task.created"));
        }
        // the slow receiver lagged; recv surfaces the drop and keeps going
        // rather than blocking the publisher (publish above never blocked).
        let _ = rx.recv().await;
        assert!(bus.dropped_count() > 0);
    }

    #[test]
    fn synchronous_registry_is_notified_even_without_async_subscribers() {
        let bus = EventBus::new();
        bus.registry().register(Box::new(|_event| {}));
        assert_eq!(bus.registry().len(), 1);
    }
}
