//! Synchronous subscriber registry for in-process listeners that don't
//! want to own a `tokio::sync::broadcast::Receiver`.

use crate::event::CarapaceEvent;
use std::sync::{Arc, RwLock};

/// A synchronous callback invoked inline from [`crate::bus::EventBus::publish`].
/// Must not block — it runs on the publisher's task.
pub type Listener = Box<dyn Fn(&CarapaceEvent) + Send + Sync>;

/// Registry of synchronous listeners, notified in registration order.
#[derive(Default)]
pub struct SubscriberRegistry {
    listeners: RwLock<Vec<Listener>>,
}

impl SubscriberRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Returns nothing — listeners live for the
    /// registry's lifetime (no unsubscribe; callers that need teardown
    /// should drop the whole bus or gate on an `Arc<AtomicBool>` inside
    /// their closure).
    pub fn register(&self, listener: Listener) {
        self.listeners.write().expect("registry lock poisoned").push(listener);
    }

    /// Invoke every registered listener with the event.
    pub fn notify(&self, event: &CarapaceEvent) {
        let listeners = self.listeners.read().expect("registry lock poisoned");
        for listener in listeners.iter() {
            listener(event);
        }
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.read().expect("registry lock poisoned").len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberRegistry").field("count", &self.len()).finish()
    }
}

#[allow(dead_code)]
fn _assert_send_sync(_: Arc<SubscriberRegistry>) {}

#[cfg(test)]
mod tests {
    use super::*;
    use carapace_core::{GroupId, Topic};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn notifies_all_listeners() {
        let registry = SubscriberRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c1 = Arc::clone(&count);
        registry.register(Box::new(move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
        }));
        let c2 = Arc::clone(&count);
        registry.register(Box::new(move |_| {
            c2.fetch_add(10, Ordering::SeqCst);
        }));

        let event = CarapaceEvent::new(            Topic::Fixed("agent.started"),
            "carapace",
            GroupId::new("g"),
            serde_json::json!({}),
);
        registry.notify(&event);
        assert_eq!(count.load(Ordering::SeqCst), 11);
    }
}
