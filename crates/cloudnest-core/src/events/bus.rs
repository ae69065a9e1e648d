//! In-process publish/subscribe bus for invalidation events.
//!
//! Delivery to registered handlers is synchronous and best-effort: a
//! handler registered after a publish never sees that event, and rapid
//! repeats are delivered as-is. Async consumers can take a
//! [`broadcast::Receiver`] via [`InvalidationBus::watch`] instead.

use std::fmt;
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::types::SubscriptionId;

use super::{EventKind, InvalidationEvent};

type Handler = Arc<dyn Fn(&InvalidationEvent) + Send + Sync>;

/// Buffer size of the broadcast channel handed out by `watch`.
const DEFAULT_BUFFER: usize = 64;

/// Typed invalidation bus shared by every UI surface.
pub struct InvalidationBus {
    /// Event kind → registered handlers, in registration order.
    handlers: DashMap<EventKind, Vec<(SubscriptionId, Handler)>>,
    /// Fan-out for async watchers.
    broadcast: broadcast::Sender<InvalidationEvent>,
}

impl fmt::Debug for InvalidationBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvalidationBus")
            .field("kinds", &self.handlers.len())
            .field("watchers", &self.broadcast.receiver_count())
            .finish()
    }
}

impl InvalidationBus {
    /// Create a new bus.
    pub fn new() -> Arc<Self> {
        Self::with_buffer(DEFAULT_BUFFER)
    }

    /// Create a new bus whose async watchers buffer `buffer` events.
    pub fn with_buffer(buffer: usize) -> Arc<Self> {
        let (broadcast, _) = broadcast::channel(buffer.max(1));
        Arc::new(Self {
            handlers: DashMap::new(),
            broadcast,
        })
    }

    /// Publish an event to every current subscriber of its kind.
    ///
    /// Returns the number of synchronous handlers invoked.
    pub fn publish(&self, event: InvalidationEvent) -> usize {
        let kind = event.kind();
        // Clone the handler list so handlers may (un)subscribe re-entrantly.
        let handlers: Vec<Handler> = self
            .handlers
            .get(&kind)
            .map(|entry| entry.value().iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();

        for handler in &handlers {
            handler(&event);
        }

        if self.broadcast.send(event).is_err() {
            trace!(?kind, "No async watchers");
        }
        debug!(?kind, delivered = handlers.len(), "Published invalidation event");
        handlers.len()
    }

    /// Register a handler for one event kind.
    ///
    /// The handler stays registered until the returned [`Subscription`] is
    /// dropped or explicitly unsubscribed.
    pub fn subscribe<F>(self: &Arc<Self>, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&InvalidationEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId::new();
        self.handlers
            .entry(kind)
            .or_default()
            .push((id, Arc::new(handler)));
        trace!(?kind, %id, "Subscribed");

        Subscription {
            id,
            kind,
            bus: Arc::downgrade(self),
            active: true,
        }
    }

    /// Remove a handler. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, kind: EventKind, id: SubscriptionId) -> bool {
        let mut removed = false;
        if let Some(mut entry) = self.handlers.get_mut(&kind) {
            let before = entry.len();
            entry.retain(|(sid, _)| *sid != id);
            removed = entry.len() != before;
            if entry.is_empty() {
                drop(entry);
                self.handlers.remove_if(&kind, |_, v| v.is_empty());
            }
        }
        removed
    }

    /// Receive every subsequently published event on an async channel.
    pub fn watch(&self) -> broadcast::Receiver<InvalidationEvent> {
        self.broadcast.subscribe()
    }

    /// Number of synchronous handlers registered for a kind.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.handlers.get(&kind).map(|e| e.len()).unwrap_or(0)
    }
}

/// Guard for one registered handler; unsubscribes on drop.
#[must_use = "dropping a Subscription unsubscribes its handler"]
pub struct Subscription {
    id: SubscriptionId,
    kind: EventKind,
    bus: Weak<InvalidationBus>,
    active: bool,
}

impl Subscription {
    /// The subscription identifier.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// The event kind this subscription listens to.
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Remove the handler now.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    /// Keep the handler registered for the lifetime of the bus.
    pub fn detach(mut self) {
        self.active = false;
    }

    fn release(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(bus) = self.bus.upgrade() {
            bus.unsubscribe(self.kind, self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
