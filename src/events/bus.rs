//! Synchronous publish/subscribe bus.
//!
//! The bus holds subscribers weakly: dropping the last strong reference to a
//! subscriber ends its subscription, and [`EventBus::unsubscribe`] ends it
//! explicitly. A subscriber never keeps itself alive through the bus, so a
//! registry can subscribe to the same bus it publishes on.
//!
//! # Ordering
//!
//! Deliveries are serialized by a reentrant lock, so all subscribers observe
//! one total order of events. A subscriber that publishes from inside a
//! callback has its event delivered immediately (depth first) on the same
//! thread.

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{ReentrantMutex, RwLock};
use tracing::{debug, trace};

use crate::identifiers::SubscriptionId;

use super::event::{Event, EventSubscriber};

// ============================================================================
// Types
// ============================================================================

/// Registered subscriber.
struct Subscription {
    id: SubscriptionId,
    subscriber: Weak<dyn EventSubscriber>,
}

// ============================================================================
// EventBus
// ============================================================================

/// Delivers [`Event`]s to registered [`EventSubscriber`]s.
///
/// # Example
///
/// ```ignore
/// let bus = Arc::new(EventBus::new());
/// let logger: Arc<MyLogger> = Arc::new(MyLogger::default());
/// let id = bus.subscribe(&logger);
///
/// bus.publish(ProjectClosing { path: None });
/// bus.unsubscribe(id);
/// ```
pub struct EventBus {
    /// Subscribers in registration order.
    subscriptions: RwLock<Vec<Subscription>>,
    /// Serializes delivery.
    delivery: ReentrantMutex<()>,
    /// Number of events published.
    published: AtomicU64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// EventBus - Subscription
// ============================================================================

impl EventBus {
    /// Creates a bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(Vec::new()),
            delivery: ReentrantMutex::new(()),
            published: AtomicU64::new(0),
        }
    }

    /// Registers a subscriber.
    ///
    /// The bus keeps only a weak reference.
    pub fn subscribe<S>(&self, subscriber: &Arc<S>) -> SubscriptionId
    where
        S: EventSubscriber + 'static,
    {
        let id = SubscriptionId::generate();
        let weak: Weak<S> = Arc::downgrade(subscriber);
        let weak: Weak<dyn EventSubscriber> = weak;
        self.subscriptions.write().push(Subscription {
            id,
            subscriber: weak,
        });
        debug!(subscription = %id, "Subscriber registered");
        id
    }

    /// Removes a subscription. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self.subscriptions.write();
        let before = subscriptions.len();
        subscriptions.retain(|s| s.id != id);
        let removed = subscriptions.len() != before;
        if removed {
            debug!(subscription = %id, "Subscriber removed");
        }
        removed
    }

    /// Returns the number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscriptions
            .read()
            .iter()
            .filter(|s| s.subscriber.strong_count() > 0)
            .count()
    }

    /// Returns the number of events published so far.
    #[inline]
    #[must_use]
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

// ============================================================================
// EventBus - Publishing
// ============================================================================

impl EventBus {
    /// Delivers an event to every live subscriber.
    ///
    /// Returns the number of subscribers that received it.
    pub fn publish(&self, event: impl Into<Event>) -> usize {
        let event = event.into();
        let _delivery = self.delivery.lock();
        self.published.fetch_add(1, Ordering::Relaxed);

        let (live, dead) = {
            let subscriptions = self.subscriptions.read();
            let mut live = Vec::with_capacity(subscriptions.len());
            let mut dead = false;
            for subscription in subscriptions.iter() {
                match subscription.subscriber.upgrade() {
                    Some(subscriber) => live.push(subscriber),
                    None => dead = true,
                }
            }
            (live, dead)
        };

        if dead {
            self.subscriptions
                .write()
                .retain(|s| s.subscriber.strong_count() > 0);
        }

        trace!(event = event.name(), subscribers = live.len(), "Publishing event");
        for subscriber in &live {
            event.dispatch(subscriber.as_ref());
        }
        live.len()
    }
}

// ============================================================================
// Tests
// ============================================================================
