//! Event notifications.
//!
//! Subscription is explicit: implement [`EventSubscriber`], hand an `Arc`
//! of it to [`EventBus::subscribe`], and call [`EventBus::unsubscribe`] on
//! teardown.

// ============================================================================
// Submodules
// ============================================================================

/// Synchronous publish/subscribe bus.
pub mod bus;

/// Event values and the subscriber interface.
pub mod event;

// ============================================================================
// Re-exports
// ============================================================================

pub use bus::EventBus;
pub use event::{
    ConnectionCreated, ConnectionDestroyed, Event, EventSubscriber, ProjectClosing, ProjectOpened,
};
