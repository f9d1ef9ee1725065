//! Event values and the subscriber interface.
//!
//! # Event Types
//!
//! | Event | Emitted by | When |
//! |-------|-----------|------|
//! | [`ConnectionCreated`] | registry | after a connection was added |
//! | [`ConnectionDestroyed`] | registry | after a connection was removed or cleared |
//! | [`ProjectOpened`] | workspace | after a project was loaded |
//! | [`ProjectClosing`] | workspace | before the current project is discarded |

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;

use crate::connection::Connection;
use crate::identifiers::RegistryId;

// ============================================================================
// Event Payloads
// ============================================================================

/// A connection joined a registry.
#[derive(Debug, Clone)]
pub struct ConnectionCreated {
    /// Registry the connection was added to.
    pub registry: RegistryId,
    /// The added connection.
    pub connection: Connection,
}

/// A connection left a registry. It has been stopped and detached.
#[derive(Debug, Clone)]
pub struct ConnectionDestroyed {
    /// Registry the connection was removed from.
    pub registry: RegistryId,
    /// The removed connection.
    pub connection: Connection,
}

/// A project finished loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectOpened {
    /// File the project was read from.
    pub path: PathBuf,
}

/// The current project is about to be discarded.
///
/// Subscribers holding project state clear it when they receive this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectClosing {
    /// File of the closing project, if it had one.
    pub path: Option<PathBuf>,
}

// ============================================================================
// Event
// ============================================================================

/// Any event published on the bus.
#[derive(Debug, Clone)]
pub enum Event {
    /// See [`ConnectionCreated`].
    ConnectionCreated(ConnectionCreated),
    /// See [`ConnectionDestroyed`].
    ConnectionDestroyed(ConnectionDestroyed),
    /// See [`ProjectOpened`].
    ProjectOpened(ProjectOpened),
    /// See [`ProjectClosing`].
    ProjectClosing(ProjectClosing),
}

impl Event {
    /// Returns the event name, for logging.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ConnectionCreated(_) => "connectionCreated",
            Self::ConnectionDestroyed(_) => "connectionDestroyed",
            Self::ProjectOpened(_) => "projectOpened",
            Self::ProjectClosing(_) => "projectClosing",
        }
    }

    /// Calls the subscriber method matching this event.
    pub fn dispatch(&self, subscriber: &dyn EventSubscriber) {
        match self {
            Self::ConnectionCreated(e) => subscriber.on_connection_created(e),
            Self::ConnectionDestroyed(e) => subscriber.on_connection_destroyed(e),
            Self::ProjectOpened(e) => subscriber.on_project_opened(e),
            Self::ProjectClosing(e) => subscriber.on_project_closing(e),
        }
    }
}

impl From<ConnectionCreated> for Event {
    fn from(event: ConnectionCreated) -> Self {
        Self::ConnectionCreated(event)
    }
}

impl From<ConnectionDestroyed> for Event {
    fn from(event: ConnectionDestroyed) -> Self {
        Self::ConnectionDestroyed(event)
    }
}

impl From<ProjectOpened> for Event {
    fn from(event: ProjectOpened) -> Self {
        Self::ProjectOpened(event)
    }
}

impl From<ProjectClosing> for Event {
    fn from(event: ProjectClosing) -> Self {
        Self::ProjectClosing(event)
    }
}

// ============================================================================
// EventSubscriber
// ============================================================================

/// Receives events from an [`EventBus`](super::EventBus).
///
/// Every method defaults to doing nothing; implement the ones you need.
/// Methods are called synchronously on the publishing thread, outside any
/// registry or hierarchy lock.
pub trait EventSubscriber: Send + Sync {
    /// Called after a connection was added to a registry.
    fn on_connection_created(&self, _event: &ConnectionCreated) {}

    /// Called after a connection was removed from a registry.
    fn on_connection_destroyed(&self, _event: &ConnectionDestroyed) {}

    /// Called after a project was opened.
    fn on_project_opened(&self, _event: &ProjectOpened) {}

    /// Called before the current project is discarded.
    fn on_project_closing(&self, _event: &ProjectClosing) {}
}
