//! RvSnoop core - connection registry and subject hierarchy for a
//! Rendezvous message inspector.
//!
//! This library holds the model behind the inspector: the set of bus
//! connections being monitored, the tree of subjects messages arrived on,
//! and the project files both are saved to.
//!
//! # Architecture
//!
//! A [`Workspace`] owns one of each shared component and wires them
//! together through an [`EventBus`]:
//!
//! - **[`ConnectionRegistry`]**: ordered, de-duplicated set of
//!   [`Connection`]s, sorted by description
//! - **[`SubjectHierarchy`]**: tree of subject segments with selection
//!   state and per-node record counts
//! - **[`Transport`]**: seam to the vendor messaging SDK; every lifecycle
//!   request a connection makes goes through it
//!
//! Key design principles:
//!
//! - Every shared structure is guarded by one reader/writer lock
//! - Events and property notifications fire after locks are released
//! - Project files are loaded leniently and written atomically
//!
//! # Quick Start
//!
//! ```no_run
//! use rvsnoop_core::{ConnectionKey, Result, SubjectName, Workspace};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let workspace = Workspace::builder().build()?;
//!
//!     if let Some(connection) =
//!         workspace.new_connection(ConnectionKey::new("7500", "", "tcp:7500"), Some("Prices"))
//!     {
//!         connection.add_subject("PRICES.>")?;
//!         connection.start()?;
//!     }
//!
//!     workspace
//!         .hierarchy()
//!         .record_added(&SubjectName::parse("PRICES.EU")?);
//!
//!     workspace.save_project(Some("prices.json".as_ref())).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`connection`] | [`Connection`] handle, lifecycle, [`Transport`] seam |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`events`] | [`EventBus`] and event payloads |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`project`] | Project documents, lenient load, atomic save |
//! | [`registry`] | [`ConnectionRegistry`] |
//! | [`subject`] | [`SubjectName`] and [`SubjectHierarchy`] |
//! | [`workspace`] | [`Workspace`] coordinator and builder |

// ============================================================================
// Modules
// ============================================================================

/// Connections to the message bus.
pub mod connection;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Synchronous event bus.
pub mod events;

/// Type-safe identifiers.
pub mod identifiers;

/// Project persistence.
pub mod project;

/// Ordered connection registry.
pub mod registry;

/// Subject names and the subject tree.
pub mod subject;

/// Workspace coordination.
///
/// Use [`Workspace::builder()`] to create a configured workspace.
pub mod workspace;

// ============================================================================
// Re-exports
// ============================================================================

// Connection types
pub use connection::{Connection, ConnectionState, NullTransport, Property, Transport};

// Error types
pub use error::{Error, Result};

// Event types
pub use events::{
    ConnectionCreated, ConnectionDestroyed, Event, EventBus, EventSubscriber, ProjectClosing,
    ProjectOpened,
};

// Identifier types
pub use identifiers::{ConnectionKey, HandlerId, NodeId, RegistryId, SubscriptionId};

// Project types
pub use project::{
    ConnectionList, ConnectionRecord, LoadReport, ProjectDocument, RecentProjects, SubjectRecord,
};

// Registry types
pub use registry::ConnectionRegistry;

// Subject types
pub use subject::{SubjectHierarchy, SubjectName, SubjectNode};

// Workspace types
pub use workspace::{Workspace, WorkspaceBuilder, WorkspaceOptions};

// ============================================================================
// Test Support
// ============================================================================
