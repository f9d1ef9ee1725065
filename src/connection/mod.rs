//! Connections to the message bus.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Connection`] | Shared handle to one endpoint |
//! | [`ConnectionState`] | `Stopped` / `Started` / `Paused` |
//! | [`Property`] | Property named in change notifications |
//! | [`Transport`] | Seam to the vendor messaging SDK |
//! | [`NullTransport`] | Transport that does nothing |

// ============================================================================
// Submodules
// ============================================================================

/// Connection handle and lifecycle.
pub mod core;

/// Lifecycle state and observable properties.
pub mod state;

/// Messaging transport seam.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::core::{Connection, PropertyHandler};
pub use state::{ConnectionState, Property};
pub use transport::{NullTransport, Transport};
