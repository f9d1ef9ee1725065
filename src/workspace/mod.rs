//! Workspace coordination.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Workspace`] | Owns the bus, registry and hierarchy; opens and saves projects |
//! | [`WorkspaceBuilder`] | Fluent configuration |
//! | [`WorkspaceOptions`] | Project handling options |

// ============================================================================
// Submodules
// ============================================================================

/// Builder pattern for workspace configuration.
pub mod builder;

/// Workspace coordinator.
pub mod core;

/// Workspace behaviour options.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::core::Workspace;
pub use builder::WorkspaceBuilder;
pub use options::{DEFAULT_MAX_RECENT_PROJECTS, WorkspaceOptions};
