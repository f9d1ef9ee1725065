//! The connection registry.
//!
//! # Components
//!
//! | Item | Description |
//! |------|-------------|
//! | [`ConnectionRegistry`] | Sorted, de-duplicated, lock-guarded collection |
//! | [`collation`] | Locale-aware description ordering |

// ============================================================================
// Submodules
// ============================================================================

/// Locale-aware ordering of descriptions.
pub mod collation;

/// Registry implementation.
pub mod core;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::core::ConnectionRegistry;
