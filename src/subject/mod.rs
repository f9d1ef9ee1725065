//! Subject names and the subject tree.
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`SubjectName`] | validated dotted subject, wildcard matching |
//! | [`SubjectHierarchy`] | tree of subject segments with selection state |
//! | [`SubjectNode`] | snapshot of one tree node |

// ============================================================================
// Submodules
// ============================================================================

mod hierarchy;
mod name;

// ============================================================================
// Re-exports
// ============================================================================

pub use hierarchy::{SubjectHierarchy, SubjectNode};
pub use name::{SEPARATOR, SubjectName, WILDCARD_ONE, WILDCARD_TAIL, validate_segment};
