//! Project persistence.
//!
//! A project is a JSON file holding the connection list and the subject
//! tree. Loading is lenient: bad entries are skipped and counted in a
//! [`LoadReport`], never fatal.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `record` | document and record types, lenient parsing |
//! | `store` | async read, atomic write |
//! | `recent` | most-recently-used project list |

// ============================================================================
// Submodules
// ============================================================================

mod recent;
mod record;
mod report;
mod store;

// ============================================================================
// Re-exports
// ============================================================================

pub use recent::RecentProjects;
pub use record::{ConnectionList, ConnectionRecord, Parsed, ProjectDocument, SubjectRecord};
pub use report::LoadReport;
pub use store::{read_connection_list, read_project, write_connection_list, write_project};
