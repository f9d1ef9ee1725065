//! Outcome of loading a project or importing a connection list.

use std::fmt;

use crate::identifiers::ConnectionKey;

/// What a load did, and what it had to skip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Connections added to the registry.
    pub connections_added: usize,
    /// Connections not added because one with the same key was present.
    pub duplicates: usize,
    /// Subject tree nodes created.
    pub subjects_created: usize,
    /// Malformed entries dropped (connections, subjects, subject names).
    pub skipped_records: usize,
    /// Connections whose transport refused to start.
    pub start_failures: Vec<ConnectionKey>,
}

impl LoadReport {
    /// Returns `true` if nothing was skipped and every start succeeded.
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.skipped_records == 0 && self.start_failures.is_empty()
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} connections added, {} duplicates, {} subjects, {} skipped, {} failed to start",
            self.connections_added,
            self.duplicates,
            self.subjects_created,
            self.skipped_records,
            self.start_failures.len()
        )
    }
}
