//! Workspace behaviour options.
//!
//! # Example
//!
//! ```ignore
//! use rvsnoop_core::WorkspaceOptions;
//!
//! let options = WorkspaceOptions::new()
//!     .with_start_on_open(false)
//!     .with_max_recent_projects(5);
//! ```

// ============================================================================
// Constants
// ============================================================================

/// Default length of the recent-projects list.
pub const DEFAULT_MAX_RECENT_PROJECTS: usize = 10;

// ============================================================================
// WorkspaceOptions
// ============================================================================

/// Options controlling how a [`Workspace`](super::Workspace) handles projects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkspaceOptions {
    /// Start every connection after a project is opened or a connection
    /// list is imported.
    pub start_on_open: bool,

    /// Maximum number of entries in the recent-projects list.
    pub max_recent_projects: usize,
}

impl Default for WorkspaceOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl WorkspaceOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            start_on_open: true,
            max_recent_projects: DEFAULT_MAX_RECENT_PROJECTS,
        }
    }

    /// Creates options that never start connections automatically.
    #[inline]
    #[must_use]
    pub const fn offline() -> Self {
        Self {
            start_on_open: false,
            ..Self::new()
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl WorkspaceOptions {
    /// Sets whether connections start when a project is opened.
    #[inline]
    #[must_use]
    pub const fn with_start_on_open(mut self, start: bool) -> Self {
        self.start_on_open = start;
        self
    }

    /// Sets the recent-projects list length.
    #[inline]
    #[must_use]
    pub const fn with_max_recent_projects(mut self, max: usize) -> Self {
        self.max_recent_projects = max;
        self
    }

    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_recent_projects == 0 {
            return Err("max_recent_projects must be greater than zero".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
