//! Builder pattern for workspace configuration.
//!
//! Provides a fluent API for configuring and creating [`Workspace`]
//! instances.
//!
//! # Example
//!
//! ```ignore
//! use rvsnoop_core::Workspace;
//!
//! let workspace = Workspace::builder()
//!     .transport(my_transport)
//!     .max_recent_projects(5)
//!     .build()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::connection::{NullTransport, Transport};
use crate::error::{Error, Result};

use super::core::Workspace;
use super::options::WorkspaceOptions;

// ============================================================================
// WorkspaceBuilder
// ============================================================================

/// Builder for configuring a [`Workspace`] instance.
///
/// Use [`Workspace::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct WorkspaceBuilder {
    /// Messaging transport; defaults to [`NullTransport`].
    transport: Option<Arc<dyn Transport>>,
    /// Project handling options.
    options: WorkspaceOptions,
}

impl fmt::Debug for WorkspaceBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkspaceBuilder")
            .field("has_transport", &self.transport.is_some())
            .field("options", &self.options)
            .finish()
    }
}

// ============================================================================
// WorkspaceBuilder Implementation
// ============================================================================

impl WorkspaceBuilder {
    /// Creates a builder with default configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the transport every connection of the workspace uses.
    #[inline]
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replaces all options at once.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: WorkspaceOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets whether connections start when a project is opened.
    #[inline]
    #[must_use]
    pub fn start_on_open(mut self, start: bool) -> Self {
        self.options.start_on_open = start;
        self
    }

    /// Sets the recent-projects list length.
    #[inline]
    #[must_use]
    pub fn max_recent_projects(mut self, max: usize) -> Self {
        self.options.max_recent_projects = max;
        self
    }

    /// Builds the workspace with validation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the options are invalid.
    pub fn build(self) -> Result<Workspace> {
        self.options.validate().map_err(|message| {
            Error::config(format!(
                "{message}\n\
                 Example: Workspace::builder().max_recent_projects(10)"
            ))
        })?;

        let transport = self.transport.unwrap_or_else(NullTransport::shared);
        Ok(Workspace::new(transport, self.options))
    }
}

// ============================================================================
// Tests
// ============================================================================
