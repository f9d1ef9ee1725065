//! Workspace coordinator.
//!
//! The [`Workspace`] owns one event bus, one connection registry and one
//! subject hierarchy, and moves projects in and out of them.
//!
//! # Project lifecycle
//!
//! Opening a project:
//!
//! 1. Reads and parses the file. A read failure changes nothing.
//! 2. Publishes [`ProjectClosing`]; the registry and hierarchy clear
//!    themselves.
//! 3. Restores the subject tree, then adds each connection, starting it if
//!    [`WorkspaceOptions::start_on_open`] is set.
//! 4. Publishes [`ProjectOpened`].
//!
//! # Example
//!
//! ```ignore
//! use rvsnoop_core::Workspace;
//!
//! let workspace = Workspace::builder().transport(transport).build()?;
//! let report = workspace.open_project("prices.json").await?;
//! println!("{report}");
//!
//! workspace.save_project(None).await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::connection::{Connection, Transport};
use crate::error::{Error, Result};
use crate::events::{EventBus, ProjectClosing, ProjectOpened};
use crate::identifiers::{ConnectionKey, SubscriptionId};
use crate::project::{
    self, ConnectionList, ConnectionRecord, LoadReport, ProjectDocument, RecentProjects,
};
use crate::registry::ConnectionRegistry;
use crate::subject::SubjectHierarchy;

use super::builder::WorkspaceBuilder;
use super::options::WorkspaceOptions;

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for the workspace.
pub(crate) struct WorkspaceInner {
    /// Bus shared by every component of this workspace.
    pub bus: Arc<EventBus>,

    /// Connections of the current project.
    pub registry: Arc<ConnectionRegistry>,

    /// Subject tree of the current project.
    pub hierarchy: Arc<SubjectHierarchy>,

    /// Transport given to connections created here.
    pub transport: Arc<dyn Transport>,

    /// Project handling options.
    pub options: WorkspaceOptions,

    /// File of the current project, if any.
    pub project: Mutex<Option<PathBuf>>,

    /// Recently opened or saved projects.
    pub recent: Mutex<RecentProjects>,

    /// Serializes project open, save, import and export.
    pub io: tokio::sync::Mutex<()>,

    /// Bus subscriptions of the registry and hierarchy.
    subscriptions: [SubscriptionId; 2],
}

impl Drop for WorkspaceInner {
    fn drop(&mut self) {
        for id in self.subscriptions {
            self.bus.unsubscribe(id);
        }
    }
}

// ============================================================================
// Workspace
// ============================================================================

/// Coordinator for connections, subjects and project files.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Workspace {
    /// Shared inner state.
    pub(crate) inner: Arc<WorkspaceInner>,
}

// ============================================================================
// Workspace - Display
// ============================================================================

impl fmt::Debug for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("project", &self.current_project())
            .field("connections", &self.inner.registry.size())
            .field("subjects", &self.inner.hierarchy.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Workspace - Construction & Accessors
// ============================================================================

impl Workspace {
    /// Creates a configuration builder for the workspace.
    #[inline]
    #[must_use]
    pub fn builder() -> WorkspaceBuilder {
        WorkspaceBuilder::new()
    }

    /// Wires a bus, registry and hierarchy together.
    pub(crate) fn new(transport: Arc<dyn Transport>, options: WorkspaceOptions) -> Self {
        let bus = Arc::new(EventBus::new());
        let registry = ConnectionRegistry::new(Arc::clone(&bus));
        let hierarchy = Arc::new(SubjectHierarchy::new());
        let subscriptions = [bus.subscribe(&registry), bus.subscribe(&hierarchy)];

        debug!(registry = %registry.id(), "Workspace created");

        Self {
            inner: Arc::new(WorkspaceInner {
                bus,
                registry,
                hierarchy,
                transport,
                options,
                project: Mutex::new(None),
                recent: Mutex::new(RecentProjects::new(options.max_recent_projects)),
                io: tokio::sync::Mutex::new(()),
                subscriptions,
            }),
        }
    }

    /// Returns the event bus.
    #[inline]
    #[must_use]
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.inner.bus
    }

    /// Returns the connection registry.
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.inner.registry
    }

    /// Returns the subject hierarchy.
    #[inline]
    #[must_use]
    pub fn hierarchy(&self) -> &Arc<SubjectHierarchy> {
        &self.inner.hierarchy
    }

    /// Returns the transport used for new connections.
    #[inline]
    #[must_use]
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.inner.transport
    }

    /// Returns the workspace options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> WorkspaceOptions {
        self.inner.options
    }

    /// Returns the file of the current project.
    #[must_use]
    pub fn current_project(&self) -> Option<PathBuf> {
        self.inner.project.lock().clone()
    }

    /// Returns a copy of the recent-projects list.
    #[must_use]
    pub fn recent_projects(&self) -> RecentProjects {
        self.inner.recent.lock().clone()
    }
}

// ============================================================================
// Workspace - Connections
// ============================================================================

impl Workspace {
    /// Creates a stopped connection on the workspace transport and adds it
    /// to the registry.
    ///
    /// Returns `None` if a connection with the same key already exists.
    pub fn new_connection(
        &self,
        key: ConnectionKey,
        description: Option<&str>,
    ) -> Option<Connection> {
        let transport = Arc::clone(&self.inner.transport);
        let connection = match description {
            Some(description) => Connection::with_description(key, description, transport),
            None => Connection::new(key, transport),
        };
        self.inner
            .registry
            .add(connection.clone())
            .then_some(connection)
    }

    /// Adds the connections of `records`, starting them if configured.
    fn populate(&self, records: &[ConnectionRecord], report: &mut LoadReport) {
        let registry = &self.inner.registry;
        for record in records {
            let (connection, skipped) = record.to_connection(Arc::clone(&self.inner.transport));
            report.skipped_records += skipped;

            if !registry.add(connection.clone()) {
                report.duplicates += 1;
                continue;
            }
            report.connections_added += 1;

            if self.inner.options.start_on_open && connection.start().is_err() {
                report.start_failures.push(connection.key().clone());
            }
        }
    }
}

// ============================================================================
// Workspace - Projects
// ============================================================================

impl Workspace {
    /// Replaces the current project with the one stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a JSON object.
    /// The current project is untouched in that case. Malformed entries and
    /// start failures are reported in the [`LoadReport`], not as errors.
    pub async fn open_project(&self, path: impl AsRef<Path>) -> Result<LoadReport> {
        let path = path.as_ref();
        let _io = self.inner.io.lock().await;

        let parsed = project::read_project(path).await?;

        self.publish_closing();

        let mut report = LoadReport {
            skipped_records: parsed.skipped,
            ..LoadReport::default()
        };
        let (created, skipped) = self.inner.hierarchy.load_records(&parsed.value.subjects);
        report.subjects_created = created;
        report.skipped_records += skipped;
        self.populate(&parsed.value.connections, &mut report);

        *self.inner.project.lock() = Some(path.to_path_buf());
        self.inner.recent.lock().add(path);

        if report.is_clean() {
            info!(path = %path.display(), %report, "Project opened");
        } else {
            warn!(path = %path.display(), %report, "Project opened with problems");
        }

        self.inner.bus.publish(ProjectOpened {
            path: path.to_path_buf(),
        });
        Ok(report)
    }

    /// Discards the current project.
    ///
    /// Returns the file of the closed project, if it had one.
    pub async fn close_project(&self) -> Option<PathBuf> {
        let _io = self.inner.io.lock().await;
        self.publish_closing()
    }

    /// Writes the current state to `path`, or to the current project file
    /// if `path` is `None`. The written file becomes the current project.
    ///
    /// Returns the path written.
    ///
    /// # Errors
    ///
    /// - [`Error::NoProject`] if `path` is `None` and no project is open
    /// - [`Error::Io`], [`Error::Json`], [`Error::TempFile`] if writing fails
    pub async fn save_project(&self, path: Option<&Path>) -> Result<PathBuf> {
        let _io = self.inner.io.lock().await;

        let target = match path {
            Some(path) => path.to_path_buf(),
            None => self.current_project().ok_or(Error::NoProject)?,
        };

        let document = self.snapshot();
        project::write_project(&target, &document).await?;

        *self.inner.project.lock() = Some(target.clone());
        self.inner.recent.lock().add(target.clone());

        info!(
            path = %target.display(),
            connections = document.connections.len(),
            "Project saved"
        );
        Ok(target)
    }

    /// Captures the registry and subject tree as a document.
    #[must_use]
    pub fn snapshot(&self) -> ProjectDocument {
        let connections = self
            .inner
            .registry
            .with_connections(|all| all.iter().map(ConnectionRecord::from_connection).collect());
        ProjectDocument {
            connections,
            subjects: self.inner.hierarchy.to_records(),
        }
    }

    /// Resets the subject tree view: every node selected, every node but
    /// the root collapsed.
    pub fn reset_subject_tree(&self) {
        self.inner.hierarchy.select_all();
        self.inner.hierarchy.collapse_all();
        debug!("Subject tree reset");
    }

    fn publish_closing(&self) -> Option<PathBuf> {
        let path = self.inner.project.lock().take();
        debug!(path = ?path, "Closing project");
        self.inner.bus.publish(ProjectClosing { path: path.clone() });
        path
    }
}

// ============================================================================
// Workspace - Connection lists
// ============================================================================

impl Workspace {
    /// Adds the connections listed in the file at `path` to the current
    /// project.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a JSON object.
    pub async fn import_connections(&self, path: impl AsRef<Path>) -> Result<LoadReport> {
        let path = path.as_ref();
        let _io = self.inner.io.lock().await;

        let parsed = project::read_connection_list(path).await?;
        let mut report = LoadReport {
            skipped_records: parsed.skipped,
            ..LoadReport::default()
        };
        self.populate(&parsed.value.connections, &mut report);

        info!(path = %path.display(), %report, "Connections imported");
        Ok(report)
    }

    /// Writes every registered connection to a connection list file.
    ///
    /// Returns the number of connections written.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub async fn export_connections(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let _io = self.inner.io.lock().await;

        let list = ConnectionList {
            connections: self.snapshot().connections,
        };
        project::write_connection_list(path, &list).await?;

        info!(path = %path.display(), count = list.connections.len(), "Connections exported");
        Ok(list.connections.len())
    }
}

// ============================================================================
// Tests
// ============================================================================
