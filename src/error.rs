//! Error types for the connection registry and subject hierarchy.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use rvsnoop_core::{Result, Workspace};
//!
//! async fn example(workspace: &Workspace) -> Result<()> {
//!     let report = workspace.open_project("./project.json").await?;
//!     println!("loaded {} connections", report.connections_added);
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Transport | [`Error::Transport`] |
//! | Subjects | [`Error::InvalidSubject`], [`Error::NodeNotFound`], [`Error::RootNode`] |
//! | Persistence | [`Error::MalformedRecord`], [`Error::NoProject`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::TempFile`], [`Error::TaskJoin`] |
//!
//! Duplicate adds and removal of absent connections are not errors; the
//! registry reports them through its `bool` return values.

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio::task::JoinError;

use crate::identifiers::{ConnectionKey, NodeId};

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when workspace configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// The messaging transport rejected a lifecycle request.
    ///
    /// The connection stays registered; only its state change failed.
    #[error("Transport error on {key}: {message}")]
    Transport {
        /// Connection the request was made for.
        key: ConnectionKey,
        /// Description of the transport failure.
        message: String,
    },

    // ========================================================================
    // Subject Errors
    // ========================================================================
    /// Subject name or segment is not well formed.
    #[error("Invalid subject '{subject}': {reason}")]
    InvalidSubject {
        /// The offending subject text.
        subject: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Subject tree node does not exist (never created, or since removed).
    #[error("Subject node not found: {node_id}")]
    NodeNotFound {
        /// The missing node ID.
        node_id: NodeId,
    },

    /// Operation is not permitted on the root of the subject tree.
    #[error("Operation not permitted on the subject tree root")]
    RootNode,

    // ========================================================================
    // Persistence Errors
    // ========================================================================
    /// A persisted connection or subject record could not be read.
    ///
    /// Loading skips such records; this variant is reported per record.
    #[error("Malformed {kind} record: {message}")]
    MalformedRecord {
        /// Record kind (`connection` or `subject`).
        kind: &'static str,
        /// Description of the problem.
        message: String,
    },

    /// No project is open and no path was supplied.
    #[error("No project is open")]
    NoProject,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Atomic file replacement failed.
    #[error("Persist error: {0}")]
    TempFile(#[from] tempfile::PersistError),

    /// Blocking task panicked or was cancelled.
    #[error("Task failed: {0}")]
    TaskJoin(#[from] JoinError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a transport error for a connection.
    #[inline]
    pub fn transport(key: ConnectionKey, message: impl Into<String>) -> Self {
        Self::Transport {
            key,
            message: message.into(),
        }
    }

    /// Creates an invalid subject error.
    #[inline]
    pub fn invalid_subject(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSubject {
            subject: subject.into(),
            reason: reason.into(),
        }
    }

    /// Creates a node not found error.
    #[inline]
    pub fn node_not_found(node_id: NodeId) -> Self {
        Self::NodeNotFound { node_id }
    }

    /// Creates a malformed record error.
    #[inline]
    pub fn malformed_record(kind: &'static str, message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            kind,
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a transport error.
    #[inline]
    #[must_use]
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Returns `true` if this error concerns the subject tree.
    #[inline]
    #[must_use]
    pub fn is_subject_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidSubject { .. } | Self::NodeNotFound { .. } | Self::RootNode
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors leave registry and tree state intact.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Config { .. } | Self::TaskJoin(_))
    }
}

// ============================================================================
// Tests
// ============================================================================
