//! Messaging transport seam.
//!
//! The vendor SDK is an external collaborator. A [`Transport`] receives
//! lifecycle requests for a connection and submits them to its own I/O
//! machinery; it must return without waiting for that work to finish.
//! Connections call the transport while holding their own state lock, so
//! implementations must not call back into the connection.

// ============================================================================
// Imports
// ============================================================================

use std::sync::{Arc, LazyLock};

use tracing::trace;

use crate::error::Result;
use crate::identifiers::ConnectionKey;

// ============================================================================
// Transport
// ============================================================================

/// Submits connection lifecycle requests to the messaging bus.
///
/// Failures are reported as [`Error::Transport`](crate::Error::Transport).
pub trait Transport: Send + Sync {
    /// Opens a transport for `key` and listens on every subject.
    fn start(&self, key: &ConnectionKey, subjects: &[String]) -> Result<()>;

    /// Releases everything held for `key`.
    fn stop(&self, key: &ConnectionKey) -> Result<()>;

    /// Holds message delivery for `key`.
    fn pause(&self, key: &ConnectionKey) -> Result<()> {
        trace!(%key, "pause not supported by transport, ignoring");
        Ok(())
    }

    /// Resumes delivery for a paused `key`.
    fn resume(&self, key: &ConnectionKey) -> Result<()> {
        trace!(%key, "resume not supported by transport, ignoring");
        Ok(())
    }

    /// Adds a listener on a started connection.
    fn listen(&self, key: &ConnectionKey, subject: &str) -> Result<()> {
        trace!(%key, subject, "listen not supported by transport, ignoring");
        Ok(())
    }

    /// Removes a listener from a started connection.
    fn unlisten(&self, key: &ConnectionKey, subject: &str) -> Result<()> {
        trace!(%key, subject, "unlisten not supported by transport, ignoring");
        Ok(())
    }
}

// ============================================================================
// NullTransport
// ============================================================================

static SHARED_NULL: LazyLock<Arc<NullTransport>> = LazyLock::new(|| Arc::new(NullTransport));

/// Transport that accepts every request and does nothing.
///
/// Used when no bus is attached, e.g. when editing a project offline.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTransport;

impl NullTransport {
    /// Returns a shared instance.
    #[must_use]
    pub fn shared() -> Arc<dyn Transport> {
        SHARED_NULL.clone()
    }
}

impl Transport for NullTransport {
    fn start(&self, key: &ConnectionKey, subjects: &[String]) -> Result<()> {
        trace!(%key, subjects = subjects.len(), "null transport start");
        Ok(())
    }

    fn stop(&self, key: &ConnectionKey) -> Result<()> {
        trace!(%key, "null transport stop");
        Ok(())
    }
}

// ============================================================================
// Test Support
// ============================================================================
