//! Connection lifecycle state and observable properties.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of a connection.
///
/// ```text
///            start()              pause()
/// Stopped ───────────► Started ───────────► Paused
///    ▲                  │  ▲                  │
///    └──── stop() ──────┘  └───── start() ────┘
///    ▲                                        │
///    └───────────────── stop() ───────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// Not listening. Every connection starts here.
    #[default]
    Stopped,
    /// Listening and delivering messages.
    Started,
    /// Listening but holding delivery.
    Paused,
}

impl ConnectionState {
    /// Returns `true` if the transport holds resources for this connection.
    #[inline]
    #[must_use]
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Stopped)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stopped => "stopped",
            Self::Started => "started",
            Self::Paused => "paused",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Property
// ============================================================================

/// A connection property whose change is reported to handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    /// The display description (also the registry sort key).
    Description,
    /// The lifecycle state.
    State,
    /// The subscribed subject set.
    Subjects,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_stopped() {
        assert_eq!(ConnectionState::default(), ConnectionState::Stopped);
        assert!(!ConnectionState::Stopped.is_active());
        assert!(ConnectionState::Paused.is_active());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&ConnectionState::Paused).expect("serialize");
        assert_eq!(json, "\"paused\"");
    }
}
