//! Type-safe identifiers.
//!
//! Newtype wrappers prevent mixing incompatible IDs at compile time.
//!
//! | Type | Backing | Scope |
//! |------|---------|-------|
//! | [`ConnectionKey`] | service/network/daemon triple | connection identity |
//! | [`RegistryId`] | `u64` counter | one per registry instance |
//! | [`NodeId`] | `u64` counter | one per subject tree node, never reused |
//! | [`HandlerId`] | `u64` counter | property-change handler registration |
//! | [`SubscriptionId`] | UUID v4 | event bus subscription |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Counters
// ============================================================================

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

// ============================================================================
// ConnectionKey
// ============================================================================

/// Identity of a connection: the Rendezvous `(service, network, daemon)`
/// triple.
///
/// Two connections are the same connection iff their keys are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionKey {
    /// Rendezvous service parameter.
    pub service: String,
    /// Rendezvous network parameter.
    pub network: String,
    /// Rendezvous daemon parameter.
    pub daemon: String,
}

impl ConnectionKey {
    /// Creates a key from its three parts.
    #[inline]
    #[must_use]
    pub fn new(
        service: impl Into<String>,
        network: impl Into<String>,
        daemon: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            network: network.into(),
            daemon: daemon.into(),
        }
    }

    /// Returns `true` if this key has the given parts.
    #[inline]
    #[must_use]
    pub fn matches(&self, service: &str, network: &str, daemon: &str) -> bool {
        self.service == service && self.network == network && self.daemon == daemon
    }
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.service, self.network, self.daemon)
    }
}

// ============================================================================
// Counter-backed IDs
// ============================================================================

macro_rules! counter_id {
    ($(#[$meta:meta])* $name:ident, $counter:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            /// Allocates the next unused ID.
            #[inline]
            #[must_use]
            pub fn next() -> Self {
                Self($counter.fetch_add(1, Ordering::Relaxed))
            }

            /// Returns the raw value.
            #[inline]
            #[must_use]
            pub fn as_u64(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "-{}"), self.0)
            }
        }
    };
}

counter_id!(
    /// Identifies a [`ConnectionRegistry`](crate::ConnectionRegistry) instance
    /// in events.
    RegistryId,
    NEXT_REGISTRY_ID,
    "registry"
);

counter_id!(
    /// Identifies a node in a [`SubjectHierarchy`](crate::SubjectHierarchy).
    ///
    /// IDs are never reused, so a stale ID cannot alias a newer node.
    NodeId,
    NEXT_NODE_ID,
    "node"
);

counter_id!(
    /// Identifies a property-change handler on a connection.
    HandlerId,
    NEXT_HANDLER_ID,
    "handler"
);

// ============================================================================
// SubscriptionId
// ============================================================================

/// Identifies an event bus subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Generates a new random subscription ID.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[inline]
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_key_equality() {
        let a = ConnectionKey::new("7500", "", "tcp:7500");
        let b = ConnectionKey::new("7500", "", "tcp:7500");
        let c = ConnectionKey::new("7501", "", "tcp:7500");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.matches("7500", "", "tcp:7500"));
        assert!(!a.matches("7500", "x", "tcp:7500"));
    }

    #[test]
    fn test_node_ids_are_unique() {
        let a = NodeId::next();
        let b = NodeId::next();
        assert_ne!(a, b);
        assert!(b.as_u64() > a.as_u64());
    }

    #[test]
    fn test_display_prefixes() {
        let id = RegistryId::next();
        assert!(id.to_string().starts_with("registry-"));
        assert!(HandlerId::next().to_string().starts_with("handler-"));
    }

    #[test]
    fn test_subscription_ids_differ() {
        assert_ne!(SubscriptionId::generate(), SubscriptionId::generate());
    }
}
