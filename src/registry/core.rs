//! Sorted, de-duplicated, observable collection of connections.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │            ConnectionRegistry                │
//! │  RwLock<Vec<Connection>> (description order) │
//! │  ┌────────────────────────────────────────┐  │
//! │  │ "Desc A" → 7501/;239.1.1.1/tcp:7500    │  │
//! │  │ "Desc B" → 7500/;239.1.1.1/tcp:7500    │  │
//! │  └────────────────────────────────────────┘  │
//! └──────────────┬───────────────────────────────┘
//!                │ publish (after unlock)
//!                ▼
//!            EventBus
//! ```
//!
//! # Locking
//!
//! One reader/writer lock guards the collection. Every mutation holds the
//! write lock for its whole check-and-modify sequence, so adds, removes and
//! clears are linearizable. Events and connection property handlers run
//! after the lock is released; a subscriber may therefore call back into
//! the registry. Event delivery order between two threads mutating at once
//! is not guaranteed to match lock order.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::connection::{Connection, Property};
use crate::events::{ConnectionCreated, ConnectionDestroyed, EventBus, EventSubscriber, ProjectClosing};
use crate::identifiers::{ConnectionKey, RegistryId};

use super::collation;

// ============================================================================
// ConnectionRegistry
// ============================================================================

/// The registry of known connections.
///
/// Thread-safe; any method may be called from any thread. Construct one per
/// workspace and pass it to collaborators explicitly.
///
/// # Example
///
/// ```ignore
/// let registry = ConnectionRegistry::new(bus);
/// let connection = Connection::with_description(key, "Desc A", transport);
///
/// assert!(registry.add(connection.clone()));
/// assert!(!registry.add(connection.clone())); // duplicate
/// assert!(registry.remove(&connection));
/// ```
pub struct ConnectionRegistry {
    /// Identifies this registry in events.
    id: RegistryId,

    /// Members in description order.
    connections: RwLock<Vec<Connection>>,

    /// Where membership events are published.
    bus: Arc<EventBus>,
}

// ============================================================================
// ConnectionRegistry - Constructor
// ============================================================================

impl ConnectionRegistry {
    /// Creates an empty registry publishing on `bus`.
    ///
    /// The registry does not subscribe itself; the owner subscribes it for
    /// `ProjectClosing` if the registry should clear with the project.
    #[must_use]
    pub fn new(bus: Arc<EventBus>) -> Arc<Self> {
        let id = RegistryId::next();
        debug!(registry = %id, "ConnectionRegistry created");
        Arc::new(Self {
            id,
            connections: RwLock::new(Vec::new()),
            bus,
        })
    }

    /// Returns this registry's ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> RegistryId {
        self.id
    }
}

// ============================================================================
// ConnectionRegistry - Mutation
// ============================================================================

impl ConnectionRegistry {
    /// Adds a connection unless one with the same identity is present.
    ///
    /// On success the connection's parent is set, it is inserted in
    /// description order, and [`ConnectionCreated`] is published once the
    /// lock is released. A connection still attached to another live
    /// registry is refused.
    ///
    /// Returns `false` without side effects if the connection was not added.
    pub fn add(self: &Arc<Self>, connection: Connection) -> bool {
        {
            let mut connections = self.connections.write();

            if connections.iter().any(|c| c == &connection) {
                info!(%connection, "Ignoring attempt to add duplicate connection");
                return false;
            }

            if !connection.try_attach(self) {
                warn!(%connection, registry = %self.id, "Connection belongs to another registry");
                return false;
            }

            info!(%connection, registry = %self.id, "Adding connection");
            let index = insertion_point(&connections, &connection.description());
            connections.insert(index, connection.clone());
            debug_assert!(is_sorted(&connections), "registry order violated by add");
        }

        self.bus.publish(ConnectionCreated {
            registry: self.id,
            connection,
        });
        true
    }

    /// Removes a connection.
    ///
    /// The registered connection is stopped and detached before removal, and
    /// [`ConnectionDestroyed`] is published once the lock is released.
    /// Transport failures while stopping are logged and do not prevent
    /// removal.
    ///
    /// Returns `false` if no connection with this identity is present.
    pub fn remove(&self, connection: &Connection) -> bool {
        let (removed, changed) = {
            let mut connections = self.connections.write();
            let Some(index) = connections.iter().position(|c| c == connection) else {
                debug!(%connection, "Ignoring attempt to remove absent connection");
                return false;
            };

            let removed = connections.remove(index);
            info!(connection = %removed, registry = %self.id, "Removing connection");
            let (changed, _) = removed.stop_silently();
            removed.set_parent_list(None);
            (removed, changed)
        };

        if changed {
            removed.notify(Property::State);
        }
        self.bus.publish(ConnectionDestroyed {
            registry: self.id,
            connection: removed,
        });
        true
    }

    /// Removes every connection in current order, stopping and detaching
    /// each, then publishes [`ConnectionDestroyed`] for each.
    pub fn clear(&self) {
        let drained: Vec<(Connection, bool)> = {
            let mut connections = self.connections.write();
            connections
                .drain(..)
                .map(|connection| {
                    info!(%connection, registry = %self.id, "Removing connection");
                    let (changed, _) = connection.stop_silently();
                    connection.set_parent_list(None);
                    (connection, changed)
                })
                .collect()
        };

        if !drained.is_empty() {
            debug!(registry = %self.id, count = drained.len(), "Registry cleared");
        }

        for (connection, changed) in drained {
            if changed {
                connection.notify(Property::State);
            }
            self.bus.publish(ConnectionDestroyed {
                registry: self.id,
                connection,
            });
        }
    }

    /// Re-positions a member whose description changed.
    ///
    /// Called by [`Connection::set_description`]; does nothing if the
    /// connection is not a member.
    pub fn element_changed(&self, connection: &Connection) {
        let mut connections = self.connections.write();
        let Some(index) = connections.iter().position(|c| c.ptr_eq(connection)) else {
            return;
        };

        let member = connections.remove(index);
        let target = insertion_point(&connections, &member.description());
        connections.insert(target, member);
        debug_assert!(is_sorted(&connections), "registry order violated by re-sort");

        if target != index {
            debug!(%connection, from = index, to = target, "Connection re-sorted");
        }
    }
}

// ============================================================================
// ConnectionRegistry - Queries
// ============================================================================

impl ConnectionRegistry {
    /// Looks up a connection by its identity triple.
    #[must_use]
    pub fn get(&self, service: &str, network: &str, daemon: &str) -> Option<Connection> {
        self.connections
            .read()
            .iter()
            .find(|c| c.key().matches(service, network, daemon))
            .cloned()
    }

    /// Looks up a connection by key.
    #[must_use]
    pub fn get_by_key(&self, key: &ConnectionKey) -> Option<Connection> {
        self.get(&key.service, &key.network, &key.daemon)
    }

    /// Returns `true` if a connection with this identity is present.
    #[must_use]
    pub fn contains(&self, connection: &Connection) -> bool {
        self.connections.read().iter().any(|c| c == connection)
    }

    /// Returns the number of connections.
    #[must_use]
    pub fn size(&self) -> usize {
        self.connections.read().len()
    }

    /// Returns `true` if the registry has no connections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }

    /// Returns a snapshot of all connections in description order.
    #[must_use]
    pub fn to_array(&self) -> Vec<Connection> {
        self.connections.read().clone()
    }

    /// Runs `f` over the members while holding the read lock.
    ///
    /// The slice cannot escape `f`. Calling a mutating registry method from
    /// inside `f` deadlocks.
    pub fn with_connections<R>(&self, f: impl FnOnce(&[Connection]) -> R) -> R {
        let connections = self.connections.read();
        f(&connections)
    }
}

// ============================================================================
// ConnectionRegistry - Event Handlers
// ============================================================================

impl EventSubscriber for ConnectionRegistry {
    fn on_project_closing(&self, _event: &ProjectClosing) {
        self.clear();
    }
}

impl fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("id", &self.id)
            .field("size", &self.size())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Ordering Helpers
// ============================================================================

/// Index after every member that sorts at or before `description`.
fn insertion_point(connections: &[Connection], description: &str) -> usize {
    connections.partition_point(|c| {
        c.with_description_ref(|d| collation::compare(d, description).is_le())
    })
}

/// Checks the order invariant.
fn is_sorted(connections: &[Connection]) -> bool {
    let descriptions: Vec<String> = connections.iter().map(Connection::description).collect();
    descriptions
        .windows(2)
        .all(|pair| collation::compare(&pair[0], &pair[1]).is_le())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::thread;

    use parking_lot::Mutex;
    use proptest::prelude::*;

    use super::*;
    use crate::connection::transport::testing::{Call, RecordingTransport};
    use crate::connection::{ConnectionState, NullTransport};

    fn connection(service: &str, description: &str) -> Connection {
        Connection::with_description(
            ConnectionKey::new(service, "net1", "daemon1"),
            description,
            NullTransport::shared(),
        )
    }

    fn registry() -> Arc<ConnectionRegistry> {
        ConnectionRegistry::new(Arc::new(EventBus::new()))
    }

    fn descriptions(registry: &ConnectionRegistry) -> Vec<String> {
        registry.to_array().iter().map(Connection::description).collect()
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    impl EventSubscriber for Recorder {
        fn on_connection_created(&self, event: &ConnectionCreated) {
            self.seen
                .lock()
                .push(format!("created {}", event.connection.service()));
        }

        fn on_connection_destroyed(&self, event: &ConnectionDestroyed) {
            assert!(!event.connection.is_attached());
            assert_eq!(event.connection.state(), ConnectionState::Stopped);
            self.seen
                .lock()
                .push(format!("destroyed {}", event.connection.service()));
        }
    }

    #[test]
    fn test_duplicate_add_is_rejected() {
        let registry = registry();
        let first = connection("svc1", "First");
        let second = connection("svc1", "Second");

        assert!(registry.add(first.clone()));
        assert!(!registry.add(second.clone()));
        assert_eq!(registry.size(), 1);
        assert!(registry.to_array()[0].ptr_eq(&first));
        assert!(!second.is_attached());
    }

    #[test]
    fn test_example_scenario() {
        let registry = registry();
        registry.add(connection("svc1", "Desc B"));
        registry.add(connection("svc2", "Desc A"));

        assert_eq!(descriptions(&registry), vec!["Desc A", "Desc B"]);

        let desc_a = registry.get("svc2", "net1", "daemon1").expect("present");
        assert!(registry.remove(&desc_a));
        assert!(registry.get("svc2", "net1", "daemon1").is_none());
        assert_eq!(registry.size(), 1);
    }

    #[test]
    fn test_add_sets_parent_and_remove_clears_it() {
        let registry = registry();
        let c = connection("svc1", "A");

        registry.add(c.clone());
        let parent = c.parent().expect("attached");
        assert!(Arc::ptr_eq(&parent, &registry));

        assert!(registry.remove(&c));
        assert!(!c.is_attached());
        assert!(!registry.remove(&c));
    }

    #[test]
    fn test_connection_owned_by_one_registry() {
        let a = registry();
        let b = registry();
        let c = connection("svc1", "A");

        assert!(a.add(c.clone()));
        assert!(!b.add(c.clone()));
        assert!(a.remove(&c));
        assert!(b.add(c));
    }

    #[test]
    fn test_remove_stops_connection() {
        let transport = Arc::new(RecordingTransport::default());
        let c = Connection::with_description(
            ConnectionKey::new("svc1", "net1", "daemon1"),
            "A",
            transport.clone(),
        );
        let registry = registry();
        registry.add(c.clone());
        c.start().expect("start");

        assert!(registry.remove(&c));
        assert_eq!(c.state(), ConnectionState::Stopped);
        assert_eq!(
            transport.calls(),
            vec![Call::Start("svc1".into(), 0), Call::Stop("svc1".into())]
        );
    }

    #[test]
    fn test_remove_survives_transport_failure() {
        let transport = Arc::new(RecordingTransport::failing_stop());
        let c = Connection::with_description(
            ConnectionKey::new("svc1", "net1", "daemon1"),
            "A",
            transport,
        );
        let registry = registry();
        registry.add(c.clone());
        c.start().expect("start");

        assert!(registry.remove(&c));
        assert!(registry.is_empty());
        assert_eq!(c.state(), ConnectionState::Stopped);
    }

    #[test]
    fn test_clear_stops_and_detaches_all() {
        let registry = registry();
        let members: Vec<Connection> = (0..5)
            .map(|i| connection(&format!("svc{i}"), &format!("Desc {i}")))
            .collect();
        for c in &members {
            registry.add(c.clone());
            c.start().expect("start");
        }

        registry.clear();

        assert_eq!(registry.size(), 0);
        for c in &members {
            assert_eq!(c.state(), ConnectionState::Stopped);
            assert!(!c.is_attached());
        }
    }

    #[test]
    fn test_events_published_outside_lock() {
        let bus = Arc::new(EventBus::new());
        let registry = ConnectionRegistry::new(Arc::clone(&bus));
        let recorder = Arc::new(Recorder::default());
        bus.subscribe(&recorder);

        let c = connection("svc1", "A");
        registry.add(c.clone());
        registry.add(c.clone());
        registry.remove(&c);
        registry.add(connection("svc2", "B"));
        registry.clear();

        assert_eq!(
            *recorder.seen.lock(),
            vec!["created svc1", "destroyed svc1", "created svc2", "destroyed svc2"]
        );
    }

    #[test]
    fn test_subscriber_may_call_back_into_registry() {
        struct Reader {
            registry: Mutex<Option<Arc<ConnectionRegistry>>>,
            sizes: Mutex<Vec<usize>>,
        }

        impl EventSubscriber for Reader {
            fn on_connection_created(&self, _event: &ConnectionCreated) {
                if let Some(registry) = self.registry.lock().as_ref() {
                    self.sizes.lock().push(registry.size());
                }
            }
        }

        let bus = Arc::new(EventBus::new());
        let registry = ConnectionRegistry::new(Arc::clone(&bus));
        let reader = Arc::new(Reader {
            registry: Mutex::new(Some(Arc::clone(&registry))),
            sizes: Mutex::new(Vec::new()),
        });
        bus.subscribe(&reader);

        registry.add(connection("svc1", "A"));
        registry.add(connection("svc2", "B"));

        assert_eq!(*reader.sizes.lock(), vec![1, 2]);
    }

    #[test]
    fn test_project_closing_clears_subscribed_registry() {
        let bus = Arc::new(EventBus::new());
        let registry = ConnectionRegistry::new(Arc::clone(&bus));
        bus.subscribe(&registry);
        registry.add(connection("svc1", "A"));

        bus.publish(ProjectClosing { path: None });

        assert!(registry.is_empty());
    }

    #[test]
    fn test_description_change_resorts() {
        let registry = registry();
        let a = connection("svc1", "Alpha");
        registry.add(a.clone());
        registry.add(connection("svc2", "Beta"));
        registry.add(connection("svc3", "Gamma"));

        a.set_description("Zulu");
        assert_eq!(descriptions(&registry), vec!["Beta", "Gamma", "Zulu"]);

        a.set_description("Delta");
        assert_eq!(descriptions(&registry), vec!["Beta", "Delta", "Gamma"]);
    }

    #[test]
    fn test_detached_description_change_does_not_touch_registry() {
        let registry = registry();
        let a = connection("svc1", "Alpha");
        registry.add(a.clone());
        registry.add(connection("svc2", "Beta"));
        registry.remove(&a);

        a.set_description("Aardvark");
        assert_eq!(descriptions(&registry), vec!["Beta"]);
    }

    #[test]
    fn test_with_connections_scoped_read() {
        let registry = registry();
        registry.add(connection("svc1", "B"));
        registry.add(connection("svc2", "A"));

        let services: Vec<String> =
            registry.with_connections(|cs| cs.iter().map(|c| c.service().to_owned()).collect());
        assert_eq!(services, vec!["svc2", "svc1"]);
    }

    #[test]
    fn test_concurrent_distinct_adds_all_succeed() {
        let registry = registry();
        let threads = 8;
        let per_thread = 25;
        let barrier = Barrier::new(threads);

        thread::scope(|scope| {
            for t in 0..threads {
                let registry = &registry;
                let barrier = &barrier;
                scope.spawn(move || {
                    barrier.wait();
                    for i in 0..per_thread {
                        let c = connection(&format!("svc{t}-{i}"), &format!("Desc {t}-{i}"));
                        assert!(registry.add(c));
                    }
                });
            }
        });

        assert_eq!(registry.size(), threads * per_thread);
        assert!(is_sorted(&registry.to_array()));
    }

    #[test]
    fn test_concurrent_same_identity_adds_once() {
        let registry = registry();
        let threads = 8;
        let barrier = Barrier::new(threads);
        let successes = Mutex::new(0usize);

        thread::scope(|scope| {
            for t in 0..threads {
                let registry = &registry;
                let barrier = &barrier;
                let successes = &successes;
                scope.spawn(move || {
                    barrier.wait();
                    if registry.add(connection("shared", &format!("Copy {t}"))) {
                        *successes.lock() += 1;
                    }
                });
            }
        });

        assert_eq!(*successes.lock(), 1);
        assert_eq!(registry.size(), 1);
    }

    #[test]
    fn test_concurrent_adds_to_two_registries_attach_once() {
        for round in 0..64 {
            let a = registry();
            let b = registry();
            let c = connection("shared", &format!("Round {round}"));
            let barrier = Barrier::new(2);

            let (in_a, in_b) = thread::scope(|scope| {
                let first = scope.spawn(|| {
                    barrier.wait();
                    a.add(c.clone())
                });
                let second = scope.spawn(|| {
                    barrier.wait();
                    b.add(c.clone())
                });
                (
                    first.join().unwrap_or(false),
                    second.join().unwrap_or(false),
                )
            });

            assert!(in_a ^ in_b, "round {round}: a={in_a} b={in_b}");
            assert_eq!(a.size() + b.size(), 1);
            let owner = c.parent().unwrap();
            assert!(Arc::ptr_eq(&owner, if in_a { &a } else { &b }));
        }
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(u8, String),
        Remove(u8),
        Rename(u8, String),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..16, "[a-zA-Zé ]{0,8}").prop_map(|(s, d)| Op::Add(s, d)),
            (0u8..16).prop_map(Op::Remove),
            (0u8..16, "[a-zA-Zé ]{0,8}").prop_map(|(s, d)| Op::Rename(s, d)),
        ]
    }

    proptest! {
        #[test]
        fn prop_always_sorted_and_unique(ops in prop::collection::vec(op(), 0..64)) {
            let registry = registry();
            for op in ops {
                match op {
                    Op::Add(s, d) => {
                        registry.add(connection(&format!("svc{s}"), &d));
                    }
                    Op::Remove(s) => {
                        registry.remove(&connection(&format!("svc{s}"), ""));
                    }
                    Op::Rename(s, d) => {
                        if let Some(c) = registry.get(&format!("svc{s}"), "net1", "daemon1") {
                            c.set_description(d);
                        }
                    }
                }

                let snapshot = registry.to_array();
                prop_assert!(is_sorted(&snapshot));
                for (i, a) in snapshot.iter().enumerate() {
                    prop_assert!(snapshot[i + 1..].iter().all(|b| a != b));
                }
            }
        }
    }
}
