//! A single Rendezvous connection.
//!
//! [`Connection`] is a cheap, cloneable handle. Clones share state, so a
//! connection held by the registry and by a UI collaborator is the same
//! connection.
//!
//! # Locking
//!
//! Each connection guards its mutable data with its own mutex. The registry
//! may take a connection lock while holding the registry lock; a connection
//! never takes the registry lock while holding its own. Property handlers
//! and the registry re-sort run after the connection lock is released.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::error::Result;
use crate::identifiers::{ConnectionKey, HandlerId};
use crate::registry::ConnectionRegistry;
use crate::subject::SubjectName;

use super::state::{ConnectionState, Property};
use super::transport::Transport;

// ============================================================================
// Types
// ============================================================================

/// Property-change callback.
///
/// Called after the change has been applied, outside any connection lock.
pub type PropertyHandler = Arc<dyn Fn(&Connection, Property) + Send + Sync>;

/// Mutable connection data.
#[derive(Debug)]
struct ConnectionData {
    description: String,
    state: ConnectionState,
    subjects: Vec<SubjectName>,
}

/// Shared state behind a [`Connection`] handle.
struct ConnectionInner {
    key: ConnectionKey,
    transport: Arc<dyn Transport>,
    data: Mutex<ConnectionData>,
    parent: Mutex<Weak<ConnectionRegistry>>,
    handlers: Mutex<FxHashMap<HandlerId, PropertyHandler>>,
}

// ============================================================================
// Connection
// ============================================================================

/// A logical endpoint on the bus, identified by its [`ConnectionKey`].
///
/// Equality and hashing use the key only.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

// ============================================================================
// Connection - Constructors
// ============================================================================

impl Connection {
    /// Creates a stopped connection with no subjects.
    ///
    /// The description defaults to `service/network/daemon`.
    #[must_use]
    pub fn new(key: ConnectionKey, transport: Arc<dyn Transport>) -> Self {
        let description = key.to_string();
        Self::with_description(key, description, transport)
    }

    /// Creates a stopped connection with a description.
    #[must_use]
    pub fn with_description(
        key: ConnectionKey,
        description: impl Into<String>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            inner: Arc::new(ConnectionInner {
                key,
                transport,
                data: Mutex::new(ConnectionData {
                    description: description.into(),
                    state: ConnectionState::Stopped,
                    subjects: Vec::new(),
                }),
                parent: Mutex::new(Weak::new()),
                handlers: Mutex::new(FxHashMap::default()),
            }),
        }
    }
}

// ============================================================================
// Connection - Accessors
// ============================================================================

impl Connection {
    /// Returns the identity triple.
    #[inline]
    #[must_use]
    pub fn key(&self) -> &ConnectionKey {
        &self.inner.key
    }

    /// Returns the Rendezvous service parameter.
    #[inline]
    #[must_use]
    pub fn service(&self) -> &str {
        &self.inner.key.service
    }

    /// Returns the Rendezvous network parameter.
    #[inline]
    #[must_use]
    pub fn network(&self) -> &str {
        &self.inner.key.network
    }

    /// Returns the Rendezvous daemon parameter.
    #[inline]
    #[must_use]
    pub fn daemon(&self) -> &str {
        &self.inner.key.daemon
    }

    /// Returns the display description.
    #[must_use]
    pub fn description(&self) -> String {
        self.inner.data.lock().description.clone()
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.data.lock().state
    }

    /// Returns the subscribed subjects in insertion order.
    #[must_use]
    pub fn subjects(&self) -> Vec<String> {
        self.inner
            .data
            .lock()
            .subjects
            .iter()
            .map(|s| s.as_str().to_owned())
            .collect()
    }

    /// Returns `true` if any subscribed subject matches `subject`.
    #[must_use]
    pub fn listens_to(&self, subject: &SubjectName) -> bool {
        let data = self.inner.data.lock();
        data.subjects.iter().any(|pattern| pattern.matches(subject))
    }

    /// Returns `true` if both handles refer to the same connection object.
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Runs `f` with the description while holding the data lock.
    ///
    /// Used by the registry's comparator to avoid cloning.
    pub(crate) fn with_description_ref<R>(&self, f: impl FnOnce(&str) -> R) -> R {
        f(&self.inner.data.lock().description)
    }
}

// ============================================================================
// Connection - Lifecycle
// ============================================================================

impl Connection {
    /// Starts the connection, or resumes it if paused.
    ///
    /// Starting a started connection is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`](crate::Error::Transport) if the transport
    /// rejects the request; the state is left unchanged.
    pub fn start(&self) -> Result<()> {
        {
            let mut data = self.inner.data.lock();
            let outcome = match data.state {
                ConnectionState::Started => return Ok(()),
                ConnectionState::Paused => self.inner.transport.resume(&self.inner.key),
                ConnectionState::Stopped => {
                    let subjects: Vec<String> =
                        data.subjects.iter().map(|s| s.as_str().to_owned()).collect();
                    self.inner.transport.start(&self.inner.key, &subjects)
                }
            };
            if let Err(e) = outcome {
                warn!(key = %self.inner.key, error = %e, "Failed to start connection");
                return Err(e);
            }
            data.state = ConnectionState::Started;
        }

        debug!(key = %self.inner.key, "Connection started");
        self.notify(Property::State);
        Ok(())
    }

    /// Pauses a started connection. No-op in any other state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`](crate::Error::Transport) if the transport
    /// rejects the request; the state is left unchanged.
    pub fn pause(&self) -> Result<()> {
        {
            let mut data = self.inner.data.lock();
            if data.state != ConnectionState::Started {
                return Ok(());
            }
            if let Err(e) = self.inner.transport.pause(&self.inner.key) {
                warn!(key = %self.inner.key, error = %e, "Failed to pause connection");
                return Err(e);
            }
            data.state = ConnectionState::Paused;
        }

        debug!(key = %self.inner.key, "Connection paused");
        self.notify(Property::State);
        Ok(())
    }

    /// Stops the connection.
    ///
    /// Idempotent: stopping a stopped connection does nothing. The state is
    /// always `Stopped` afterwards, even if the transport reports a failure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`](crate::Error::Transport) if the transport
    /// failed to release its resources.
    pub fn stop(&self) -> Result<()> {
        let (changed, outcome) = self.stop_silently();
        if changed {
            self.notify(Property::State);
        }
        outcome
    }

    /// Stops without notifying handlers.
    ///
    /// Returns whether the state changed. The registry uses this while
    /// holding its write lock and calls [`Self::notify`] after releasing it.
    pub(crate) fn stop_silently(&self) -> (bool, Result<()>) {
        let outcome = {
            let mut data = self.inner.data.lock();
            if data.state == ConnectionState::Stopped {
                return (false, Ok(()));
            }
            data.state = ConnectionState::Stopped;
            self.inner.transport.stop(&self.inner.key)
        };

        if let Err(e) = &outcome {
            warn!(key = %self.inner.key, error = %e, "Transport failed while stopping connection");
        }
        debug!(key = %self.inner.key, "Connection stopped");
        (true, outcome)
    }
}

// ============================================================================
// Connection - Mutators
// ============================================================================

impl Connection {
    /// Changes the description.
    ///
    /// If the connection belongs to a registry, the registry re-positions it
    /// before handlers are notified.
    pub fn set_description(&self, description: impl Into<String>) {
        let description = description.into();
        {
            let mut data = self.inner.data.lock();
            if data.description == description {
                return;
            }
            data.description = description;
        }

        if let Some(registry) = self.parent() {
            registry.element_changed(self);
        }
        self.notify(Property::Description);
    }

    /// Adds a subject if it is not already present.
    ///
    /// Returns `Ok(false)` for a duplicate. On a started connection the
    /// transport is asked to listen on the new subject.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidSubject`](crate::Error::InvalidSubject) if the subject
    ///   is malformed
    /// - [`Error::Transport`](crate::Error::Transport) if the transport refused
    ///   the listener; the subject stays in the set and is picked up by the
    ///   next start
    pub fn add_subject(&self, subject: &str) -> Result<bool> {
        let parsed = SubjectName::parse(subject)?;

        let outcome = {
            let mut data = self.inner.data.lock();
            if data.subjects.iter().any(|s| s.as_str() == subject) {
                return Ok(false);
            }
            data.subjects.push(parsed);
            if data.state.is_active() {
                self.inner.transport.listen(&self.inner.key, subject)
            } else {
                Ok(())
            }
        };

        debug!(key = %self.inner.key, subject, "Subject added");
        self.notify(Property::Subjects);
        outcome.map(|()| true)
    }

    /// Removes a subject. Returns `false` if it was not present.
    pub fn remove_subject(&self, subject: &str) -> bool {
        {
            let mut data = self.inner.data.lock();
            let Some(index) = data.subjects.iter().position(|s| s.as_str() == subject) else {
                return false;
            };
            data.subjects.remove(index);
            if data.state.is_active()
                && let Err(e) = self.inner.transport.unlisten(&self.inner.key, subject)
            {
                warn!(key = %self.inner.key, subject, error = %e, "Failed to remove listener");
            }
        }

        debug!(key = %self.inner.key, subject, "Subject removed");
        self.notify(Property::Subjects);
        true
    }
}

// ============================================================================
// Connection - Registry Bookkeeping
// ============================================================================

impl Connection {
    /// Sets or clears the back-reference to the owning registry.
    ///
    /// Pure bookkeeping: this does not add the connection to, or remove it
    /// from, any collection. The registry calls it on add, remove and clear.
    pub fn set_parent_list(&self, registry: Option<&Arc<ConnectionRegistry>>) {
        let mut parent = self.inner.parent.lock();
        *parent = registry.map_or_else(Weak::new, Arc::downgrade);
    }

    /// Claims the connection for `registry` unless another live registry
    /// owns it. Check and set happen under one lock.
    ///
    /// Returns `true` if `registry` is now the parent.
    pub(crate) fn try_attach(&self, registry: &Arc<ConnectionRegistry>) -> bool {
        let mut parent = self.inner.parent.lock();
        if let Some(owner) = parent.upgrade()
            && !Arc::ptr_eq(&owner, registry)
        {
            return false;
        }
        *parent = Arc::downgrade(registry);
        true
    }

    /// Returns the owning registry, if any.
    #[must_use]
    pub fn parent(&self) -> Option<Arc<ConnectionRegistry>> {
        self.inner.parent.lock().upgrade()
    }

    /// Returns `true` if the connection belongs to a live registry.
    #[inline]
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.parent().is_some()
    }
}

// ============================================================================
// Connection - Property Handlers
// ============================================================================

impl Connection {
    /// Registers a property-change handler.
    pub fn on_change(&self, handler: PropertyHandler) -> HandlerId {
        let id = HandlerId::next();
        self.inner.handlers.lock().insert(id, handler);
        id
    }

    /// Removes a handler. Returns `false` if it was not registered.
    pub fn remove_handler(&self, id: HandlerId) -> bool {
        self.inner.handlers.lock().remove(&id).is_some()
    }

    /// Notifies handlers of a property change.
    pub(crate) fn notify(&self, property: Property) {
        let handlers: Vec<PropertyHandler> =
            self.inner.handlers.lock().values().cloned().collect();
        for handler in handlers {
            handler(self, property);
        }
    }
}

// ============================================================================
// Trait Implementations
// ============================================================================

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        self.inner.key == other.inner.key
    }
}

impl Eq for Connection {}

impl Hash for Connection {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.key.hash(state);
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.inner.data.lock();
        f.debug_struct("Connection")
            .field("key", &self.inner.key)
            .field("description", &data.description)
            .field("state", &data.state)
            .field("subjects", &data.subjects.len())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.inner.key)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::connection::transport::NullTransport;
    use crate::connection::transport::testing::{Call, RecordingTransport};

    fn key(service: &str) -> ConnectionKey {
        ConnectionKey::new(service, ";239.1.1.1", "tcp:7500")
    }

    fn recording() -> (Arc<RecordingTransport>, Connection) {
        let transport = Arc::new(RecordingTransport::default());
        let connection = Connection::new(key("7500"), transport.clone());
        (transport, connection)
    }

    #[test]
    fn test_new_connection_is_stopped() {
        let connection = Connection::new(key("7500"), NullTransport::shared());
        assert_eq!(connection.state(), ConnectionState::Stopped);
        assert_eq!(connection.description(), "7500/;239.1.1.1/tcp:7500");
        assert!(connection.subjects().is_empty());
        assert!(!connection.is_attached());
    }

    #[test]
    fn test_equality_uses_key_only() {
        let a = Connection::with_description(key("7500"), "A", NullTransport::shared());
        let b = Connection::with_description(key("7500"), "B", NullTransport::shared());
        let c = Connection::with_description(key("7501"), "A", NullTransport::shared());
        assert_eq!(a, b);
        assert!(!a.ptr_eq(&b));
        assert_ne!(a, c);
    }

    #[test]
    fn test_start_is_idempotent() {
        let (transport, connection) = recording();
        connection.start().expect("start");
        connection.start().expect("second start");
        assert_eq!(connection.state(), ConnectionState::Started);
        assert_eq!(transport.calls(), vec![Call::Start("7500".into(), 0)]);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let (transport, connection) = recording();
        connection.stop().expect("stop while stopped");
        assert!(transport.calls().is_empty());

        connection.start().expect("start");
        connection.stop().expect("stop");
        connection.stop().expect("stop again");
        assert_eq!(connection.state(), ConnectionState::Stopped);
        assert_eq!(
            transport.calls(),
            vec![Call::Start("7500".into(), 0), Call::Stop("7500".into())]
        );
    }

    #[test]
    fn test_pause_and_resume() {
        let (transport, connection) = recording();

        connection.pause().expect("pause while stopped");
        assert_eq!(connection.state(), ConnectionState::Stopped);

        connection.start().expect("start");
        connection.pause().expect("pause");
        assert_eq!(connection.state(), ConnectionState::Paused);

        connection.start().expect("resume");
        assert_eq!(connection.state(), ConnectionState::Started);
        assert_eq!(
            transport.calls(),
            vec![
                Call::Start("7500".into(), 0),
                Call::Pause("7500".into()),
                Call::Resume("7500".into()),
            ]
        );
    }

    #[test]
    fn test_failed_start_leaves_state() {
        let transport = Arc::new(RecordingTransport::failing_start());
        let connection = Connection::new(key("7500"), transport);

        let err = connection.start().unwrap_err();
        assert!(err.is_transport_error());
        assert_eq!(connection.state(), ConnectionState::Stopped);
    }

    #[test]
    fn test_failed_stop_still_stops() {
        let transport = Arc::new(RecordingTransport::failing_stop());
        let connection = Connection::new(key("7500"), transport);
        connection.start().expect("start");

        assert!(connection.stop().is_err());
        assert_eq!(connection.state(), ConnectionState::Stopped);
    }

    #[test]
    fn test_add_subject_dedups_in_order() {
        let (_, connection) = recording();
        assert!(connection.add_subject("B.X").expect("add"));
        assert!(connection.add_subject("A.>").expect("add"));
        assert!(!connection.add_subject("B.X").expect("dup"));
        assert_eq!(connection.subjects(), vec!["B.X", "A.>"]);
    }

    #[test]
    fn test_add_subject_rejects_malformed() {
        let (_, connection) = recording();
        assert!(connection.add_subject("A..B").is_err());
        assert!(connection.subjects().is_empty());
    }

    #[test]
    fn test_subjects_follow_transport_when_started() {
        let (transport, connection) = recording();
        connection.add_subject("A.B").expect("add");
        connection.start().expect("start");
        connection.add_subject("C.D").expect("add");
        assert!(connection.remove_subject("A.B"));
        assert!(!connection.remove_subject("A.B"));

        assert_eq!(
            transport.calls(),
            vec![
                Call::Start("7500".into(), 1),
                Call::Listen("7500".into(), "C.D".into()),
                Call::Unlisten("7500".into(), "A.B".into()),
            ]
        );
    }

    #[test]
    fn test_listens_to_wildcards() {
        let (_, connection) = recording();
        connection.add_subject("ORDERS.>").expect("add");
        let hit = SubjectName::parse("ORDERS.EU.NEW").expect("subject");
        let miss = SubjectName::parse("TRADES.EU").expect("subject");
        assert!(connection.listens_to(&hit));
        assert!(!connection.listens_to(&miss));
    }

    #[test]
    fn test_listens_to_matches_each_stored_pattern() {
        let (_, connection) = recording();
        connection.add_subject("PRICES.*.EUR").expect("add");
        connection.add_subject("ORDERS.EU").expect("add");
        assert!(connection.listens_to(&SubjectName::parse("PRICES.GB.EUR").expect("subject")));
        assert!(connection.listens_to(&SubjectName::parse("ORDERS.EU").expect("subject")));
        assert!(!connection.listens_to(&SubjectName::parse("PRICES.GB.USD").expect("subject")));

        assert!(connection.remove_subject("PRICES.*.EUR"));
        assert!(!connection.listens_to(&SubjectName::parse("PRICES.GB.EUR").expect("subject")));
        assert_eq!(connection.subjects(), vec!["ORDERS.EU"]);
    }

    #[test]
    fn test_try_attach_refuses_other_live_registry() {
        let bus = Arc::new(crate::events::EventBus::new());
        let first = ConnectionRegistry::new(Arc::clone(&bus));
        let second = ConnectionRegistry::new(bus);
        let connection = Connection::new(key("7500"), NullTransport::shared());

        assert!(connection.try_attach(&first));
        assert!(connection.try_attach(&first));
        assert!(!connection.try_attach(&second));
        assert!(Arc::ptr_eq(&connection.parent().expect("parent"), &first));

        drop(first);
        assert!(connection.try_attach(&second));
        assert!(Arc::ptr_eq(&connection.parent().expect("parent"), &second));
    }

    #[test]
    fn test_handlers_fire_and_unregister() {
        let (_, connection) = recording();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let id = connection.on_change(Arc::new(move |_, property| {
            if property == Property::State {
                seen.fetch_add(1, Ordering::SeqCst);
            }
        }));

        connection.start().expect("start");
        connection.stop().expect("stop");
        assert_eq!(count.load(Ordering::SeqCst), 2);

        assert!(connection.remove_handler(id));
        connection.start().expect("start");
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_handler_may_read_connection() {
        let (_, connection) = recording();
        let observed = Arc::new(Mutex::new(String::new()));
        let sink = Arc::clone(&observed);
        connection.on_change(Arc::new(move |c, _| {
            *sink.lock() = c.description();
        }));

        connection.set_description("Renamed");
        assert_eq!(*observed.lock(), "Renamed");
    }
}
