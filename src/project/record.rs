//! Persisted record types.
//!
//! # Project document
//!
//! ```json
//! {
//!   "connections": [
//!     { "description": "Prices", "service": "7500", "network": ";239.1.1.1",
//!       "daemon": "tcp:7500", "subjects": ["PRICES.>"] }
//!   ],
//!   "subjects": [
//!     { "name": "PRICES", "selected": true, "expanded": false,
//!       "children": [ { "name": "EU" } ] }
//!   ]
//! }
//! ```
//!
//! `selected` and `expanded` default to `true`; `description` defaults to the
//! connection key. A standalone connection list file has only the
//! `connections` member.
//!
//! # Lenient parsing
//!
//! [`ProjectDocument::parse`] and [`ConnectionList::parse`] skip malformed
//! entries instead of failing the whole file. A subject entry that cannot be
//! read is dropped together with its children; its valid siblings survive.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::connection::{Connection, Transport};
use crate::error::{Error, Result};
use crate::identifiers::ConnectionKey;

// ============================================================================
// ConnectionRecord
// ============================================================================

/// One persisted connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    /// Display description; empty means "use the key".
    #[serde(default)]
    pub description: String,
    /// Rendezvous service parameter.
    pub service: String,
    /// Rendezvous network parameter.
    pub network: String,
    /// Rendezvous daemon parameter.
    pub daemon: String,
    /// Subjects the connection listens to.
    #[serde(default)]
    pub subjects: Vec<String>,
}

impl ConnectionRecord {
    /// Captures the persistent state of a connection.
    #[must_use]
    pub fn from_connection(connection: &Connection) -> Self {
        let key = connection.key();
        Self {
            description: connection.description(),
            service: key.service.clone(),
            network: key.network.clone(),
            daemon: key.daemon.clone(),
            subjects: connection.subjects(),
        }
    }

    /// Returns the identity of the recorded connection.
    #[must_use]
    pub fn key(&self) -> ConnectionKey {
        ConnectionKey::new(&self.service, &self.network, &self.daemon)
    }

    /// Builds a stopped connection from this record.
    ///
    /// Subjects that fail validation are skipped with a warning; the count
    /// of skipped subjects is returned alongside the connection.
    #[must_use]
    pub fn to_connection(&self, transport: Arc<dyn Transport>) -> (Connection, usize) {
        let key = self.key();
        let connection = if self.description.is_empty() {
            Connection::new(key, transport)
        } else {
            Connection::with_description(key, self.description.clone(), transport)
        };

        let mut skipped = 0;
        for subject in &self.subjects {
            if let Err(e) = connection.add_subject(subject) {
                warn!(connection = %connection.key(), error = %e, "Skipping connection subject");
                skipped += 1;
            }
        }
        (connection, skipped)
    }
}

// ============================================================================
// SubjectRecord
// ============================================================================

/// One persisted subject tree node and its descendants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectRecord {
    /// Segment name.
    pub name: String,
    /// Selection flag.
    #[serde(default = "default_true")]
    pub selected: bool,
    /// Expansion flag.
    #[serde(default = "default_true")]
    pub expanded: bool,
    /// Child nodes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SubjectRecord>,
}

const fn default_true() -> bool {
    true
}

impl SubjectRecord {
    /// Creates a selected, expanded leaf record.
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selected: true,
            expanded: true,
            children: Vec::new(),
        }
    }

    /// Appends a child record.
    #[inline]
    #[must_use]
    pub fn with_child(mut self, child: SubjectRecord) -> Self {
        self.children.push(child);
        self
    }
}

// ============================================================================
// ProjectDocument
// ============================================================================

/// Result of parsing a file leniently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed<T> {
    /// Everything that could be read.
    pub value: T,
    /// Number of entries that were dropped.
    pub skipped: usize,
}

/// Persisted project: connections plus the subject tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDocument {
    /// Connections in display order.
    #[serde(default)]
    pub connections: Vec<ConnectionRecord>,
    /// Top-level subject nodes.
    #[serde(default)]
    pub subjects: Vec<SubjectRecord>,
}

impl ProjectDocument {
    /// Parses a project document, skipping malformed entries.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the text is not JSON at all
    /// - [`Error::MalformedRecord`] if the top level is not an object
    pub fn parse(text: &str) -> Result<Parsed<Self>> {
        let root = parse_object(text, "project")?;
        let mut skipped = 0;
        let connections = connection_records(root.get("connections"), &mut skipped);
        let subjects = match root.get("subjects") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| subject_record(item, &mut skipped))
                .collect(),
            Some(other) => {
                warn!(found = json_kind(other), "Ignoring subjects member");
                skipped += 1;
                Vec::new()
            }
        };
        Ok(Parsed {
            value: Self {
                connections,
                subjects,
            },
            skipped,
        })
    }
}

// ============================================================================
// ConnectionList
// ============================================================================

/// Standalone connection list file, used for import and export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionList {
    /// Exported connections.
    #[serde(default)]
    pub connections: Vec<ConnectionRecord>,
}

impl ConnectionList {
    /// Parses a connection list, skipping malformed entries.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the text is not JSON at all
    /// - [`Error::MalformedRecord`] if the top level is not an object
    pub fn parse(text: &str) -> Result<Parsed<Self>> {
        let root = parse_object(text, "connection list")?;
        let mut skipped = 0;
        let connections = connection_records(root.get("connections"), &mut skipped);
        Ok(Parsed {
            value: Self { connections },
            skipped,
        })
    }
}

// ============================================================================
// Lenient helpers
// ============================================================================

fn parse_object(text: &str, kind: &'static str) -> Result<serde_json::Map<String, Value>> {
    match serde_json::from_str::<Value>(text)? {
        Value::Object(map) => Ok(map),
        other => Err(Error::malformed_record(
            kind,
            format!("expected an object, found {}", json_kind(&other)),
        )),
    }
}

fn connection_records(value: Option<&Value>, skipped: &mut usize) -> Vec<ConnectionRecord> {
    let items = match value {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => {
            warn!(found = json_kind(other), "Ignoring connections member");
            *skipped += 1;
            return Vec::new();
        }
    };

    items
        .iter()
        .enumerate()
        .filter_map(
            |(index, item)| match ConnectionRecord::deserialize(item) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(index, error = %e, "Skipping malformed connection record");
                    *skipped += 1;
                    None
                }
            },
        )
        .collect()
}

fn subject_record(value: &Value, skipped: &mut usize) -> Option<SubjectRecord> {
    let Some(name) = value.get("name").and_then(Value::as_str) else {
        warn!("Skipping subject record without a name");
        *skipped += 1;
        return None;
    };

    let flag = |key: &str, skipped: &mut usize| match value.get(key) {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => *b,
        Some(other) => {
            warn!(subject = name, key, found = json_kind(other), "Ignoring subject flag");
            *skipped += 1;
            true
        }
    };
    let selected = flag("selected", skipped);
    let expanded = flag("expanded", skipped);

    let children = match value.get("children") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| subject_record(item, skipped))
            .collect(),
        _ => Vec::new(),
    };

    Some(SubjectRecord {
        name: name.to_owned(),
        selected,
        expanded,
        children,
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// Tests
// ============================================================================
