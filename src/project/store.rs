//! Async reading and atomic writing of project files.
//!
//! Reads go through `tokio::fs`. Writes serialize in memory, then replace
//! the target through a temporary file in the same directory on the
//! blocking pool, so a crash mid-write leaves the previous file intact.

// ============================================================================
// Imports
// ============================================================================

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::Result;

use super::record::{ConnectionList, Parsed, ProjectDocument};

// ============================================================================
// Project documents
// ============================================================================

/// Reads a project document leniently.
///
/// # Errors
///
/// - [`Error::Io`](crate::Error::Io) if the file cannot be read
/// - [`Error::Json`](crate::Error::Json) if it is not JSON
/// - [`Error::MalformedRecord`](crate::Error::MalformedRecord) if the top
///   level is not an object
pub async fn read_project(path: &Path) -> Result<Parsed<ProjectDocument>> {
    let text = tokio::fs::read_to_string(path).await?;
    let parsed = ProjectDocument::parse(&text)?;
    debug!(
        path = %path.display(),
        connections = parsed.value.connections.len(),
        subjects = parsed.value.subjects.len(),
        skipped = parsed.skipped,
        "Project document read"
    );
    Ok(parsed)
}

/// Writes a project document atomically.
///
/// # Errors
///
/// Returns an error if serialization or the file replacement fails.
pub async fn write_project(path: &Path, document: &ProjectDocument) -> Result<()> {
    write_json_atomic(path, document).await
}

// ============================================================================
// Connection lists
// ============================================================================

/// Reads a connection list file leniently.
///
/// # Errors
///
/// Same as [`read_project`].
pub async fn read_connection_list(path: &Path) -> Result<Parsed<ConnectionList>> {
    let text = tokio::fs::read_to_string(path).await?;
    ConnectionList::parse(&text)
}

/// Writes a connection list file atomically.
///
/// # Errors
///
/// Returns an error if serialization or the file replacement fails.
pub async fn write_connection_list(path: &Path, list: &ConnectionList) -> Result<()> {
    write_json_atomic(path, list).await
}

// ============================================================================
// Atomic write
// ============================================================================

async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');

    let target = path.to_path_buf();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut file = NamedTempFile::new_in(&dir)?;
        file.write_all(&bytes)?;
        file.as_file().sync_all()?;
        file.persist(&target)?;
        Ok(())
    })
    .await??;

    debug!(path = %path.display(), "File written");
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::project::{ConnectionRecord, SubjectRecord};

    fn record(description: &str, service: &str) -> ConnectionRecord {
        ConnectionRecord {
            description: description.to_string(),
            service: service.to_string(),
            network: String::new(),
            daemon: "tcp:7500".to_string(),
            subjects: vec!["A.>".to_string()],
        }
    }

    #[tokio::test]
    async fn test_project_write_then_read() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("project.json");
        let document = ProjectDocument {
            connections: vec![record("One", "7500")],
            subjects: vec![SubjectRecord::new("A").with_child(SubjectRecord::new("B"))],
        };

        write_project(&path, &document).await.expect("write");
        let parsed = read_project(&path).await.expect("read");

        assert_eq!(parsed.skipped, 0);
        assert_eq!(parsed.value, document);
    }

    #[tokio::test]
    async fn test_write_replaces_existing_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("connections.json");

        let first = ConnectionList {
            connections: vec![record("One", "1"), record("Two", "2")],
        };
        let second = ConnectionList {
            connections: vec![record("Three", "3")],
        };
        write_connection_list(&path, &first).await.expect("first write");
        write_connection_list(&path, &second).await.expect("second write");

        let parsed = read_connection_list(&path).await.expect("read");
        assert_eq!(parsed.value, second);

        let leftovers = std::fs::read_dir(dir.path()).expect("list").count();
        assert_eq!(leftovers, 1);
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = read_project(&dir.path().join("absent.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
