//! Most-recently-used project list.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ============================================================================
// RecentProjects
// ============================================================================

/// Bounded list of project files, most recent first.
///
/// Adding a path already present moves it to the front.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentProjects {
    paths: VecDeque<PathBuf>,
    capacity: usize,
}

impl RecentProjects {
    /// Creates an empty list holding at most `capacity` paths.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            paths: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Records `path` as the most recent project.
    pub fn add(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        self.paths.retain(|p| *p != path);
        self.paths.push_front(path);
        self.paths.truncate(self.capacity);
    }

    /// Forgets `path`. Returns `false` if it was not listed.
    pub fn remove(&mut self, path: &Path) -> bool {
        let before = self.paths.len();
        self.paths.retain(|p| p != path);
        self.paths.len() != before
    }

    /// Forgets every path.
    pub fn clear(&mut self) {
        self.paths.clear();
    }

    /// Returns the most recent path.
    #[must_use]
    pub fn most_recent(&self) -> Option<&Path> {
        self.paths.front().map(PathBuf::as_path)
    }

    /// Iterates most recent first.
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }

    /// Returns the number of listed paths.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Returns `true` if no path is listed.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Returns the maximum number of paths kept.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn listed(recent: &RecentProjects) -> Vec<&str> {
        recent.iter().filter_map(Path::to_str).collect()
    }

    #[test]
    fn test_most_recent_first_and_capped() {
        let mut recent = RecentProjects::new(2);
        recent.add("a.json");
        recent.add("b.json");
        recent.add("c.json");

        assert_eq!(listed(&recent), vec!["c.json", "b.json"]);
        assert_eq!(recent.most_recent(), Some(Path::new("c.json")));
    }

    #[test]
    fn test_readding_moves_to_front() {
        let mut recent = RecentProjects::new(5);
        recent.add("a.json");
        recent.add("b.json");
        recent.add("a.json");

        assert_eq!(listed(&recent), vec!["a.json", "b.json"]);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut recent = RecentProjects::new(5);
        recent.add("a.json");
        assert!(recent.remove(Path::new("a.json")));
        assert!(!recent.remove(Path::new("a.json")));

        recent.add("b.json");
        recent.clear();
        assert!(recent.is_empty());
    }
}
