//! Validated Rendezvous subject names.
//!
//! Subjects are case-sensitive, dot-delimited strings such as
//! `ORDERS.EU.LONDON`. Two wildcard segments are recognised:
//!
//! | Segment | Matches |
//! |---------|---------|
//! | `*` | exactly one segment, in any position |
//! | `>` | one or more trailing segments; only valid as the last segment |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::result::Result as StdResult;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Segment separator.
pub const SEPARATOR: char = '.';

/// Single-segment wildcard.
pub const WILDCARD_ONE: &str = "*";

/// Trailing multi-segment wildcard.
pub const WILDCARD_TAIL: &str = ">";

/// A literal segment: no separator, no whitespace, no wildcard characters.
static LITERAL_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^.*>\s]+$").expect("literal segment pattern is valid")
});

// ============================================================================
// Segment validation
// ============================================================================

/// Checks a single segment name as used by the subject tree.
///
/// Wildcard segments are accepted; partial wildcards such as `AB*` are not.
///
/// # Errors
///
/// Returns [`Error::InvalidSubject`] if the segment is empty or malformed.
pub fn validate_segment(segment: &str) -> Result<()> {
    if segment == WILDCARD_ONE || segment == WILDCARD_TAIL || LITERAL_SEGMENT.is_match(segment) {
        Ok(())
    } else if segment.is_empty() {
        Err(Error::invalid_subject(segment, "empty segment"))
    } else {
        Err(Error::invalid_subject(
            segment,
            "segments may not contain '.', whitespace or partial wildcards",
        ))
    }
}

// ============================================================================
// SubjectName
// ============================================================================

/// A parsed, validated subject name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubjectName {
    raw: String,
    segments: Vec<String>,
}

impl SubjectName {
    /// Parses and validates a subject.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSubject`] if the subject is empty, has an empty
    /// segment, or uses `>` anywhere but the last segment.
    pub fn parse(subject: &str) -> Result<Self> {
        if subject.is_empty() {
            return Err(Error::invalid_subject(subject, "empty subject"));
        }

        let segments: Vec<String> = subject.split(SEPARATOR).map(str::to_owned).collect();
        let last = segments.len() - 1;

        for (i, segment) in segments.iter().enumerate() {
            validate_segment(segment).map_err(|_| {
                Error::invalid_subject(subject, format!("bad segment {} '{segment}'", i + 1))
            })?;
            if segment == WILDCARD_TAIL && i != last {
                return Err(Error::invalid_subject(
                    subject,
                    "'>' is only allowed as the last segment",
                ));
            }
        }

        Ok(Self {
            raw: subject.to_owned(),
            segments,
        })
    }

    /// Returns the subject as written.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the segments in order.
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns `true` if any segment is a wildcard.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.segments
            .iter()
            .any(|s| s == WILDCARD_ONE || s == WILDCARD_TAIL)
    }

    /// Returns `true` if this subject, used as a subscription, matches the
    /// concrete subject `other`.
    ///
    /// Wildcards in `other` are compared literally.
    #[must_use]
    pub fn matches(&self, other: &SubjectName) -> bool {
        let mut theirs = other.segments.iter();

        for ours in &self.segments {
            if ours == WILDCARD_TAIL {
                return theirs.next().is_some();
            }
            match theirs.next() {
                Some(segment) if ours == WILDCARD_ONE || ours == segment => {}
                _ => return false,
            }
        }

        theirs.next().is_none()
    }
}

impl fmt::Display for SubjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for SubjectName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl AsRef<str> for SubjectName {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

impl Serialize for SubjectName {
    fn serialize<S: Serializer>(&self, serializer: S) -> StdResult<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for SubjectName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> StdResult<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Tests
// ============================================================================
