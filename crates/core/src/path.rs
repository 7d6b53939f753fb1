//! Field paths into record payloads
//!
//! A [`FieldPath`] names a location inside a record's payload as a sequence
//! of key segments, e.g. `owner.id`. On the wire a path is an array of
//! segment strings (`["owner", "id"]`); sort keys use the dotted form.
//!
//! # Array traversal
//!
//! Resolution follows document-store semantics: when a segment meets an
//! array, the remaining path is resolved against every element, and a
//! numeric segment selects an element by index. `members.id` therefore
//! resolves to the `id` of every entry of a `members` array.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::types::Document;

/// Segment names that address the native record identity
pub const IDENTITY_SEGMENTS: [&str; 2] = ["_id", "id"];

/// Error type for field path parsing
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathParseError {
    /// Empty key in path
    #[error("empty key in path at position {0}")]
    EmptyKey(usize),
    /// Unexpected character
    #[error("unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),
}

/// A path into a record payload
///
/// # Examples
///
/// ```
/// use warden_core::FieldPath;
///
/// let owner_id = FieldPath::root().key("owner").key("id");
/// let parsed: FieldPath = "owner.id".parse().unwrap();
/// assert_eq!(parsed, owner_id);
/// assert_eq!(owner_id.to_string(), "owner.id");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Create the root path (empty path)
    pub fn root() -> Self {
        FieldPath {
            segments: Vec::new(),
        }
    }

    /// Create a path from a vector of segments
    pub fn from_segments<S: Into<String>>(segments: impl IntoIterator<Item = S>) -> Self {
        FieldPath {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Path to the native record identity
    pub fn identity() -> Self {
        FieldPath::root().key("_id")
    }

    /// Get the path segments
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Get the number of segments in the path
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Check if this is the root path (empty)
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Append a key segment (builder pattern)
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.segments.push(key.into());
        self
    }

    /// Whether this path addresses the native record identity
    pub fn is_identity(&self) -> bool {
        self.segments.len() == 1 && IDENTITY_SEGMENTS.contains(&self.segments[0].as_str())
    }

    /// The top-level field this path starts at, if any
    pub fn head(&self) -> Option<&str> {
        self.segments.first().map(String::as_str)
    }

    /// Resolve every value reachable at this path
    ///
    /// Returns an empty vector if nothing is reachable. The root path
    /// resolves to nothing; payloads are objects, not values.
    pub fn resolve<'a>(&self, doc: &'a Document) -> Vec<&'a serde_json::Value> {
        let Some((first, rest)) = self.segments.split_first() else {
            return Vec::new();
        };
        let mut out = Vec::new();
        if let Some(value) = doc.get(first) {
            resolve_into(value, rest, &mut out);
        }
        out
    }
}

fn resolve_into<'a>(
    value: &'a serde_json::Value,
    rest: &[String],
    out: &mut Vec<&'a serde_json::Value>,
) {
    let Some((segment, tail)) = rest.split_first() else {
        out.push(value);
        return;
    };
    match value {
        serde_json::Value::Object(map) => {
            if let Some(next) = map.get(segment) {
                resolve_into(next, tail, out);
            }
        }
        serde_json::Value::Array(items) => {
            if let Ok(index) = segment.parse::<usize>() {
                if let Some(next) = items.get(index) {
                    resolve_into(next, tail, out);
                }
            } else {
                for item in items {
                    resolve_into(item, rest, out);
                }
            }
        }
        _ => {}
    }
}

impl FromStr for FieldPath {
    type Err = PathParseError;

    /// Parse a dotted path such as `owner.id` (a leading dot is accepted)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s.strip_prefix('.').unwrap_or(s);
        if body.is_empty() {
            return Ok(FieldPath::root());
        }

        let mut segments = Vec::new();
        let mut position = s.len() - body.len();
        for key in body.split('.') {
            if key.is_empty() {
                return Err(PathParseError::EmptyKey(position));
            }
            if let Some((offset, c)) = key
                .char_indices()
                .find(|(_, c)| !(c.is_alphanumeric() || *c == '_' || *c == '-' || *c == '$'))
            {
                return Err(PathParseError::UnexpectedChar(c, position + offset));
            }
            segments.push(key.to_string());
            position += key.len() + 1;
        }

        Ok(FieldPath { segments })
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}
