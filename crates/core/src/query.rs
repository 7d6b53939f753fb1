//! Query specifications
//!
//! A [`QuerySpec`] is a declarative filter supplied by clients with a `find`
//! request. Policies rewrite it before it reaches the store; the store crate
//! compiles it into a native filter.
//!
//! # Wire shape
//!
//! ```text
//! {
//!   "ids":   ["…", "…"],
//!   "match": [{"op": "equals", "param": ["owner", "id"], "value": "u1"},
//!             {"op": "or", "match": [ … ]}],
//!   "sort":  "-createdAt",
//!   "limit": 20,
//!   "owner": {"type": "user", "id": "u1"}
//! }
//! ```
//!
//! Top-level `match` expressions are ANDed together.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::path::{FieldPath, PathParseError};
use crate::types::ActorRef;

/// A node of the match-expression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum MatchExpr {
    /// Field at `param` equals `value`
    Equals {
        /// Field path
        param: FieldPath,
        /// Expected value
        value: serde_json::Value,
    },
    /// Every child matches
    And {
        /// Child expressions
        #[serde(rename = "match")]
        children: Vec<MatchExpr>,
    },
    /// At least one child matches
    Or {
        /// Child expressions
        #[serde(rename = "match")]
        children: Vec<MatchExpr>,
    },
}

impl MatchExpr {
    /// Equality predicate
    pub fn equals(param: FieldPath, value: impl Into<serde_json::Value>) -> Self {
        MatchExpr::Equals {
            param,
            value: value.into(),
        }
    }

    /// Conjunction
    pub fn and(children: Vec<MatchExpr>) -> Self {
        MatchExpr::And { children }
    }

    /// Disjunction
    pub fn or(children: Vec<MatchExpr>) -> Self {
        MatchExpr::Or { children }
    }

    /// `field.id == reference.id AND field.type == reference.type`
    pub fn references(field: &str, reference: &ActorRef) -> Self {
        MatchExpr::and(vec![
            MatchExpr::equals(
                FieldPath::root().key(field).key("id"),
                reference.id.clone(),
            ),
            MatchExpr::equals(
                FieldPath::root().key(field).key("type"),
                reference.kind.clone(),
            ),
        ])
    }

    /// Equality on the native record identity
    pub fn identity(id: impl Into<String>) -> Self {
        MatchExpr::equals(FieldPath::identity(), id.into())
    }
}

/// Sort key: a field path, optionally descending
///
/// Serialized as a string; a leading `-` means descending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SortSpec {
    /// Field to sort by
    pub path: FieldPath,
    /// Sort in descending order
    pub descending: bool,
}

impl SortSpec {
    /// Ascending sort on a field
    pub fn ascending(path: FieldPath) -> Self {
        Self {
            path,
            descending: false,
        }
    }

    /// Descending sort on a field
    pub fn descending(path: FieldPath) -> Self {
        Self {
            path,
            descending: true,
        }
    }
}

impl TryFrom<String> for SortSpec {
    type Error = PathParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.strip_prefix('-') {
            Some(rest) => Ok(SortSpec::descending(rest.parse()?)),
            None => Ok(SortSpec::ascending(s.parse()?)),
        }
    }
}

impl From<SortSpec> for String {
    fn from(sort: SortSpec) -> Self {
        sort.to_string()
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            write!(f, "-{}", self.path)
        } else {
            write!(f, "{}", self.path)
        }
    }
}

/// Declarative filter for `find`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuerySpec {
    /// Restrict to these record ids
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<String>>,
    /// Match expressions, ANDed together
    #[serde(rename = "match", default, skip_serializing_if = "Vec::is_empty")]
    pub matches: Vec<MatchExpr>,
    /// Sort key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortSpec>,
    /// Maximum number of records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Owner equality shorthand
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<ActorRef>,
}

impl QuerySpec {
    /// Empty specification (matches everything)
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to ids (builder pattern)
    pub fn with_ids<S: Into<String>>(mut self, ids: impl IntoIterator<Item = S>) -> Self {
        self.ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    /// Add a match expression (builder pattern)
    pub fn with_match(mut self, expr: MatchExpr) -> Self {
        self.matches.push(expr);
        self
    }

    /// Set the sort key (builder pattern)
    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Set the limit (builder pattern)
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Number of target ids, if restricted to ids
    pub fn id_count(&self) -> Option<usize> {
        self.ids.as_ref().map(Vec::len)
    }
}
