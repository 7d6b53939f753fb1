//! Store-native filters
//!
//! [`StoreFilter`] is the representation a [`DocumentStore`](crate::DocumentStore)
//! executes. It is produced by [`compile_query`](crate::compile_query) and can
//! be evaluated directly against a [`StoredRecord`], which is what the
//! in-memory store does.
//!
//! # Equality semantics
//!
//! `Eq { path, value }` matches a record if any value reachable at `path`
//! equals `value`, or is an array containing `value`. Paths fan out over
//! arrays (see [`FieldPath::resolve`]), so `members.id == "u1"` matches a
//! record whose `members` array has an entry with id `u1`.

use std::cmp::Ordering;

use serde_json::Value;
use warden_core::{FieldPath, RecordId, SortSpec, StoredRecord};

/// Filter in the store's native representation
#[derive(Debug, Clone, PartialEq)]
pub enum StoreFilter {
    /// Matches every record
    All,
    /// Record identity is one of these
    IdIn(Vec<RecordId>),
    /// Field equality
    Eq {
        /// Field path
        path: FieldPath,
        /// Expected value
        value: Value,
    },
    /// Every child matches (empty matches everything)
    And(Vec<StoreFilter>),
    /// At least one child matches (empty matches nothing)
    Or(Vec<StoreFilter>),
}

impl StoreFilter {
    /// Field equality filter
    pub fn eq(path: FieldPath, value: impl Into<Value>) -> Self {
        StoreFilter::Eq {
            path,
            value: value.into(),
        }
    }

    /// Combine filters with AND, collapsing trivial cases
    pub fn all_of(mut filters: Vec<StoreFilter>) -> Self {
        filters.retain(|f| *f != StoreFilter::All);
        match filters.len() {
            0 => StoreFilter::All,
            1 => filters.remove(0),
            _ => StoreFilter::And(filters),
        }
    }

    /// Evaluate the filter against a stored record
    pub fn matches(&self, record: &StoredRecord) -> bool {
        match self {
            StoreFilter::All => true,
            StoreFilter::IdIn(ids) => ids.contains(&record.id),
            StoreFilter::Eq { path, value } => path
                .resolve(&record.fields)
                .into_iter()
                .any(|found| value_equals(found, value)),
            StoreFilter::And(children) => children.iter().all(|c| c.matches(record)),
            StoreFilter::Or(children) => children.iter().any(|c| c.matches(record)),
        }
    }
}

fn value_equals(found: &Value, expected: &Value) -> bool {
    if found == expected {
        return true;
    }
    match found {
        Value::Array(items) => items.iter().any(|item| item == expected),
        _ => false,
    }
}

/// Top-level fields to keep when returning records
///
/// Identity and revision counter are always returned.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Projection {
    fields: Vec<String>,
}

impl Projection {
    /// Keep only the named top-level fields
    pub fn fields<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Names of the kept fields
    pub fn field_names(&self) -> &[String] {
        &self.fields
    }

    /// Apply the projection to a record
    pub fn apply(&self, mut record: StoredRecord) -> StoredRecord {
        record.fields.retain(|key, _| self.fields.contains(key));
        record
    }
}

/// Options for a filtered find
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FindOptions {
    /// Fields to return
    pub projection: Option<Projection>,
    /// Sort key
    pub sort: Option<SortSpec>,
    /// Maximum number of records
    pub limit: Option<usize>,
}

impl FindOptions {
    /// Compare two records under a sort key
    ///
    /// Records are compared by the first value reachable at the sort path;
    /// a missing value sorts first.
    pub fn compare(sort: &SortSpec, a: &StoredRecord, b: &StoredRecord) -> Ordering {
        let left = sort.path.resolve(&a.fields).into_iter().next();
        let right = sort.path.resolve(&b.fields).into_iter().next();
        let ordering = match (left, right) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(l), Some(r)) => compare_values(l, r),
        };
        if sort.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
    }
}

/// Total order over JSON values: by type, then by value within a type
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ if type_rank(a) == type_rank(b) => a.to_string().cmp(&b.to_string()),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}
