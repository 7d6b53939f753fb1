//! Core types for Warden
//!
//! This module defines the foundational types:
//! - RecordId: Native identity of a stored record
//! - ActorRef / Actor: Principals performing operations
//! - Permissions: Per-(actor, type) capability set
//! - StoredRecord: A record as the document store holds it

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Fail;

/// Payload fields of a record or message
pub type Document = serde_json::Map<String, serde_json::Value>;

// =============================================================================
// RecordId
// =============================================================================

/// Native identity of a stored record
///
/// A RecordId is a wrapper around a UUID v4. Clients exchange ids as strings;
/// handlers parse them into RecordIds before touching the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Create a new random RecordId using UUID v4
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a RecordId from raw bytes
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Get the raw bytes of this RecordId
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = Fail;

    /// Parse a client-supplied id.
    ///
    /// # Errors
    /// Returns [`Fail::MalformedId`] if the string is not a valid UUID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self).map_err(|_| Fail::MalformedId)
    }
}

// =============================================================================
// Actors
// =============================================================================

/// Reference to a principal or record: a type tag plus an id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorRef {
    /// Type tag (e.g. `user`, `team`, `device`)
    #[serde(rename = "type")]
    pub kind: String,
    /// Identifier within the type
    pub id: String,
}

impl ActorRef {
    /// Create a new reference
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Check whether a JSON value is a `{type, id}` object naming this reference
    pub fn matches_value(&self, value: &serde_json::Value) -> bool {
        let Some(obj) = value.as_object() else {
            return false;
        };
        let kind = obj.get("type").and_then(|v| v.as_str());
        let id = obj.get("id").map(id_string);
        kind == Some(self.kind.as_str()) && id.as_deref() == Some(self.id.as_str())
    }

    /// Convert into a `{type, id}` JSON object
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({ "type": self.kind, "id": self.id })
    }
}

impl fmt::Display for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Ids are compared as strings; numeric ids in stored payloads are accepted.
fn id_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Principal performing an operation
///
/// An actor is supplied, already verified, by the caller. It may also
/// represent subordinate actors (the groups, devices or identities it belongs
/// to). The role markers on a subordinate actor select which relationship
/// fields of a record are matched against it during query rewriting.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Actor {
    /// Type tag
    #[serde(rename = "type")]
    pub kind: String,
    /// Identifier
    pub id: String,
    /// Subordinate actors this actor also represents
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actors: Vec<Actor>,
    /// Match against the `owner` relationship
    #[serde(default, skip_serializing_if = "is_false")]
    pub owner: bool,
    /// Match against the `admins` relationship
    #[serde(default, skip_serializing_if = "is_false")]
    pub admins: bool,
    /// Match against the `members` relationship
    #[serde(default, skip_serializing_if = "is_false")]
    pub members: bool,
    /// Match against the `devices` relationship
    #[serde(default, skip_serializing_if = "is_false")]
    pub devices: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Actor {
    /// Create an actor with no subordinates and no role markers
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            ..Default::default()
        }
    }

    /// Add a subordinate actor (builder pattern)
    pub fn with_actor(mut self, actor: Actor) -> Self {
        self.actors.push(actor);
        self
    }

    /// Mark as matching the `owner` relationship (builder pattern)
    pub fn as_owner(mut self) -> Self {
        self.owner = true;
        self
    }

    /// Mark as matching the `admins` relationship (builder pattern)
    pub fn as_admin(mut self) -> Self {
        self.admins = true;
        self
    }

    /// Mark as matching the `members` relationship (builder pattern)
    pub fn as_member(mut self) -> Self {
        self.members = true;
        self
    }

    /// Mark as matching the `devices` relationship (builder pattern)
    pub fn as_device(mut self) -> Self {
        self.devices = true;
        self
    }

    /// The `{type, id}` reference for this actor alone
    pub fn to_ref(&self) -> ActorRef {
        ActorRef::new(&self.kind, &self.id)
    }

    /// This actor followed by every subordinate actor
    pub fn identities(&self) -> impl Iterator<Item = &Actor> {
        std::iter::once(self).chain(self.actors.iter())
    }

    /// Check whether this actor, or any subordinate, is the referenced principal
    pub fn represents(&self, reference: &ActorRef) -> bool {
        self.identities()
            .any(|a| a.kind == reference.kind && a.id == reference.id)
    }

    /// Check whether this actor, or any subordinate, is named by a `{type, id}` value
    pub fn represented_by_value(&self, value: &serde_json::Value) -> bool {
        self.identities().any(|a| a.to_ref().matches_value(value))
    }
}

// =============================================================================
// Permissions
// =============================================================================

/// Per-(actor, type) capability set
///
/// Missing flags deserialize as `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Permissions {
    /// May read records
    #[serde(default)]
    pub read: bool,
    /// May create records
    #[serde(default)]
    pub new: bool,
    /// May update or remove records
    #[serde(default)]
    pub change: bool,
}

impl Permissions {
    /// All capabilities granted
    pub const fn all() -> Self {
        Self {
            read: true,
            new: true,
            change: true,
        }
    }

    /// No capabilities granted
    pub const fn none() -> Self {
        Self {
            read: false,
            new: false,
            change: false,
        }
    }

    /// Read-only
    pub const fn read_only() -> Self {
        Self {
            read: true,
            new: false,
            change: false,
        }
    }
}

// =============================================================================
// StoredRecord
// =============================================================================

/// A record as held by the document store
///
/// Every stored record exposes a native identity, a revision counter and
/// arbitrary payload fields. The revision counter starts at 0 and is
/// incremented by exactly one per successful update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Native identity
    pub id: RecordId,
    /// Revision counter
    pub version: u64,
    /// Payload fields
    pub fields: Document,
}

impl StoredRecord {
    /// Create a record at revision 0
    pub fn new(id: RecordId, fields: Document) -> Self {
        Self {
            id,
            version: 0,
            fields,
        }
    }

    /// Get a top-level payload field
    pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
        self.fields.get(field)
    }

    /// Overwrite payload fields with the given ones
    pub fn apply(&mut self, changes: &Document) {
        for (key, value) in changes {
            self.fields.insert(key.clone(), value.clone());
        }
    }

    /// Advance the revision counter by one
    pub fn increment(&mut self) {
        self.version += 1;
    }
}
