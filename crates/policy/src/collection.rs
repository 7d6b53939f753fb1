//! Collections and permission resolution
//!
//! A [`Collection`] is a registered record type: the store holding its
//! records, an optional [`PermissionResolver`] deciding the per-request
//! capability set, and the names of its relationship fields.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use warden_core::{Actor, Permissions};
use warden_storage::DocumentStore;

/// Opaque ambient request context, passed to resolvers unchanged
pub type Context = serde_json::Value;

// =============================================================================
// Permission resolution
// =============================================================================

/// Resolves the capability set for a record type within a request
#[async_trait]
pub trait PermissionResolver: Send + Sync {
    /// Capability set for the given context
    async fn permissions(&self, context: &Context) -> Permissions;
}

#[async_trait]
impl PermissionResolver for Permissions {
    async fn permissions(&self, _context: &Context) -> Permissions {
        *self
    }
}

// =============================================================================
// Relationship fields
// =============================================================================

/// Relationship a record can have with an actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// The record's owner
    Owner,
    /// Administrators of the record
    Admins,
    /// Members of the record
    Members,
    /// Devices attached to the record
    Devices,
}

impl Role {
    /// Every role, in query-rewriting order
    pub const ALL: [Role; 4] = [Role::Owner, Role::Admins, Role::Members, Role::Devices];

    /// Whether the actor carries this role's marker
    pub fn marked_on(&self, actor: &Actor) -> bool {
        match self {
            Role::Owner => actor.owner,
            Role::Admins => actor.admins,
            Role::Members => actor.members,
            Role::Devices => actor.devices,
        }
    }
}

/// Record field names holding each relationship
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipFields {
    /// Owner reference
    pub owner: String,
    /// Administrator references
    pub admins: String,
    /// Member references
    pub members: String,
    /// Device references
    pub devices: String,
}

impl Default for RelationshipFields {
    fn default() -> Self {
        Self {
            owner: "owner".to_string(),
            admins: "admins".to_string(),
            members: "members".to_string(),
            devices: "devices".to_string(),
        }
    }
}

impl RelationshipFields {
    /// Field name holding a relationship
    pub fn field(&self, role: Role) -> &str {
        match role {
            Role::Owner => &self.owner,
            Role::Admins => &self.admins,
            Role::Members => &self.members,
            Role::Devices => &self.devices,
        }
    }

    /// All four field names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        Role::ALL.into_iter().map(move |role| self.field(role))
    }
}

// =============================================================================
// Collection
// =============================================================================

/// A registered record type
#[derive(Clone)]
pub struct Collection {
    /// Store holding the records
    pub store: Arc<dyn DocumentStore>,
    /// Capability resolver; absent means the configured default applies
    pub permissions: Option<Arc<dyn PermissionResolver>>,
    /// Relationship field names
    pub fields: RelationshipFields,
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("has_permissions", &self.permissions.is_some())
            .field("fields", &self.fields)
            .finish()
    }
}

impl Collection {
    /// Collection over a store, with default field names and no resolver
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            permissions: None,
            fields: RelationshipFields::default(),
        }
    }

    /// Set the permission resolver (builder pattern)
    pub fn with_permissions(mut self, resolver: impl PermissionResolver + 'static) -> Self {
        self.permissions = Some(Arc::new(resolver));
        self
    }

    /// Set the relationship field names (builder pattern)
    pub fn with_fields(mut self, fields: RelationshipFields) -> Self {
        self.fields = fields;
        self
    }

    /// Resolve the capability set, falling back to `default` without a resolver
    pub async fn resolve_permissions(&self, context: &Context, default: Permissions) -> Permissions {
        match &self.permissions {
            Some(resolver) => resolver.permissions(context).await,
            None => default,
        }
    }
}

/// Registered record types by name
#[derive(Debug, Clone, Default)]
pub struct Collections {
    inner: BTreeMap<String, Collection>,
}

impl Collections {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type, returning the collection it replaced
    pub fn insert(&mut self, kind: impl Into<String>, collection: Collection) -> Option<Collection> {
        self.inner.insert(kind.into(), collection)
    }

    /// Look up a type
    pub fn get(&self, kind: &str) -> Option<&Collection> {
        self.inner.get(kind)
    }

    /// Whether a type is registered
    pub fn contains(&self, kind: &str) -> bool {
        self.inner.contains_key(kind)
    }

    /// Registered type names, sorted
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if no type is registered
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
