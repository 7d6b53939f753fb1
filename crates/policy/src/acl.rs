//! Access-control lists
//!
//! An ACL is a record of its own type that targets exactly one resource and
//! grants listed actors listed actions on it:
//!
//! ```text
//! {
//!   "resource": {"type": "note", "id": "…"},
//!   "grants":   [{"actor": {"type": "team", "id": "t1"}, "actions": ["read"]}]
//! }
//! ```
//!
//! Ownership handlers reach ACLs only through an injected [`AclRepository`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use warden_core::{Actor, ActorRef, FieldPath, RecordId, StoredRecord};
use warden_storage::{DocumentStore, FindOptions, StoreFilter, StoreResult};

use crate::relationship::reference_from_value;

/// Action an ACL can grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Read the resource
    Read,
    /// Update or remove the resource
    Change,
}

impl Action {
    /// Name used in grant lists
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Change => "change",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A grant of actions to one actor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclGrant {
    /// Grantee
    pub actor: ActorRef,
    /// Granted action names
    #[serde(default)]
    pub actions: Vec<String>,
}

impl AclGrant {
    /// Grant `actions` to `actor`
    pub fn new(actor: ActorRef, actions: impl IntoIterator<Item = Action>) -> Self {
        Self {
            actor,
            actions: actions.into_iter().map(|a| a.as_str().to_string()).collect(),
        }
    }

    /// Whether this grant lists the action
    pub fn permits(&self, action: Action) -> bool {
        self.actions.iter().any(|a| a == action.as_str())
    }
}

/// An ACL record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclRecord {
    /// Identity of the ACL record itself
    pub id: RecordId,
    /// Targeted resource
    pub resource: ActorRef,
    /// Grants
    pub grants: Vec<AclGrant>,
}

impl AclRecord {
    /// Read an ACL from its stored form
    ///
    /// Returns `None` if the record has no valid `resource` reference.
    /// Malformed grants are skipped.
    pub fn from_stored(record: &StoredRecord) -> Option<Self> {
        let resource = reference_from_value(record.get("resource")?)?;
        let grants = record
            .get("grants")
            .and_then(|g| g.as_array())
            .map(|grants| {
                grants
                    .iter()
                    .filter_map(|g| serde_json::from_value::<AclGrant>(g.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();
        Some(Self {
            id: record.id,
            resource,
            grants,
        })
    }

    /// Whether the ACL grants `action` to the actor or one of its subordinates
    pub fn is_allowed(&self, actor: &Actor, action: Action) -> bool {
        self.grants
            .iter()
            .any(|grant| grant.permits(action) && actor.represents(&grant.actor))
    }
}

/// Lookup of ACL records
#[async_trait]
pub trait AclRepository: Send + Sync {
    /// ACL by its own identity
    async fn find_by_id(&self, id: RecordId) -> StoreResult<Option<AclRecord>>;

    /// The ACL targeting a resource, if any
    async fn acl_by_resource(&self, resource: &ActorRef) -> StoreResult<Option<AclRecord>>;

    /// ACLs granting `action` to any of `actors`, optionally restricted to
    /// resources of one type
    async fn acl_resources_by_actors(
        &self,
        actors: &[Actor],
        kind: Option<&str>,
        action: Action,
    ) -> StoreResult<Vec<AclRecord>>;
}

/// Repository with no ACLs, used when no ACL type is registered
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyAclRepository;

#[async_trait]
impl AclRepository for EmptyAclRepository {
    async fn find_by_id(&self, _id: RecordId) -> StoreResult<Option<AclRecord>> {
        Ok(None)
    }

    async fn acl_by_resource(&self, _resource: &ActorRef) -> StoreResult<Option<AclRecord>> {
        Ok(None)
    }

    async fn acl_resources_by_actors(
        &self,
        _actors: &[Actor],
        _kind: Option<&str>,
        _action: Action,
    ) -> StoreResult<Vec<AclRecord>> {
        Ok(Vec::new())
    }
}

/// Repository reading ACLs from the ACL type's document store
#[derive(Clone)]
pub struct StoreAclRepository {
    store: Arc<dyn DocumentStore>,
}

impl fmt::Debug for StoreAclRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreAclRepository").finish_non_exhaustive()
    }
}

impl StoreAclRepository {
    /// Repository over the store holding ACL records
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

fn resource_field(name: &str) -> FieldPath {
    FieldPath::root().key("resource").key(name)
}

#[async_trait]
impl AclRepository for StoreAclRepository {
    async fn find_by_id(&self, id: RecordId) -> StoreResult<Option<AclRecord>> {
        Ok(self
            .store
            .find_by_id(id)
            .await?
            .as_ref()
            .and_then(AclRecord::from_stored))
    }

    async fn acl_by_resource(&self, resource: &ActorRef) -> StoreResult<Option<AclRecord>> {
        let filter = StoreFilter::And(vec![
            StoreFilter::eq(resource_field("id"), resource.id.clone()),
            StoreFilter::eq(resource_field("type"), resource.kind.clone()),
        ]);
        let found = self.store.find(&filter, &FindOptions::default()).await?;
        Ok(found.iter().find_map(AclRecord::from_stored))
    }

    async fn acl_resources_by_actors(
        &self,
        actors: &[Actor],
        kind: Option<&str>,
        action: Action,
    ) -> StoreResult<Vec<AclRecord>> {
        if actors.is_empty() {
            return Ok(Vec::new());
        }
        let filter = match kind {
            Some(kind) => StoreFilter::eq(resource_field("type"), kind),
            None => StoreFilter::All,
        };
        let found = self.store.find(&filter, &FindOptions::default()).await?;
        Ok(found
            .iter()
            .filter_map(AclRecord::from_stored)
            .filter(|acl| actors.iter().any(|actor| acl.is_allowed(actor, action)))
            .collect())
    }
}
