//! Ownership/ACL policy
//!
//! The production policy. Whether an actor may touch a record depends on:
//! - the capability set resolved for the record type,
//! - the record's relationship fields (owner, admins, members, devices),
//!   matched against the actor and its subordinate actors,
//! - any ACL record targeting the record.
//!
//! ACL records are themselves a record type with their own rules: an actor
//! manages the ACL of a resource it owns, and may never retarget an ACL at a
//! different resource.
//!
//! # Query rewriting
//!
//! `find` queries are intersected with a visibility scope built from the
//! actor's subordinate actors and the ACLs granting them `read`. Queries on
//! the ACL type, and on the actor's own type, are left alone.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};
use warden_core::{
    ActorRef, Document, Fail, MatchExpr, Message, Permissions, QuerySpec, RecordId, StoredRecord,
};

use crate::acl::{Action, AclRepository};
use crate::collection::{Collections, RelationshipFields, Role};
use crate::policy::{strip_storage_fields, Policy, PolicyScope};
use crate::relationship::{is_owner, is_related, reference_from_value};

/// Settings shared by every ownership handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipRules {
    /// Record type of ACL resources
    pub acl_type: String,
    /// Subordinate actor types always matched against the owner field
    pub implicit_owner_types: Vec<String>,
    /// Capability set for types without a resolver
    pub default_permissions: Permissions,
}

impl Default for OwnershipRules {
    fn default() -> Self {
        Self {
            acl_type: "acl".to_string(),
            implicit_owner_types: vec![
                "user".to_string(),
                "identity".to_string(),
                "device".to_string(),
            ],
            default_permissions: Permissions::all(),
        }
    }
}

impl OwnershipRules {
    /// Whether records of actors of this type are implicitly owned by them
    pub fn is_implicit_owner(&self, kind: &str) -> bool {
        self.implicit_owner_types.iter().any(|t| t == kind)
    }
}

/// A resource an ACL targets, loaded from its own collection
struct Target {
    permissions: Permissions,
    record: StoredRecord,
    fields: RelationshipFields,
}

/// Policy granting access by ownership, membership and ACL grants
#[derive(Clone)]
pub struct OwnerPolicy {
    permissions: Permissions,
    fields: RelationshipFields,
    collections: Arc<Collections>,
    acl: Arc<dyn AclRepository>,
    rules: Arc<OwnershipRules>,
}

impl std::fmt::Debug for OwnerPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnerPolicy")
            .field("permissions", &self.permissions)
            .field("fields", &self.fields)
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

impl OwnerPolicy {
    /// Ownership policy with a resolved capability set
    pub fn new(
        permissions: Permissions,
        collections: Arc<Collections>,
        acl: Arc<dyn AclRepository>,
        rules: Arc<OwnershipRules>,
    ) -> Self {
        Self {
            permissions,
            fields: RelationshipFields::default(),
            collections,
            acl,
            rules,
        }
    }

    /// Relationship fields of the handled type (builder pattern)
    pub fn with_fields(mut self, fields: RelationshipFields) -> Self {
        self.fields = fields;
        self
    }

    /// The capability set in force
    pub fn permissions(&self) -> Permissions {
        self.permissions
    }

    fn is_acl_type(&self, kind: &str) -> bool {
        kind == self.rules.acl_type
    }

    /// ACLs may only target registered, non-ACL types
    fn is_allowed_collection(&self, kind: &str) -> bool {
        !self.is_acl_type(kind) && self.collections.contains(kind)
    }

    async fn target(&self, scope: &PolicyScope, reference: &ActorRef) -> Option<Target> {
        if !self.is_allowed_collection(&reference.kind) {
            debug!(resource = %reference, "acl resource is not an allowed collection");
            return None;
        }
        let collection = self.collections.get(&reference.kind)?;
        let id: RecordId = reference.id.parse().ok()?;
        let permissions = collection
            .resolve_permissions(&scope.context, self.rules.default_permissions)
            .await;
        let record = match collection.store.find_by_id(id).await {
            Ok(record) => record?,
            Err(e) => {
                warn!(resource = %reference, error = %e, "failed to load acl resource");
                return None;
            }
        };
        Some(Target {
            permissions,
            record,
            fields: collection.fields.clone(),
        })
    }

    /// Whether the ACL targeting `record` grants `action` to the actor
    async fn granted(&self, scope: &PolicyScope, record: &StoredRecord, action: Action) -> bool {
        let resource = ActorRef::new(&scope.kind, record.id.to_string());
        match self.acl.acl_by_resource(&resource).await {
            Ok(Some(acl)) => acl.is_allowed(&scope.actor, action),
            Ok(None) => false,
            Err(e) => {
                warn!(%resource, error = %e, "acl lookup failed");
                false
            }
        }
    }

    async fn can_read_acl(&self, scope: &PolicyScope, record: &StoredRecord) -> bool {
        let acl = match self.acl.find_by_id(record.id).await {
            Ok(Some(acl)) => acl,
            Ok(None) => return false,
            Err(e) => {
                warn!(id = %record.id, error = %e, "acl lookup failed");
                return false;
            }
        };
        if acl.is_allowed(&scope.actor, Action::Read) {
            return true;
        }
        let allowed = match self.target(scope, &acl.resource).await {
            Some(t) => t.permissions.read && is_related(&t.record.fields, &scope.actor, &t.fields),
            None => false,
        };
        debug!(id = %record.id, allowed, "acl read");
        allowed
    }

    async fn can_new_acl(&self, scope: &PolicyScope, msg: Option<&Document>) -> bool {
        let Some(msg) = msg else {
            return true;
        };
        let Some(resource) = msg.get("resource").and_then(reference_from_value) else {
            return false;
        };
        if !self.is_allowed_collection(&resource.kind) {
            debug!(%resource, "deny acl for disallowed collection");
            return false;
        }
        match self.acl.acl_by_resource(&resource).await {
            Ok(Some(_)) => {
                debug!(%resource, "deny duplicate acl");
                return false;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(%resource, error = %e, "acl lookup failed");
                return false;
            }
        }
        match self.target(scope, &resource).await {
            Some(t) => is_owner(&t.record.fields, &scope.actor, &t.fields),
            None => false,
        }
    }

    async fn can_change_acl(&self, scope: &PolicyScope, old: &StoredRecord, new: &StoredRecord) -> bool {
        let old_resource = old.get("resource").and_then(reference_from_value);
        let new_resource = new.get("resource").and_then(reference_from_value);
        let (Some(old_resource), Some(new_resource)) = (old_resource, new_resource) else {
            return false;
        };
        if !self.is_allowed_collection(&old_resource.kind) {
            debug!(resource = %old_resource, "deny acl for disallowed collection");
            return false;
        }
        if old_resource != new_resource {
            debug!(from = %old_resource, to = %new_resource, "deny acl retarget");
            return false;
        }
        match self.target(scope, &old_resource).await {
            Some(t) => {
                (t.permissions.change || t.permissions.read)
                    && is_owner(&t.record.fields, &scope.actor, &t.fields)
            }
            None => false,
        }
    }
}

#[async_trait]
impl Policy for OwnerPolicy {
    async fn can_new(&self, scope: &PolicyScope, msg: Option<&Document>) -> bool {
        if self.is_acl_type(&scope.kind) {
            return self.can_new_acl(scope, msg).await;
        }
        match msg {
            None => self.permissions.new,
            Some(doc) => self.permissions.new && is_owner(doc, &scope.actor, &self.fields),
        }
    }

    fn can_new_batch(&self, scope: &PolicyScope, docs: &[Document]) -> bool {
        if !self.is_acl_type(&scope.kind) {
            return true;
        }
        let mut resources = HashSet::new();
        for resource in docs
            .iter()
            .filter_map(|doc| doc.get("resource").and_then(reference_from_value))
        {
            if !resources.insert(resource.clone()) {
                debug!(%resource, "deny second acl for resource in one batch");
                return false;
            }
        }
        true
    }

    async fn can_change(&self, scope: &PolicyScope, old: &StoredRecord, new: &StoredRecord) -> bool {
        if scope.is_actor_type() && new.id.to_string() == scope.actor.id {
            return self.permissions.change;
        }
        if self.is_acl_type(&scope.kind) {
            return self.can_change_acl(scope, old, new).await;
        }

        let owned = is_owner(&old.fields, &scope.actor, &self.fields)
            && is_owner(&new.fields, &scope.actor, &self.fields);
        if self.permissions.change && owned {
            return true;
        }
        self.permissions.change && self.granted(scope, old, Action::Change).await
    }

    async fn can_read(&self, scope: &PolicyScope, record: &StoredRecord) -> bool {
        if scope.is_actor_type() {
            if record.id.to_string() == scope.actor.id {
                return true;
            }
        } else if self.is_acl_type(&scope.kind) {
            return self.can_read_acl(scope, record).await;
        }

        if self.permissions.read && is_related(&record.fields, &scope.actor, &self.fields) {
            return true;
        }
        self.permissions.read && self.granted(scope, record, Action::Read).await
    }

    async fn filter_query_spec(&self, scope: &PolicyScope, mut spec: QuerySpec) -> Result<QuerySpec, Fail> {
        if self.is_acl_type(&scope.kind) || scope.is_actor_type() {
            debug!(kind = %scope.kind, "query left unfiltered");
            return Ok(spec);
        }

        let actors = &scope.actor.actors;
        let mut filters = Vec::new();
        for actor in actors {
            if actor.kind == scope.kind
                && spec.id_count() == Some(1)
                && actor.id.parse::<RecordId>().is_ok()
            {
                filters.push(MatchExpr::identity(actor.id.clone()));
            }
            for role in Role::ALL {
                let implicit = role == Role::Owner && self.rules.is_implicit_owner(&actor.kind);
                if implicit || role.marked_on(actor) {
                    filters.push(MatchExpr::references(self.fields.field(role), &actor.to_ref()));
                }
            }
        }

        if !actors.is_empty() {
            let resources = self
                .acl
                .acl_resources_by_actors(actors, Some(&scope.kind), Action::Read)
                .await
                .map_err(|e| {
                    warn!(kind = %scope.kind, error = %e, "acl resource lookup failed");
                    Fail::Query
                })?;
            debug!(kind = %scope.kind, count = resources.len(), "acl resources readable");
            filters.extend(
                resources
                    .into_iter()
                    .filter(|acl| acl.resource.id.parse::<RecordId>().is_ok())
                    .map(|acl| MatchExpr::identity(acl.resource.id)),
            );
        }

        if filters.is_empty() {
            spec.owner = Some(scope.actor.to_ref());
        } else {
            let visible = MatchExpr::or(filters);
            spec.matches = if spec.matches.is_empty() {
                vec![visible]
            } else {
                let mut all = vec![visible];
                all.append(&mut spec.matches);
                vec![MatchExpr::and(all)]
            };
        }
        debug!(kind = %scope.kind, spec = ?spec, "filtered query spec");
        Ok(spec)
    }

    fn redact_write(&self, _scope: &PolicyScope, msg: &Message) -> Document {
        strip_storage_fields(msg)
    }

    fn own(&self, _scope: &PolicyScope, _doc: &mut Document) {}

    fn owns(&self, scope: &PolicyScope, doc: &Document) -> bool {
        is_owner(doc, &scope.actor, &self.fields)
    }
}
