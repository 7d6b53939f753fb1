//! Relationship-field matching
//!
//! Relationship fields hold `{type, id}` references, either a single object
//! or an array of them. An actor matches a reference through itself or any of
//! its subordinate actors.

use serde_json::Value;
use warden_core::{Actor, ActorRef, Document};

use crate::collection::{RelationshipFields, Role};

/// Whether `actor` appears in the relationship field `field` of `doc`
pub fn is_member(doc: &Document, field: &str, actor: &Actor) -> bool {
    match doc.get(field) {
        Some(Value::Array(refs)) => refs.iter().any(|r| actor.represented_by_value(r)),
        Some(reference) => actor.represented_by_value(reference),
        None => false,
    }
}

/// Whether `actor` is recorded as owner or administrator of `doc`
pub fn is_owner(doc: &Document, actor: &Actor, fields: &RelationshipFields) -> bool {
    is_member(doc, fields.field(Role::Owner), actor)
        || is_member(doc, fields.field(Role::Admins), actor)
}

/// Whether `actor` may read `doc` through a relationship: ownership,
/// administration, membership or an attached device
pub fn is_related(doc: &Document, actor: &Actor, fields: &RelationshipFields) -> bool {
    is_owner(doc, actor, fields)
        || is_member(doc, fields.field(Role::Members), actor)
        || is_member(doc, fields.field(Role::Devices), actor)
}

/// Parse a `{type, id}` reference, accepting numeric ids
pub fn reference_from_value(value: &Value) -> Option<ActorRef> {
    let obj = value.as_object()?;
    let kind = obj.get("type")?.as_str()?;
    let id = match obj.get("id")? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    Some(ActorRef::new(kind, id))
}
