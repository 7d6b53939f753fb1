//! Deny-all policy
//!
//! The default for a record type no other policy covers: every capability
//! check is refused. Write redaction strips storage and relationship fields so
//! that nothing a client sends could forge ownership.

use async_trait::async_trait;
use warden_core::{Document, Message};

use crate::collection::RelationshipFields;
use crate::policy::{strip_storage_fields, without_fields, Policy, PolicyScope};

/// Policy refusing every operation
#[derive(Debug, Clone, Default)]
pub struct DenyAllPolicy {
    fields: RelationshipFields,
}

impl DenyAllPolicy {
    /// Deny-all policy for a type with the given relationship fields
    pub fn new(fields: RelationshipFields) -> Self {
        Self { fields }
    }
}

#[async_trait]
impl Policy for DenyAllPolicy {
    fn redact_write(&self, _scope: &PolicyScope, msg: &Message) -> Document {
        without_fields(&strip_storage_fields(msg), self.fields.names())
    }
}
