//! Administrative policy
//!
//! Allows everything. Only reachable through the privileged entry point;
//! never construct it for an externally supplied actor.

use async_trait::async_trait;
use warden_core::{Document, Message, StoredRecord};

use crate::policy::{strip_storage_fields, Policy, PolicyScope};

/// Policy granting every capability
#[derive(Debug, Clone, Copy, Default)]
pub struct AdminPolicy;

#[async_trait]
impl Policy for AdminPolicy {
    async fn can_new(&self, _scope: &PolicyScope, _msg: Option<&Document>) -> bool {
        true
    }

    async fn can_change(&self, _scope: &PolicyScope, _old: &StoredRecord, _new: &StoredRecord) -> bool {
        true
    }

    async fn can_read(&self, _scope: &PolicyScope, _record: &StoredRecord) -> bool {
        true
    }

    fn redact_write(&self, _scope: &PolicyScope, msg: &Message) -> Document {
        strip_storage_fields(msg)
    }

    fn own(&self, _scope: &PolicyScope, _doc: &mut Document) {}

    fn owns(&self, _scope: &PolicyScope, _doc: &Document) -> bool {
        true
    }
}
