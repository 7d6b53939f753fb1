//! Policy capability interface
//!
//! A [`Policy`] decides, per actor and per record, whether an operation is
//! allowed, and controls what crosses the trust boundary in each direction.
//! [`PolicyHandler`](crate::PolicyHandler) runs the CRUFL verbs and consults
//! the policy at every decision point.
//!
//! Every capability check defaults to denial. Query filtering defaults to
//! the identity, read redaction to a plain copy of the payload. Write
//! redaction has no default: a policy must decide which client fields it
//! lets through.

use async_trait::async_trait;
use warden_core::{Actor, Document, Fail, Message, QuerySpec, StoredRecord};

use crate::collection::Context;

/// Fields that only the store may set
pub const STORAGE_FIELDS: [&str; 3] = ["_id", "__v", "$meta"];

/// Per-request state a policy evaluates against
#[derive(Debug, Clone)]
pub struct PolicyScope {
    /// Requesting actor
    pub actor: Actor,
    /// Record type handled
    pub kind: String,
    /// Ambient request context
    pub context: Context,
}

impl PolicyScope {
    /// Scope for an actor working on a record type
    pub fn new(actor: Actor, kind: impl Into<String>, context: Context) -> Self {
        Self {
            actor,
            kind: kind.into(),
            context,
        }
    }

    /// Scope with no requesting actor, for privileged callers
    pub fn anonymous(kind: impl Into<String>, context: Context) -> Self {
        Self::new(Actor::default(), kind, context)
    }

    /// Whether the handled type is the actor's own type
    pub fn is_actor_type(&self) -> bool {
        self.kind == self.actor.kind
    }
}

/// Policy strategy consulted by a handler
#[async_trait]
pub trait Policy: Send + Sync {
    /// May a new record be written? `None` asks about the type as a whole.
    async fn can_new(&self, _scope: &PolicyScope, _msg: Option<&Document>) -> bool {
        false
    }

    /// May these redacted payloads be written together as one batch?
    ///
    /// Runs after every message passed [`Policy::can_new`].
    fn can_new_batch(&self, _scope: &PolicyScope, _docs: &[Document]) -> bool {
        true
    }

    /// May `old` be replaced by `new` (or removed, when both are the same)?
    async fn can_change(&self, _scope: &PolicyScope, _old: &StoredRecord, _new: &StoredRecord) -> bool {
        false
    }

    /// May the record be read?
    async fn can_read(&self, _scope: &PolicyScope, _record: &StoredRecord) -> bool {
        false
    }

    /// Restrict a client query before it reaches the store
    ///
    /// # Errors
    ///
    /// Returns [`Fail::Query`] if the restriction cannot be computed.
    async fn filter_query_spec(&self, _scope: &PolicyScope, spec: QuerySpec) -> Result<QuerySpec, Fail> {
        Ok(spec)
    }

    /// Payload returned to the client for a stored record
    fn redact_read(&self, _scope: &PolicyScope, record: &StoredRecord) -> Document {
        record.fields.clone()
    }

    /// Payload written to the store for a client message
    fn redact_write(&self, scope: &PolicyScope, msg: &Message) -> Document;

    /// Stamp the requesting actor as owner of a payload
    fn own(&self, scope: &PolicyScope, doc: &mut Document) {
        doc.insert("owner".to_string(), scope.actor.to_ref().to_value());
    }

    /// Whether the requesting actor is the recorded owner of a payload
    fn owns(&self, scope: &PolicyScope, doc: &Document) -> bool {
        doc.get("owner")
            .map(|owner| scope.actor.to_ref().matches_value(owner))
            .unwrap_or(false)
    }
}

/// Copy a message payload without storage-only fields
pub fn strip_storage_fields(msg: &Message) -> Document {
    without_fields(&msg.payload, STORAGE_FIELDS)
}

/// Copy a payload without the named fields
pub fn without_fields<'a>(doc: &Document, fields: impl IntoIterator<Item = &'a str>) -> Document {
    let mut out = doc.clone();
    for field in fields {
        out.remove(field);
    }
    out
}
