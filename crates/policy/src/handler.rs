//! CRUFL handler
//!
//! [`PolicyHandler`] executes one operation request against one record type,
//! consulting its [`Policy`] at every decision point.
//!
//! # Failure model
//!
//! - `create` is all-or-nothing: one denied message fails the whole batch.
//! - `remove`/`update` are per-item: every message gets its own result
//!   envelope, seeded with `IdFail` and overwritten as the item progresses.
//! - `lookup` is per-item for permissions but rejects the whole call if any
//!   message is malformed.
//! - `find` reports any failure as `QueryFail`.
//!
//! Request-level failures are returned in [`FreshnessResult::error`]; nothing
//! is propagated past [`Freshen::freshen`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, warn};
use warden_core::{
    Crufl, CruflOp, Document, Fail, FreshnessResult, Message, Meta, QuerySpec, RecordId, Result,
    StoredRecord,
};
use warden_storage::{compile_query, DocumentStore, FindOptions, Projection};

use crate::collection::{Collection, RelationshipFields};
use crate::policy::{Policy, PolicyScope};

/// Anything that can answer a single operation request
#[async_trait]
pub trait Freshen: Send + Sync {
    /// Record type handled
    fn kind(&self) -> &str;

    /// Run one operation request; never fails, errors land in the result
    async fn freshen(&self, crufl: &Crufl) -> FreshnessResult;
}

/// Per-type policy-enforcing mediator between requests and a store
pub struct PolicyHandler<P> {
    policy: P,
    scope: PolicyScope,
    store: Arc<dyn DocumentStore>,
    fields: RelationshipFields,
}

impl<P> fmt::Debug for PolicyHandler<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyHandler")
            .field("scope", &self.scope)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

/// Result of processing one stored record
enum Outcome {
    Fresh(Message),
    Failed(Fail),
}

/// Result envelopes in request order, indexed by native id
#[derive(Default)]
struct Outgoing {
    msgs: Vec<Message>,
    slots: HashMap<RecordId, Vec<usize>>,
}

impl Outgoing {
    /// Seed an `IdFail` envelope that a found record may overwrite
    fn seed(&mut self, kind: &str, msg_id: &str, id: RecordId) {
        self.slots.entry(id).or_default().push(self.msgs.len());
        self.push_failed(kind, msg_id);
    }

    /// Seed an `IdFail` envelope excluded from the store lookup
    fn push_failed(&mut self, kind: &str, msg_id: &str) {
        self.msgs
            .push(Message::from_meta(Meta::failed(kind, msg_id, Fail::Id)));
    }

    fn ids(&self) -> Vec<RecordId> {
        self.slots.keys().copied().collect()
    }

    fn settle(&mut self, id: RecordId, outcome: &Outcome) {
        let Some(indexes) = self.slots.get(&id) else {
            return;
        };
        for &idx in indexes {
            match outcome {
                Outcome::Fresh(msg) => self.msgs[idx] = msg.clone(),
                Outcome::Failed(fail) => {
                    if let Some(meta) = self.msgs[idx].meta.as_mut() {
                        meta.error = Some(*fail);
                    }
                }
            }
        }
    }

    fn finish(self) -> Vec<Message> {
        self.msgs
    }
}

impl<P: Policy> PolicyHandler<P> {
    /// Handler for the collection named by `scope.kind`
    pub fn new(policy: P, scope: PolicyScope, collection: &Collection) -> Self {
        debug!(kind = %scope.kind, actor = %scope.actor.to_ref(), "new handler");
        Self {
            policy,
            scope,
            store: Arc::clone(&collection.store),
            fields: collection.fields.clone(),
        }
    }

    /// The policy in force
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// The request scope
    pub fn scope(&self) -> &PolicyScope {
        &self.scope
    }

    fn kind_str(&self) -> &str {
        &self.scope.kind
    }

    /// Redacted payload plus fresh metadata for a stored record
    fn fresh(&self, record: &StoredRecord, removed: bool) -> Message {
        Message::with_meta(
            self.policy.redact_read(&self.scope, record),
            Meta::for_record(self.kind_str(), record, removed),
        )
    }

    /// Native id of a valid message; `None` for an invalid one
    ///
    /// # Errors
    ///
    /// Returns [`Fail::MalformedId`] if a valid message's id does not parse.
    fn target(&self, msg: &Message) -> Result<Option<RecordId>> {
        if !msg.is_valid_for(self.kind_str()) {
            return Ok(None);
        }
        msg.id().unwrap_or_default().parse().map(Some)
    }

    async fn fetch(&self, ids: &[RecordId]) -> Result<Vec<StoredRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.store.find_by_ids(ids).await.map_err(|e| {
            warn!(kind = %self.scope.kind, error = %e, "fetch by id failed");
            Fail::Bouncer
        })
    }

    // =========================================================================
    // Verbs
    // =========================================================================

    /// Insert every message, or none of them
    pub async fn create(&self, msgs: &[Message]) -> Result<Vec<Message>> {
        let permitted = join_all(
            msgs.iter()
                .map(|msg| self.policy.can_new(&self.scope, Some(&msg.payload))),
        )
        .await;
        if !permitted.iter().all(|allowed| *allowed) {
            debug!(kind = %self.scope.kind, "create denied");
            return Err(Fail::Permission);
        }

        let docs: Vec<Document> = msgs
            .iter()
            .map(|msg| self.policy.redact_write(&self.scope, msg))
            .collect();
        if !self.policy.can_new_batch(&self.scope, &docs) {
            debug!(kind = %self.scope.kind, "create batch denied");
            return Err(Fail::Permission);
        }
        let records = self.store.insert_many(docs).await.map_err(|e| {
            warn!(kind = %self.scope.kind, error = %e, "insert failed");
            Fail::Schema
        })?;

        if records.len() != msgs.len() {
            warn!(
                kind = %self.scope.kind,
                expected = msgs.len(),
                actual = records.len(),
                "store returned wrong record count"
            );
            return Err(Fail::Bouncer);
        }

        Ok(records.iter().map(|r| self.fresh(r, false)).collect())
    }

    /// Delete records by id, one outcome per message
    pub async fn remove(&self, msgs: &[Message]) -> Result<Vec<Message>> {
        let mut out = Outgoing::default();
        for msg in msgs {
            match self.target(msg)? {
                Some(id) => out.seed(self.kind_str(), msg.id().unwrap_or_default(), id),
                None => out.push_failed(self.kind_str(), msg.id().unwrap_or_default()),
            }
        }

        let records = self.fetch(&out.ids()).await?;
        let outcomes = join_all(records.iter().map(|record| self.remove_one(record))).await;
        for (record, outcome) in records.iter().zip(outcomes) {
            out.settle(record.id, &outcome);
        }
        Ok(out.finish())
    }

    async fn remove_one(&self, record: &StoredRecord) -> Outcome {
        if !self.policy.can_change(&self.scope, record, record).await {
            debug!(kind = %self.scope.kind, id = %record.id, "remove denied");
            return Outcome::Failed(Fail::Permission);
        }
        match self.store.remove(record).await {
            Ok(()) => Outcome::Fresh(self.fresh(record, true)),
            Err(e) => {
                warn!(kind = %self.scope.kind, id = %record.id, error = %e, "remove failed");
                Outcome::Failed(Fail::Bouncer)
            }
        }
    }

    /// Apply redacted payloads to records by id, one outcome per message
    pub async fn update(&self, msgs: &[Message]) -> Result<Vec<Message>> {
        let mut out = Outgoing::default();
        let mut writes: HashMap<RecordId, Document> = HashMap::new();
        for msg in msgs {
            match self.target(msg)? {
                Some(id) => {
                    out.seed(self.kind_str(), msg.id().unwrap_or_default(), id);
                    writes.insert(id, self.policy.redact_write(&self.scope, msg));
                }
                None => out.push_failed(self.kind_str(), msg.id().unwrap_or_default()),
            }
        }

        let records = self.fetch(&out.ids()).await?;
        let outcomes = join_all(records.into_iter().filter_map(|record| {
            let changes = writes.get(&record.id)?;
            Some(self.update_one(record, changes))
        }))
        .await;
        for (id, outcome) in outcomes {
            out.settle(id, &outcome);
        }
        Ok(out.finish())
    }

    async fn update_one(&self, record: StoredRecord, changes: &Document) -> (RecordId, Outcome) {
        let id = record.id;
        let old = record.clone();
        let mut new = record;
        new.apply(changes);

        if !self.policy.can_change(&self.scope, &old, &new).await {
            debug!(kind = %self.scope.kind, %id, "update denied");
            return (id, Outcome::Failed(Fail::Permission));
        }

        new.increment();
        match self.store.save(&new).await {
            Ok(()) => (id, Outcome::Fresh(self.fresh(&new, false))),
            Err(e) => {
                warn!(kind = %self.scope.kind, %id, error = %e, "save failed");
                (id, Outcome::Failed(Fail::Bouncer))
            }
        }
    }

    /// Read records by id; any malformed message fails the whole call
    pub async fn lookup(&self, msgs: &[Message]) -> Result<Vec<Message>> {
        let mut out = Outgoing::default();
        for msg in msgs {
            let Some(id) = self.target(msg)? else {
                debug!(kind = %self.scope.kind, "cannot look up malformed message");
                return Err(Fail::MalformedMessage);
            };
            out.seed(self.kind_str(), msg.id().unwrap_or_default(), id);
        }

        let records = self.fetch(&out.ids()).await?;
        let readable = join_all(
            records
                .iter()
                .map(|record| self.policy.can_read(&self.scope, record)),
        )
        .await;
        for (record, allowed) in records.iter().zip(readable) {
            if allowed {
                out.settle(record.id, &Outcome::Fresh(self.fresh(record, false)));
            }
        }
        Ok(out.finish())
    }

    /// Metadata of readable records matching a query
    pub async fn find(&self, spec: QuerySpec) -> Result<Vec<Message>> {
        let spec = self
            .policy
            .filter_query_spec(&self.scope, spec)
            .await
            .map_err(|_| Fail::Query)?;
        let compiled = compile_query(&spec)?;
        debug!(kind = %self.scope.kind, filter = ?compiled.filter, "find");

        let options = FindOptions {
            projection: Some(Projection::fields(self.fields.names())),
            sort: compiled.sort,
            limit: compiled.limit,
        };
        let records = self
            .store
            .find(&compiled.filter, &options)
            .await
            .map_err(|e| {
                warn!(kind = %self.scope.kind, error = %e, "find failed");
                Fail::Query
            })?;

        let readable = join_all(
            records
                .iter()
                .map(|record| self.policy.can_read(&self.scope, record)),
        )
        .await;
        Ok(records
            .iter()
            .zip(readable)
            .filter(|(_, allowed)| *allowed)
            .map(|(record, _)| Message::from_meta(Meta::for_record(self.kind_str(), record, false)))
            .collect())
    }
}

#[async_trait]
impl<P: Policy> Freshen for PolicyHandler<P> {
    fn kind(&self) -> &str {
        self.kind_str()
    }

    async fn freshen(&self, crufl: &Crufl) -> FreshnessResult {
        let msgs = crufl.msgs.as_deref().unwrap_or_default();
        let outcome = match &crufl.op {
            op if op.takes_messages() && msgs.is_empty() => Err(Fail::NoMessages),
            CruflOp::Create => self.create(msgs).await,
            CruflOp::Remove => self.remove(msgs).await,
            CruflOp::Update => self.update(msgs).await,
            CruflOp::Lookup => self.lookup(msgs).await,
            CruflOp::Find => match &crufl.spec {
                Some(spec) => self.find(spec.clone()).await,
                None => Err(Fail::Query),
            },
            CruflOp::Unknown(name) => {
                debug!(kind = %self.scope.kind, op = %name, "unexpected operation");
                Err(Fail::Check)
            }
        };
        if let Err(fail) = &outcome {
            debug!(kind = %self.scope.kind, op = %crufl.op, error = %fail, "request failed");
        }
        FreshnessResult::for_request(crufl).settle(outcome)
    }
}
