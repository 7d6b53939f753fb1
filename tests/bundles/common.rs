//! Common test utilities for bundle tests

#![allow(dead_code)]

use std::sync::{Arc, Once};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use wardendb::storage::{DocumentStore, FindOptions, MemoryStore, StoreFilter, StoreResult};
use wardendb::{
    Actor, Bundle, Collection, Crufl, CruflOp, Document, FreshnessResult, Message, Permissions,
    RecordId, StoredRecord, Warden, WardenConfig,
};

static INIT_TRACING: Once = Once::new();

/// Route `tracing` output through the test harness; `RUST_LOG` selects levels
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn doc(value: Value) -> Document {
    value.as_object().cloned().unwrap_or_default()
}

pub fn user(id: &str) -> Actor {
    Actor::new("user", id)
}

/// A session actor acting for a user, as a transport would authenticate it
pub fn session_for(id: &str) -> Actor {
    Actor::new("session", format!("s-{id}")).with_actor(user(id))
}

pub fn owned_by(id: &str) -> Value {
    json!({"type": "user", "id": id})
}

/// Warden over a `note` store and an `acl` store
pub struct Harness {
    pub warden: Warden,
    pub notes: Arc<MemoryStore>,
    pub acls: Arc<MemoryStore>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_permissions(Permissions::all())
    }

    pub fn with_permissions(permissions: Permissions) -> Self {
        Self::build(WardenConfig::default(), permissions)
    }

    pub fn build(config: WardenConfig, permissions: Permissions) -> Self {
        init_tracing();
        let notes = Arc::new(MemoryStore::new("note"));
        let acls = Arc::new(MemoryStore::new("acl"));
        let warden = Warden::new(config)
            .unwrap()
            .collection_for("note", Collection::new(notes.clone()).with_permissions(permissions))
            .collection_for("acl", Collection::new(acls.clone()));
        Self {
            warden,
            notes,
            acls,
        }
    }

    /// Store a note directly, bypassing policy
    pub fn seed_note(&self, owner: &str, title: &str) -> RecordId {
        let record = StoredRecord::new(
            RecordId::new(),
            doc(json!({"title": title, "owner": owned_by(owner)})),
        );
        let id = record.id;
        self.notes.put(record);
        id
    }

    /// Store an ACL on a note granting `actions` to a user
    pub fn seed_grant(&self, note: RecordId, grantee: &str, actions: &[&str]) -> RecordId {
        let record = StoredRecord::new(
            RecordId::new(),
            doc(json!({
                "resource": {"type": "note", "id": note.to_string()},
                "grants": [{"actor": owned_by(grantee), "actions": actions}],
            })),
        );
        let id = record.id;
        self.acls.put(record);
        id
    }

    /// Send a single request and return its result
    pub async fn ask_one(&self, actor: Actor, crufl: Crufl) -> FreshnessResult {
        let uuid = crufl.uuid.clone();
        let pack = self
            .warden
            .ask(actor, &Bundle::new("bundle", vec![crufl]), json!({}))
            .await
            .unwrap();
        pack.result(&uuid).cloned().unwrap()
    }

    pub async fn stored(&self, id: RecordId) -> Option<StoredRecord> {
        self.notes.find_by_id(id).await.unwrap()
    }
}

pub fn reference(kind: &str, id: RecordId) -> Message {
    Message::reference(kind, id.to_string())
}

pub fn note_ref(id: RecordId) -> Message {
    reference("note", id)
}

pub fn new_note(owner: &str, title: &str) -> Message {
    Message::draft(doc(json!({"title": title, "owner": owned_by(owner)})))
}

pub fn crufl(op: CruflOp, uuid: &str, msgs: Vec<Message>) -> Crufl {
    Crufl::with_msgs(op, "note", uuid, msgs)
}

// ============================================================================
// Store wrappers
// ============================================================================

/// Store that bumps every fetched record's revision behind the reader's back
pub struct RacingStore {
    pub inner: MemoryStore,
}

#[async_trait]
impl DocumentStore for RacingStore {
    async fn insert_many(&self, docs: Vec<Document>) -> StoreResult<Vec<StoredRecord>> {
        self.inner.insert_many(docs).await
    }

    async fn find(&self, filter: &StoreFilter, options: &FindOptions) -> StoreResult<Vec<StoredRecord>> {
        self.inner.find(filter, options).await
    }

    async fn find_by_ids(&self, ids: &[RecordId]) -> StoreResult<Vec<StoredRecord>> {
        let fetched = self.inner.find_by_ids(ids).await?;
        for record in &fetched {
            let mut concurrent = record.clone();
            concurrent.increment();
            self.inner.save(&concurrent).await?;
        }
        Ok(fetched)
    }

    async fn save(&self, record: &StoredRecord) -> StoreResult<()> {
        self.inner.save(record).await
    }

    async fn remove(&self, record: &StoredRecord) -> StoreResult<()> {
        self.inner.remove(record).await
    }
}

/// Store that answers every call after a delay
pub struct SlowStore {
    pub inner: MemoryStore,
    pub delay: Duration,
}

#[async_trait]
impl DocumentStore for SlowStore {
    async fn insert_many(&self, docs: Vec<Document>) -> StoreResult<Vec<StoredRecord>> {
        tokio::time::sleep(self.delay).await;
        self.inner.insert_many(docs).await
    }

    async fn find(&self, filter: &StoreFilter, options: &FindOptions) -> StoreResult<Vec<StoredRecord>> {
        tokio::time::sleep(self.delay).await;
        self.inner.find(filter, options).await
    }

    async fn save(&self, record: &StoredRecord) -> StoreResult<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.save(record).await
    }

    async fn remove(&self, record: &StoredRecord) -> StoreResult<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.remove(record).await
    }
}
