//! MemoryStore: in-process document store
//!
//! Records live in a `BTreeMap<RecordId, Entry>` behind a
//! `parking_lot::RwLock`. Each entry carries an insertion sequence number so
//! that unsorted finds return records in insertion order.
//!
//! An optional validator stands in for a schema: it is run on every inserted
//! document and every saved payload, and a rejection surfaces as
//! [`StoreError::Schema`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;
use warden_core::{Document, RecordId, StoredRecord};

use crate::error::{StoreError, StoreResult};
use crate::filter::{FindOptions, StoreFilter};
use crate::store::{expected_revision, DocumentStore};

/// Payload validator: returns a description of the problem on rejection
pub type Validator = Arc<dyn Fn(&Document) -> Result<(), String> + Send + Sync>;

#[derive(Debug, Clone)]
struct Entry {
    seq: u64,
    record: StoredRecord,
}

/// In-memory implementation of [`DocumentStore`]
pub struct MemoryStore {
    name: String,
    data: RwLock<BTreeMap<RecordId, Entry>>,
    seq: AtomicU64,
    validator: Option<Validator>,
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("name", &self.name)
            .field("len", &self.len())
            .field("validated", &self.validator.is_some())
            .finish()
    }
}

impl MemoryStore {
    /// Create an empty store; `name` is used in log output only
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: RwLock::new(BTreeMap::new()),
            seq: AtomicU64::new(0),
            validator: None,
        }
    }

    /// Attach a payload validator (builder pattern)
    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Document) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Insert a record as-is, keeping its identity and revision
    ///
    /// Used to seed fixtures; bypasses validation.
    pub fn put(&self, record: StoredRecord) {
        let seq = self.next_seq();
        self.data.write().insert(record.id, Entry { seq, record });
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst)
    }

    fn validate(&self, doc: &Document) -> StoreResult<()> {
        match &self.validator {
            Some(validator) => validator(doc).map_err(StoreError::Schema),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_many(&self, docs: Vec<Document>) -> StoreResult<Vec<StoredRecord>> {
        for doc in &docs {
            self.validate(doc)?;
        }

        let records: Vec<StoredRecord> = docs
            .into_iter()
            .map(|fields| StoredRecord::new(RecordId::new(), fields))
            .collect();

        let mut data = self.data.write();
        for record in &records {
            let seq = self.next_seq();
            data.insert(
                record.id,
                Entry {
                    seq,
                    record: record.clone(),
                },
            );
        }
        debug!(store = %self.name, count = records.len(), "inserted records");
        Ok(records)
    }

    async fn find(
        &self,
        filter: &StoreFilter,
        options: &FindOptions,
    ) -> StoreResult<Vec<StoredRecord>> {
        let mut found: Vec<(u64, StoredRecord)> = {
            let data = self.data.read();
            match filter {
                StoreFilter::IdIn(ids) => ids
                    .iter()
                    .filter_map(|id| data.get(id))
                    .map(|entry| (entry.seq, entry.record.clone()))
                    .collect(),
                _ => data
                    .values()
                    .filter(|entry| filter.matches(&entry.record))
                    .map(|entry| (entry.seq, entry.record.clone()))
                    .collect(),
            }
        };

        found.sort_by_key(|(seq, _)| *seq);
        found.dedup_by_key(|(seq, _)| *seq);

        let mut records: Vec<StoredRecord> = found.into_iter().map(|(_, r)| r).collect();
        if let Some(sort) = &options.sort {
            records.sort_by(|a, b| FindOptions::compare(sort, a, b));
        }
        if let Some(limit) = options.limit {
            records.truncate(limit);
        }
        if let Some(projection) = &options.projection {
            records = records.into_iter().map(|r| projection.apply(r)).collect();
        }
        Ok(records)
    }

    async fn save(&self, record: &StoredRecord) -> StoreResult<()> {
        self.validate(&record.fields)?;
        let expected = expected_revision(record)?;

        let mut data = self.data.write();
        let entry = data
            .get_mut(&record.id)
            .ok_or(StoreError::NotFound(record.id))?;
        if entry.record.version != expected {
            debug!(
                store = %self.name,
                id = %record.id,
                expected,
                actual = entry.record.version,
                "rejected stale save"
            );
            return Err(StoreError::VersionConflict {
                id: record.id,
                expected,
                actual: entry.record.version,
            });
        }
        entry.record = record.clone();
        Ok(())
    }

    async fn remove(&self, record: &StoredRecord) -> StoreResult<()> {
        self.data
            .write()
            .remove(&record.id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(record.id))
    }
}
