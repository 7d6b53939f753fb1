//! Document store contract
//!
//! Policy handlers talk to storage only through [`DocumentStore`]. One store
//! holds the records of one record type.
//!
//! # Revision counters
//!
//! Records are inserted at revision 0. A writer fetches a record, applies its
//! changes, calls [`StoredRecord::increment`] and then [`DocumentStore::save`].
//! The save succeeds only if the stored revision is exactly one below the
//! revision being written; otherwise it reports
//! [`StoreError::VersionConflict`] and nothing is written.

use async_trait::async_trait;
use warden_core::{Document, RecordId, StoredRecord};

use crate::error::{StoreError, StoreResult};
use crate::filter::{FindOptions, StoreFilter};

/// Storage abstraction for the records of one type
///
/// Thread safety: all methods must be safe to call concurrently
/// (requires Send + Sync).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert new records, assigning identities and revision 0
    ///
    /// Either every document is inserted or none is.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Schema`] if any document is rejected.
    async fn insert_many(&self, docs: Vec<Document>) -> StoreResult<Vec<StoredRecord>>;

    /// Find records matching a filter
    async fn find(&self, filter: &StoreFilter, options: &FindOptions)
        -> StoreResult<Vec<StoredRecord>>;

    /// Fetch records by identity
    ///
    /// Missing ids are skipped; the result carries no ordering guarantee.
    async fn find_by_ids(&self, ids: &[RecordId]) -> StoreResult<Vec<StoredRecord>> {
        self.find(&StoreFilter::IdIn(ids.to_vec()), &FindOptions::default())
            .await
    }

    /// Fetch a single record by identity
    async fn find_by_id(&self, id: RecordId) -> StoreResult<Option<StoredRecord>> {
        Ok(self.find_by_ids(&[id]).await?.into_iter().next())
    }

    /// Persist an updated record under optimistic concurrency
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if the record no longer exists
    /// - [`StoreError::VersionConflict`] if the stored revision is not
    ///   `record.version - 1`
    /// - [`StoreError::Schema`] if the new payload is rejected
    async fn save(&self, record: &StoredRecord) -> StoreResult<()>;

    /// Delete a record
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the record does not exist.
    async fn remove(&self, record: &StoredRecord) -> StoreResult<()>;
}

/// Revision a record must currently hold for `record` to be saved over it
pub fn expected_revision(record: &StoredRecord) -> StoreResult<u64> {
    record
        .version
        .checked_sub(1)
        .ok_or(StoreError::VersionConflict {
            id: record.id,
            expected: 0,
            actual: record.version,
        })
}
