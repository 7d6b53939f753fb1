//! Error types for document stores

use thiserror::Error;
use warden_core::RecordId;

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failures a document store can report
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Optimistic concurrency check failed: the stored revision counter has
    /// moved past the one the writer started from.
    #[error("Version conflict on {id}: expected {expected}, got {actual}")]
    VersionConflict {
        /// Record being written
        id: RecordId,
        /// Revision the writer started from
        expected: u64,
        /// Revision currently stored
        actual: u64,
    },

    /// No record with this identity
    #[error("Record not found: {0}")]
    NotFound(RecordId),

    /// Record rejected by schema or constraint validation
    #[error("Schema violation: {0}")]
    Schema(String),

    /// Any other store failure
    #[error("Storage error: {0}")]
    Backend(String),
}
