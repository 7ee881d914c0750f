//! Append-only storage contract for audit records.
//!
//! The ledger core needs only this contract from its storage engine: insert
//! a record, read a subject's latest record, read a subject's chain in
//! sequence order, and read recent history. Any engine keyed by
//! `(subject_id, sequence_number)` can sit behind it; [`SqliteAuditStore`]
//! is the bundled implementation.

mod sqlite;

pub use sqlite::SqliteAuditStore;
use thiserror::Error;

use crate::record::AuditRecord;

/// Errors from the underlying store.
///
/// A failed insert means no record was appended; callers must not assume a
/// record exists unless the operation returned successfully.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PersistenceError {
    /// Database error from `SQLite`.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O error during database operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON column could not be encoded.
    #[error("encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Statistics about a store.
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    /// Total number of records across all subjects.
    pub record_count: u64,

    /// Number of distinct subjects with at least one record.
    pub subject_count: u64,

    /// Highest sequence number in any chain (0 if empty).
    pub max_sequence_number: u64,

    /// Database file size in bytes.
    pub db_size_bytes: u64,
}

/// Append-only store for per-subject audit chains.
///
/// Implementations never update or delete records. The ledger layer owns
/// the read-latest-then-insert serialization discipline; stores are
/// expected to keep `(subject_id, sequence_number)` unique as a backstop
/// so an improperly interleaved append surfaces as a
/// [`PersistenceError`] instead of a forked chain.
pub trait AuditStore: Send + Sync {
    /// Persists one record.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] if the record cannot be durably
    /// written; the store must be left without partial state.
    fn insert(&self, record: &AuditRecord) -> Result<(), PersistenceError>;

    /// Reads the record with the highest sequence number for a subject.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] if the query fails.
    fn latest(&self, subject_id: &str) -> Result<Option<AuditRecord>, PersistenceError>;

    /// Reads a subject's full chain, ascending by sequence number.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] if the query fails.
    fn read_chain(&self, subject_id: &str) -> Result<Vec<AuditRecord>, PersistenceError>;

    /// Reads recent records for a subject, descending by timestamp,
    /// optionally filtered to one action type, truncated to `limit`.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] if the query fails.
    fn read_recent(
        &self,
        subject_id: &str,
        limit: u64,
        action_type: Option<&str>,
    ) -> Result<Vec<AuditRecord>, PersistenceError>;

    /// Gathers store-wide statistics.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] if statistics cannot be gathered.
    fn stats(&self) -> Result<StoreStats, PersistenceError>;
}
