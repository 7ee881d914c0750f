//! The append path of the audit ledger.
//!
//! [`AuditLedger`] owns the chain invariants: it validates the caller's
//! fields, serializes the read-latest-then-insert step per subject, assigns
//! `sequence_number` and `previous_hash`, computes the content hash over
//! the canonical field set, and persists the finished record. Different
//! subjects' chains never contend on the same lock.
//!
//! # Example
//!
//! ```rust,no_run
//! use finguard_core::ledger::AuditLedger;
//! use finguard_core::record::{AppendRequest, TriggeredBy};
//! use finguard_core::store::SqliteAuditStore;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteAuditStore::open("/var/lib/finguard/audit.db")?;
//! let ledger = AuditLedger::new(store);
//!
//! let record = ledger.append(
//!     AppendRequest::new(
//!         "user-1",
//!         "rebalance",
//!         "Reduce crypto exposure to target",
//!         TriggeredBy::AiAgent,
//!     )
//!     .with_assets(["BTC", "ETH"])
//!     .with_confidence(0.94),
//! )?;
//! assert_eq!(record.sequence_number, 1);
//! # Ok(())
//! # }
//! ```

// Mutex poisoning indicates a panic in another thread, which is unrecoverable.
#![allow(clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::canonical::{CanonicalError, HashEnvelope};
use crate::hash::{GENESIS_HASH, content_hash};
use crate::record::{AppendRequest, AuditRecord, ValidationError};
use crate::store::{AuditStore, PersistenceError};
use crate::verify::{ChainVerifier, VerificationReport};


/// `extra_context` key linking a correction record to the record it
/// corrects.
pub const CORRECTS_KEY: &str = "corrects";

/// Errors from ledger operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LedgerError {
    /// The append request was rejected before any write.
    #[error("invalid append request: {0}")]
    Validation(#[from] ValidationError),

    /// The store could not durably complete the operation. No record was
    /// appended.
    #[error("persistence failure: {0}")]
    Persistence(#[from] PersistenceError),

    /// Canonical encoding of the hashed field set failed.
    #[error("canonical encoding failure: {0}")]
    Canonical(#[from] CanonicalError),
}

/// Append-only, hash-chained audit ledger over an [`AuditStore`].
pub struct AuditLedger<S> {
    store: S,
    subject_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<S: AuditStore> AuditLedger<S> {
    /// Wraps a store in the ledger discipline.
    pub fn new(store: S) -> Self {
        Self {
            store,
            subject_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Read access to the underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Appends one record to the subject's chain.
    ///
    /// Reads the subject's latest record, links the new record to it (or to
    /// the genesis sentinel), computes the content hash, and persists. The
    /// read-latest-then-insert step is serialized per subject so concurrent
    /// appends can never observe the same predecessor.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Validation`] for a rejected request (nothing
    /// was written) and [`LedgerError::Persistence`] if the store failed
    /// (no record was appended).
    pub fn append(&self, request: AppendRequest) -> Result<AuditRecord, LedgerError> {
        request.validate()?;

        let lock = self.subject_lock(&request.subject_id);
        let _guard = lock.lock().unwrap();

        let (sequence_number, previous_hash) = match self.store.latest(&request.subject_id)? {
            Some(latest) => (latest.sequence_number + 1, latest.content_hash),
            None => (1, GENESIS_HASH.to_string()),
        };

        let id = Uuid::new_v4().to_string();
        let timestamp = now_micros();

        let envelope = HashEnvelope::new(
            &id,
            &request.subject_id,
            timestamp,
            &request.action_type,
            &request.description,
            &request.affected_assets,
            &previous_hash,
            sequence_number,
        );
        let content_hash = content_hash(&envelope)?;

        let record = AuditRecord {
            id,
            subject_id: request.subject_id,
            sequence_number,
            timestamp,
            action_type: request.action_type,
            description: request.description,
            affected_assets: request.affected_assets,
            triggered_by: request.triggered_by,
            confidence: request.confidence,
            reasoning: request.reasoning,
            extra_context: request.extra_context,
            content_hash,
            previous_hash,
        };

        self.store.insert(&record)?;

        tracing::debug!(
            subject_id = %record.subject_id,
            sequence_number = record.sequence_number,
            action_type = %record.action_type,
            triggered_by = %record.triggered_by,
            "appended audit record"
        );

        Ok(record)
    }

    /// Appends a correction referencing an earlier record.
    ///
    /// Records are never edited; a correction is a new chain entry whose
    /// `extra_context` carries the corrected record's id under
    /// [`CORRECTS_KEY`].
    ///
    /// # Errors
    ///
    /// Same failure modes as [`AuditLedger::append`].
    pub fn append_correction(
        &self,
        corrected_id: &str,
        mut request: AppendRequest,
    ) -> Result<AuditRecord, LedgerError> {
        request
            .extra_context
            .get_or_insert_with(Default::default)
            .insert(
                CORRECTS_KEY.to_string(),
                Value::String(corrected_id.to_string()),
            );
        self.append(request)
    }

    /// Reads recent records for a subject, most recent first, optionally
    /// filtered to one action type, truncated to `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] if the read fails.
    pub fn read(
        &self,
        subject_id: &str,
        limit: u64,
        action_type: Option<&str>,
    ) -> Result<Vec<AuditRecord>, LedgerError> {
        Ok(self.store.read_recent(subject_id, limit, action_type)?)
    }

    /// Verifies a subject's chain and returns the integrity report.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] if the chain cannot be read.
    /// Integrity findings are reported, not raised.
    pub fn verify(&self, subject_id: &str) -> Result<VerificationReport, LedgerError> {
        ChainVerifier::new(&self.store).check(subject_id)
    }

    /// Returns the lock guarding `subject_id`'s append critical section,
    /// creating it on first use.
    fn subject_lock(&self, subject_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.subject_locks.lock().unwrap();
        locks.entry(subject_id.to_string()).or_default().clone()
    }
}

/// Current UTC time truncated to microsecond precision, so the stored
/// timestamp round-trips losslessly through the canonical string form.
fn now_micros() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_micros(now.timestamp_micros()).unwrap_or(now)
}
