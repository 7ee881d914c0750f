//! Chain verification: tamper and corruption detection.
//!
//! The verifier walks a subject's chain in sequence order and recomputes
//! every commitment from stored fields alone. Findings are data, not
//! errors: a damaged chain produces a [`VerificationReport`] listing the
//! issues, and nothing is ever repaired, because rewriting history would
//! destroy the evidentiary value of the ledger.

use serde::{Deserialize, Serialize};

use crate::canonical::HashEnvelope;
use crate::hash::{content_hash, is_genesis, short_hash};
use crate::ledger::LedgerError;
use crate::store::AuditStore;

/// Kind of integrity finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// The record's stored hash does not match one recomputed from its own
    /// fields: content was altered after creation, or the hash was stored
    /// incorrectly.
    HashMismatch,

    /// The record's declared predecessor hash does not match the actual
    /// predecessor: a record was inserted, deleted, or reordered.
    ChainBreak,

    /// Sequence numbers are not contiguous ascending integers starting
    /// at 1.
    SequenceGap,
}

impl IssueKind {
    /// Stable wire identifier, matching the serde representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HashMismatch => "hash_mismatch",
            Self::ChainBreak => "chain_break",
            Self::SequenceGap => "sequence_gap",
        }
    }
}

/// One integrity finding, anchored to the offending record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityIssue {
    /// Id of the offending record.
    pub record_id: String,

    /// Sequence number of the offending record.
    pub sequence_number: u64,

    /// What kind of damage was found.
    pub kind: IssueKind,

    /// Human-readable detail with truncated hash previews.
    pub detail: String,
}

/// Result of verifying one subject's chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    /// The subject whose chain was verified.
    pub subject_id: String,

    /// True iff no issues were found. An empty chain is valid.
    pub valid: bool,

    /// Number of records examined.
    pub total_records: u64,

    /// Number of records with no issues of any kind.
    pub verified_records: u64,

    /// Ordered findings, chain order.
    pub issues: Vec<IntegrityIssue>,
}

/// Read-only verifier over an [`AuditStore`].
///
/// Verification may run concurrently with appends; it observes one
/// consistent snapshot of the chain, and a record appended after the
/// snapshot simply appears in the next run.
pub struct ChainVerifier<'a, S> {
    store: &'a S,
}

impl<'a, S: AuditStore> ChainVerifier<'a, S> {
    /// Creates a verifier over the given store.
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Verifies `subject_id`'s chain and returns the integrity report.
    ///
    /// For every record, in ascending sequence order:
    ///
    /// 1. recompute the content hash from stored fields and compare to the
    ///    stored value;
    /// 2. compare `previous_hash` to the actual predecessor's stored hash
    ///    (the genesis sentinel for the first record);
    /// 3. check sequence continuity (contiguous, ascending, starting
    ///    at 1).
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] if the chain cannot be read.
    pub fn check(&self, subject_id: &str) -> Result<VerificationReport, LedgerError> {
        let records = self.store.read_chain(subject_id)?;

        let mut issues = Vec::new();
        let mut verified_records = 0u64;
        let mut expected_seq = 1u64;

        for (index, record) in records.iter().enumerate() {
            let issues_before = issues.len();

            if record.sequence_number != expected_seq {
                issues.push(IntegrityIssue {
                    record_id: record.id.clone(),
                    sequence_number: record.sequence_number,
                    kind: IssueKind::SequenceGap,
                    detail: format!(
                        "expected sequence {expected_seq}, found {}",
                        record.sequence_number
                    ),
                });
                // Resync so one gap is reported once, not for every
                // subsequent record.
                expected_seq = record.sequence_number;
            }
            expected_seq += 1;

            let envelope = HashEnvelope::new(
                &record.id,
                &record.subject_id,
                record.timestamp,
                &record.action_type,
                &record.description,
                &record.affected_assets,
                &record.previous_hash,
                record.sequence_number,
            );
            let computed = content_hash(&envelope)?;
            if computed != record.content_hash {
                issues.push(IntegrityIssue {
                    record_id: record.id.clone(),
                    sequence_number: record.sequence_number,
                    kind: IssueKind::HashMismatch,
                    detail: format!(
                        "stored {} does not match recomputed {}",
                        short_hash(&record.content_hash),
                        short_hash(&computed)
                    ),
                });
            }

            if index == 0 {
                if !is_genesis(&record.previous_hash) {
                    issues.push(IntegrityIssue {
                        record_id: record.id.clone(),
                        sequence_number: record.sequence_number,
                        kind: IssueKind::ChainBreak,
                        detail: format!(
                            "first record links to {} instead of the genesis sentinel",
                            short_hash(&record.previous_hash)
                        ),
                    });
                }
            } else {
                let predecessor = &records[index - 1];
                if record.previous_hash != predecessor.content_hash {
                    issues.push(IntegrityIssue {
                        record_id: record.id.clone(),
                        sequence_number: record.sequence_number,
                        kind: IssueKind::ChainBreak,
                        detail: format!(
                            "declared predecessor {} but record {} has hash {}",
                            short_hash(&record.previous_hash),
                            predecessor.sequence_number,
                            short_hash(&predecessor.content_hash)
                        ),
                    });
                }
            }

            if issues.len() == issues_before {
                verified_records += 1;
            }
        }

        let report = VerificationReport {
            subject_id: subject_id.to_string(),
            valid: issues.is_empty(),
            total_records: records.len() as u64,
            verified_records,
            issues,
        };

        tracing::debug!(
            subject_id = %report.subject_id,
            total_records = report.total_records,
            issue_count = report.issues.len(),
            valid = report.valid,
            "verified audit chain"
        );

        Ok(report)
    }
}
