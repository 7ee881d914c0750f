//! Canonical encoding of the hashed field set.
//!
//! The append path and the verify path both commit to a record through the
//! same [`HashEnvelope`], serialized with JCS (RFC 8785): object keys in
//! lexicographic order, no whitespace, minimal escaping. Two semantically
//! identical field sets therefore always produce byte-identical input to
//! the hash function, and the two paths cannot drift apart.
//!
//! The envelope deliberately excludes `triggered_by`, `confidence`,
//! `reasoning`, and `extra_context`; it covers exactly the committed field
//! set plus `previous_hash`, which is what turns independent records into
//! a chain.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Identifier of the canonical encoding profile.
pub const CANON_ID: &str = "audit-canon-v1";

/// Encoding version, bumped if the envelope field set ever changes.
pub const CANON_VERSION: u32 = 1;

/// Errors that can occur while producing canonical bytes.
#[derive(Debug, Error)]
pub enum CanonicalError {
    /// JCS serialization failed.
    #[error("canonical serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The exact field set committed by a record's `content_hash`.
///
/// Field order here is irrelevant; JCS sorts object keys during
/// serialization.
#[derive(Debug, Serialize)]
pub struct HashEnvelope<'a> {
    /// Record identifier.
    pub id: &'a str,
    /// Owning subject.
    pub subject_id: &'a str,
    /// Fixed-precision ISO-8601 creation time, see [`canonical_timestamp`].
    pub timestamp: String,
    /// Categorical action tag.
    pub action_type: &'a str,
    /// Free-text summary.
    pub description: &'a str,
    /// Ordered asset symbols.
    pub affected_assets: &'a [String],
    /// Hash of the predecessor record (or the genesis sentinel).
    pub previous_hash: &'a str,
    /// Position in the subject's chain.
    pub sequence_number: u64,
}

impl<'a> HashEnvelope<'a> {
    /// Builds the envelope for a record's committed fields.
    ///
    /// The argument list is the committed field set, nothing more.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        id: &'a str,
        subject_id: &'a str,
        timestamp: DateTime<Utc>,
        action_type: &'a str,
        description: &'a str,
        affected_assets: &'a [String],
        previous_hash: &'a str,
        sequence_number: u64,
    ) -> Self {
        Self {
            id,
            subject_id,
            timestamp: canonical_timestamp(timestamp),
            action_type,
            description,
            affected_assets,
            previous_hash,
            sequence_number,
        }
    }

    /// Produces the canonical byte sequence for hashing.
    ///
    /// # Errors
    ///
    /// Returns [`CanonicalError::Serialize`] if JCS serialization fails.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, CanonicalError> {
        Ok(serde_jcs::to_vec(self)?)
    }
}

/// Renders a timestamp in the canonical fixed-precision form: RFC 3339
/// UTC with exactly six fractional digits and a `Z` suffix.
///
/// Timestamps are stored at microsecond precision, so rendering is
/// lossless and re-invocable at verification time.
#[must_use]
pub fn canonical_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}
