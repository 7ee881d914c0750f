//! SHA-256 content hashing for the audit chain.

use sha2::{Digest, Sha256};

use crate::canonical::{CanonicalError, HashEnvelope};

/// Length of a lowercase hex SHA-256 digest.
pub const HASH_HEX_LEN: usize = 64;

/// The sentinel used as `previous_hash` by a subject's first record.
pub const GENESIS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Computes the content hash for a record's committed field set.
///
/// The digest is SHA-256 over the envelope's canonical bytes, returned as
/// lowercase hex. Pure: the same envelope always produces the same hash, so
/// the verifier can re-invoke this with only a stored record's fields.
///
/// # Errors
///
/// Returns [`CanonicalError`] if canonical serialization fails.
pub fn content_hash(envelope: &HashEnvelope<'_>) -> Result<String, CanonicalError> {
    let bytes = envelope.canonical_bytes()?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Whether a hash value is the genesis sentinel.
#[must_use]
pub fn is_genesis(hash: &str) -> bool {
    hash == GENESIS_HASH
}

/// Truncated hash preview for human-facing reports and logs.
#[must_use]
pub fn short_hash(hash: &str) -> String {
    let prefix: String = hash.chars().take(16).collect();
    format!("{prefix}...")
}
