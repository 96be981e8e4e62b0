//! Hashing and chain verification.
//!
//! Hash input, in order:
//!   1. ledger name (UTF-8)
//!   2. sequence (8-byte little-endian)
//!   3. prev_hash (UTF-8, 64 hex chars)
//!   4. compact JSON of the review record

use sha2::{Digest, Sha256};

use medgate_contracts::{
    error::{MedgateError, MedgateResult},
    review::ReviewRecord,
};

use crate::entry::LedgerEntry;

/// Hash one ledger entry. Returns a lowercase 64-character hex string.
pub fn hash_entry(
    ledger: &str,
    sequence: u64,
    record: &ReviewRecord,
    prev_hash: &str,
) -> MedgateResult<String> {
    let record_json = serde_json::to_vec(record).map_err(|e| MedgateError::StoreError {
        reason: format!("review record not serializable: {}", e),
    })?;

    let mut hasher = Sha256::new();
    hasher.update(ledger.as_bytes());
    hasher.update(sequence.to_le_bytes());
    hasher.update(prev_hash.as_bytes());
    hasher.update(&record_json);

    Ok(hex::encode(hasher.finalize()))
}

/// Check that `entries` form an unbroken chain.
///
/// Returns the index of the first bad entry, or `None` if every entry links
/// to its predecessor, sits at the expected sequence, and hashes to its
/// stored `this_hash`. An empty slice is valid.
pub fn first_broken_link(entries: &[LedgerEntry]) -> Option<usize> {
    let mut expected_prev = LedgerEntry::GENESIS_HASH.to_string();

    for (idx, entry) in entries.iter().enumerate() {
        if entry.sequence != idx as u64 || entry.prev_hash != expected_prev {
            return Some(idx);
        }

        match hash_entry(&entry.ledger, entry.sequence, &entry.record, &entry.prev_hash) {
            Ok(recomputed) if recomputed == entry.this_hash => {}
            _ => return Some(idx),
        }

        expected_prev = entry.this_hash.clone();
    }

    None
}

/// True if `entries` form an unbroken chain.
pub fn verify_chain(entries: &[LedgerEntry]) -> bool {
    first_broken_link(entries).is_none()
}
