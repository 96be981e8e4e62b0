//! Ledger entry and export types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use medgate_contracts::review::ReviewRecord;

/// One review decision, linked to its predecessor by hash.
///
/// Editing any field, the embedded `record` included, changes the hash
/// `hash_entry` recomputes and breaks the link to the next entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Position in the ledger, starting at 0.
    pub sequence: u64,

    /// Name of the ledger this entry was written to.
    pub ledger: String,

    /// The review transition.
    pub record: ReviewRecord,

    /// Hash of the preceding entry, or `GENESIS_HASH` for entry 0.
    pub prev_hash: String,

    /// Hash of this entry (hex SHA-256).
    pub this_hash: String,
}

impl LedgerEntry {
    /// `prev_hash` of the first entry in every ledger: 64 hex zeros.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";
}

/// A snapshot of a ledger, suitable for handing to an auditor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerExport {
    pub ledger: String,
    pub entries: Vec<LedgerEntry>,
    pub exported_at: DateTime<Utc>,
    /// `this_hash` of the last entry; empty when the ledger is empty.
    pub head_hash: String,
}
