//! In-memory review ledger.
//!
//! `InMemoryReviewLedger` implements `ReviewAuditWriter` for the review state
//! machine and answers the questions an approver UI asks afterwards: what
//! happened to this account, and in what order.

use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use tracing::{debug, warn};

use medgate_contracts::{
    account::AccountId,
    error::{MedgateError, MedgateResult},
    review::ReviewRecord,
};
use medgate_core::traits::ReviewAuditWriter;

use crate::{
    chain::{first_broken_link, hash_entry},
    entry::{LedgerEntry, LedgerExport},
};

#[derive(Debug)]
pub(crate) struct LedgerState {
    pub(crate) entries: Vec<LedgerEntry>,
    pub(crate) head_hash: String,
}

/// Append-only, hash-chained store of review transitions.
#[derive(Debug)]
pub struct InMemoryReviewLedger {
    name: String,
    pub(crate) state: Mutex<LedgerState>,
}

impl InMemoryReviewLedger {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(LedgerState {
                entries: Vec::new(),
                head_hash: LedgerEntry::GENESIS_HASH.to_string(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().map(|s| s.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every transition recorded for `account_id`, oldest first.
    pub fn history(&self, account_id: &AccountId) -> MedgateResult<Vec<ReviewRecord>> {
        Ok(self
            .lock()?
            .entries
            .iter()
            .filter(|e| e.record.account_id == *account_id)
            .map(|e| e.record.clone())
            .collect())
    }

    /// Snapshot of the full ledger.
    pub fn export(&self) -> MedgateResult<LedgerExport> {
        let state = self.lock()?;
        Ok(LedgerExport {
            ledger: self.name.clone(),
            entries: state.entries.clone(),
            exported_at: Utc::now(),
            head_hash: state
                .entries
                .last()
                .map(|e| e.this_hash.clone())
                .unwrap_or_default(),
        })
    }

    /// Re-verify every link of the chain.
    pub fn verify_integrity(&self) -> bool {
        let Ok(state) = self.lock() else {
            return false;
        };
        match first_broken_link(&state.entries) {
            None => true,
            Some(idx) => {
                warn!(ledger = %self.name, sequence = idx, "review ledger chain broken");
                false
            }
        }
    }

    fn lock(&self) -> MedgateResult<MutexGuard<'_, LedgerState>> {
        self.state.lock().map_err(|e| MedgateError::StoreError {
            reason: format!("review ledger lock poisoned: {}", e),
        })
    }
}

impl ReviewAuditWriter for InMemoryReviewLedger {
    fn write(&self, record: &ReviewRecord) -> MedgateResult<()> {
        let mut state = self.lock()?;

        let sequence = state.entries.len() as u64;
        let prev_hash = state.head_hash.clone();
        let this_hash = hash_entry(&self.name, sequence, record, &prev_hash)?;

        debug!(
            ledger = %self.name,
            sequence,
            account_id = %record.account_id,
            action = record.action.name(),
            "review decision recorded"
        );

        state.entries.push(LedgerEntry {
            sequence,
            ledger: self.name.clone(),
            record: record.clone(),
            prev_hash,
            this_hash: this_hash.clone(),
        });
        state.head_hash = this_hash;
        Ok(())
    }
}
