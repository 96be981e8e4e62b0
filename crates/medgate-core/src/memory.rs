//! In-memory implementation of `CredentialStore`.
//!
//! Records live in a `HashMap` behind a single `Mutex`, which also serializes
//! every `modify` call: two approvers acting on the same account can never
//! interleave their read-modify-write cycles.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;

use medgate_contracts::{
    account::{AccountId, CredentialRecord},
    error::{MedgateError, MedgateResult},
    role::Role,
};

use crate::traits::CredentialStore;

#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    records: Mutex<HashMap<AccountId, CredentialRecord>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with `records`.
    pub fn with_records(records: impl IntoIterator<Item = CredentialRecord>) -> MedgateResult<Self> {
        let store = Self::new();
        for record in records {
            store.insert(record)?;
        }
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.lock().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(
        &self,
    ) -> MedgateResult<std::sync::MutexGuard<'_, HashMap<AccountId, CredentialRecord>>> {
        self.records.lock().map_err(|e| MedgateError::StoreError {
            reason: format!("credential store lock poisoned: {}", e),
        })
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn get(&self, id: &AccountId) -> MedgateResult<Option<CredentialRecord>> {
        Ok(self.lock()?.get(id).cloned())
    }

    fn find_by_email(&self, role: Role, email: &str) -> MedgateResult<Option<CredentialRecord>> {
        let email = email.trim();
        Ok(self
            .lock()?
            .values()
            .find(|r| r.role() == role && r.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    fn insert(&self, record: CredentialRecord) -> MedgateResult<()> {
        let mut records = self.lock()?;
        let taken = records
            .values()
            .any(|r| r.role() == record.role() && r.email.eq_ignore_ascii_case(&record.email));
        if taken {
            return Err(MedgateError::Conflict {
                reason: format!("a {} account already exists for '{}'", record.role(), record.email),
            });
        }
        if records.contains_key(&record.id) {
            return Err(MedgateError::Conflict {
                reason: format!("account id {} already exists", record.id),
            });
        }

        debug!(account_id = %record.id, role = %record.role(), "credential record inserted");
        records.insert(record.id, record);
        Ok(())
    }

    fn modify(
        &self,
        id: &AccountId,
        apply: &mut dyn FnMut(&mut CredentialRecord) -> MedgateResult<()>,
    ) -> MedgateResult<CredentialRecord> {
        let mut records = self.lock()?;
        let stored = records
            .get_mut(id)
            .ok_or_else(|| MedgateError::account_not_found(id))?;

        let mut working = stored.clone();
        apply(&mut working)?;
        *stored = working.clone();
        Ok(working)
    }
}
