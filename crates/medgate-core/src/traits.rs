//! Trait seams of the MEDGATE access layer.
//!
//! - `CredentialStore`   — where account records live (server side)
//! - `ReviewAuditWriter` — append-only sink for review transitions
//! - `Clock`             — the single source of "now" for token expiry
//! - `Transport`         — how the client reaches the server
//! - `RoleStore`         — the one string the client persists across reloads
//!
//! Everything that decides access goes through these traits, so tests can
//! swap any of them for a deterministic stand-in.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use medgate_contracts::{
    account::{AccountId, CredentialRecord},
    error::MedgateResult,
    review::ReviewRecord,
    role::Role,
    wire::{ApiRequest, ApiResponse},
};

/// Storage for credential records.
///
/// Records are never deleted through this trait.
pub trait CredentialStore: Send + Sync {
    /// Look up a record by id.
    fn get(&self, id: &AccountId) -> MedgateResult<Option<CredentialRecord>>;

    /// Look up a record by login identity. Emails are unique per role and
    /// compared case-insensitively.
    fn find_by_email(&self, role: Role, email: &str) -> MedgateResult<Option<CredentialRecord>>;

    /// Insert a new record. Fails with `Conflict` if the email is taken for
    /// that role.
    fn insert(&self, record: CredentialRecord) -> MedgateResult<()>;

    /// Atomically read-modify-write one record.
    ///
    /// `apply` runs on a working copy while the store is locked. The copy is
    /// committed only if `apply` returns `Ok`; on `Err` the stored record is
    /// untouched and the error is returned. Fails with `NotFound` if `id` is
    /// unknown.
    fn modify(
        &self,
        id: &AccountId,
        apply: &mut dyn FnMut(&mut CredentialRecord) -> MedgateResult<()>,
    ) -> MedgateResult<CredentialRecord>;
}

/// Append-only sink for applied review transitions.
///
/// A transition whose record cannot be written is not applied.
pub trait ReviewAuditWriter: Send + Sync {
    fn write(&self, record: &ReviewRecord) -> MedgateResult<()>;
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Client-side request transport.
///
/// Returns `Ok` for every response the server produced, whatever its status;
/// `Err` means no response was obtained.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> MedgateResult<ApiResponse>;
}

/// Persistence for the active-role marker the client keeps across reloads.
pub trait RoleStore: Send + Sync {
    fn load(&self) -> MedgateResult<Option<Role>>;
    fn save(&self, role: Role) -> MedgateResult<()>;
    /// Remove the marker. Clearing an absent marker is not an error.
    fn clear(&self) -> MedgateResult<()>;
}
