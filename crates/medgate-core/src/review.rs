//! The credential review state machine.
//!
//! ```text
//!            approve            ┌──────────┐
//!        ┌─────────────────────▶│ approved │  (terminal here)
//!        │                      └──────────┘
//!  ┌─────────┐  reject(reason)  ┌──────────┐
//!  │ pending │─────────────────▶│ rejected │──┐
//!  └─────────┘                  └──────────┘  │
//!    ▲   │   request_revision   ┌──────────┐  │
//!    │   └─────────────────────▶│ revision │──┤
//!    │                          └──────────┘  │
//!    └──────────────── reapply ───────────────┘
//! ```
//!
//! Approver actions and the self-service `reapply` are the only writers of
//! `review_status`. Suspension of an approved account is a separate concern
//! expressed through `is_active`.
//!
//! Every transition runs inside `CredentialStore::modify`, and its ledger
//! record is written before the new state is committed: a transition that
//! cannot be audited does not happen.

use std::sync::Arc;

use tracing::{info, warn};

use medgate_contracts::{
    account::{AccountId, CredentialRecord},
    error::{MedgateError, MedgateResult},
    review::{ReviewAction, ReviewRecord, ReviewStatus},
};

use crate::traits::{Clock, CredentialStore, ReviewAuditWriter};

/// The status `action` leads to from `from`, or `None` if the transition is
/// not in the table.
pub fn next_status(from: ReviewStatus, action: &ReviewAction) -> Option<ReviewStatus> {
    use ReviewStatus::*;

    match (from, action) {
        (Pending, ReviewAction::Approve) => Some(Approved),
        (Pending, ReviewAction::Reject { .. }) => Some(Rejected),
        (Pending, ReviewAction::RequestRevision { .. }) => Some(Revision),
        (Rejected | Revision, ReviewAction::Reapply) => Some(Pending),
        _ => None,
    }
}

/// Drives review transitions against a credential store.
pub struct ReviewStateMachine {
    store: Arc<dyn CredentialStore>,
    audit: Arc<dyn ReviewAuditWriter>,
    clock: Arc<dyn Clock>,
}

impl ReviewStateMachine {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        audit: Arc<dyn ReviewAuditWriter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { store, audit, clock }
    }

    /// Approve a pending account: status → approved, `is_active` forced
    /// true, verified flag set.
    pub fn approve(&self, id: &AccountId, actor: Option<AccountId>) -> MedgateResult<CredentialRecord> {
        self.apply(id, ReviewAction::Approve, actor)
    }

    /// Reject a pending account: status → rejected, `is_active` → false,
    /// reason stored.
    pub fn reject(
        &self,
        id: &AccountId,
        reason: impl Into<String>,
        actor: Option<AccountId>,
    ) -> MedgateResult<CredentialRecord> {
        self.apply(id, ReviewAction::Reject { reason: reason.into() }, actor)
    }

    /// Send a pending account back for changes: status → revision, reason
    /// stored, `is_active` unchanged.
    pub fn request_revision(
        &self,
        id: &AccountId,
        reason: impl Into<String>,
        actor: Option<AccountId>,
    ) -> MedgateResult<CredentialRecord> {
        self.apply(id, ReviewAction::RequestRevision { reason: reason.into() }, actor)
    }

    /// Self-service return to pending from rejected or revision. Clears the
    /// reason; no validation beyond the account existing.
    pub fn reapply(&self, id: &AccountId) -> MedgateResult<CredentialRecord> {
        self.apply(id, ReviewAction::Reapply, Some(*id))
    }

    /// Apply `action` to the account `id`.
    ///
    /// # Errors
    ///
    /// - `ValidationError` if a reject/revision reason is blank (checked first)
    /// - `NotFound` if the account does not exist
    /// - `InvalidTransition` if the account is not reviewed or the action is
    ///   not allowed from its current status
    /// - any error from the audit writer; the record is then left untouched
    pub fn apply(
        &self,
        id: &AccountId,
        action: ReviewAction,
        actor: Option<AccountId>,
    ) -> MedgateResult<CredentialRecord> {
        let action = normalize_reason(action)?;
        let now = self.clock.now();

        let result = self.store.modify(id, &mut |record: &mut CredentialRecord| {
            let from = record.review_status.ok_or_else(|| MedgateError::InvalidTransition {
                from: format!("not reviewed ({})", record.role()),
                action: action.name().to_string(),
            })?;

            let to = next_status(from, &action).ok_or_else(|| MedgateError::InvalidTransition {
                from: from.to_string(),
                action: action.name().to_string(),
            })?;

            match &action {
                ReviewAction::Approve => {
                    record.is_active = true;
                    record.is_verified = true;
                    record.rejection_reason = None;
                }
                ReviewAction::Reject { reason } => {
                    record.is_active = false;
                    record.rejection_reason = Some(reason.clone());
                }
                ReviewAction::RequestRevision { reason } => {
                    record.rejection_reason = Some(reason.clone());
                }
                ReviewAction::Reapply => {
                    // Rejection is what deactivated the account.
                    if from == ReviewStatus::Rejected {
                        record.is_active = true;
                    }
                    record.rejection_reason = None;
                }
            }
            record.review_status = Some(to);
            record.updated_at = now;

            self.audit.write(&ReviewRecord {
                account_id: record.id,
                role: record.role(),
                action: action.clone(),
                from,
                to,
                actor,
                timestamp: now,
            })
        });

        match &result {
            Ok(record) => info!(
                account_id = %id,
                action = action.name(),
                status = %record.effective_review_status(),
                is_active = record.is_active,
                "review transition applied"
            ),
            Err(e) => warn!(
                account_id = %id,
                action = action.name(),
                error = %e,
                "review transition refused"
            ),
        }
        result
    }
}

/// Trim the reason of reject/revision actions and refuse blank ones.
fn normalize_reason(action: ReviewAction) -> MedgateResult<ReviewAction> {
    let check = |reason: String, name: &str| {
        let trimmed = reason.trim().to_string();
        if trimmed.is_empty() {
            Err(MedgateError::validation(format!("a reason is required to {}", name)))
        } else {
            Ok(trimmed)
        }
    };

    Ok(match action {
        ReviewAction::Reject { reason } => ReviewAction::Reject {
            reason: check(reason, "reject")?,
        },
        ReviewAction::RequestRevision { reason } => ReviewAction::RequestRevision {
            reason: check(reason, "request-revision")?,
        },
        other => other,
    })
}

// ── Tests ────────────────────────────────────────────────────────────────────
