//! Credential review types.
//!
//! Doctor and hospital-admin accounts move through a review lifecycle before
//! they get full access. The transition table itself lives in
//! `medgate-core::review`; this module only defines the vocabulary.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{account::AccountId, role::Role};

/// Verification state of a reviewed account.
///
/// Patients and superadmins never carry one and are treated as `Approved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
    Revision,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
            ReviewStatus::Revision => "revision",
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, ReviewStatus::Approved)
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An action that moves a record through the review lifecycle.
///
/// `Reject` and `RequestRevision` carry the reason shown to the applicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum ReviewAction {
    Approve,
    Reject { reason: String },
    RequestRevision { reason: String },
    Reapply,
}

impl ReviewAction {
    /// Stable name, also the last segment of the action's endpoint path.
    pub fn name(&self) -> &'static str {
        match self {
            ReviewAction::Approve => "approve",
            ReviewAction::Reject { .. } => "reject",
            ReviewAction::RequestRevision { .. } => "request-revision",
            ReviewAction::Reapply => "reapply",
        }
    }

    /// The reason attached to the action, if it carries one.
    pub fn reason(&self) -> Option<&str> {
        match self {
            ReviewAction::Reject { reason } | ReviewAction::RequestRevision { reason } => {
                Some(reason.as_str())
            }
            ReviewAction::Approve | ReviewAction::Reapply => None,
        }
    }

    /// True for the self-service action; everything else is approver-driven.
    pub fn is_self_service(&self) -> bool {
        matches!(self, ReviewAction::Reapply)
    }
}

/// One applied review transition, as written to the review ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRecord {
    /// The account whose status changed.
    pub account_id: AccountId,
    /// Role of that account (doctor or admin).
    pub role: Role,
    /// What was done.
    pub action: ReviewAction,
    /// Status before the action.
    pub from: ReviewStatus,
    /// Status after the action.
    pub to: ReviewStatus,
    /// Who did it. For `Reapply` this is the account itself.
    pub actor: Option<AccountId>,
    /// Wall-clock time the transition was applied (UTC).
    pub timestamp: DateTime<Utc>,
}
