//! Credential records: the server-side account row.
//!
//! Records are created at registration and mutated only by review actions.
//! This subsystem never deletes them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    identity::{
        AdminIdentity, DoctorIdentity, Identity, IdentityBase, PatientIdentity,
        SuperAdminIdentity,
    },
    review::ReviewStatus,
    role::Role,
};

/// Stable identifier of an account, shared by every role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub uuid::Uuid);

impl AccountId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Role-specific profile fields.
///
/// The variant determines the account's role, so a record can never carry a
/// role that disagrees with its profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Profile {
    Patient {
        phone: Option<String>,
    },
    Doctor {
        specialization: String,
        license_number: String,
    },
    Admin {
        hospital_name: String,
    },
    SuperAdmin,
}

impl Profile {
    pub fn role(&self) -> Role {
        match self {
            Profile::Patient { .. } => Role::Patient,
            Profile::Doctor { .. } => Role::Doctor,
            Profile::Admin { .. } => Role::Admin,
            Profile::SuperAdmin => Role::SuperAdmin,
        }
    }
}

/// A stored account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub id: AccountId,
    pub email: String,
    /// Encoded password hash; never leaves the server.
    pub password_hash: String,
    pub name: String,
    /// False once an account is blocked or rejected.
    pub is_active: bool,
    /// Set when an approver approves the account.
    pub is_verified: bool,
    /// `Some` for doctors and admins, `None` for the implicitly approved roles.
    pub review_status: Option<ReviewStatus>,
    pub rejection_reason: Option<String>,
    pub profile: Profile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CredentialRecord {
    /// Build the record created by a fresh registration.
    ///
    /// Reviewed roles start `pending`; every account starts active.
    pub fn register(
        email: impl Into<String>,
        password_hash: impl Into<String>,
        name: impl Into<String>,
        profile: Profile,
        now: DateTime<Utc>,
    ) -> Self {
        let review_status = profile.role().is_reviewed().then_some(ReviewStatus::Pending);
        Self {
            id: AccountId::new(),
            email: email.into(),
            password_hash: password_hash.into(),
            name: name.into(),
            is_active: true,
            is_verified: review_status.is_none(),
            review_status,
            rejection_reason: None,
            profile,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn role(&self) -> Role {
        self.profile.role()
    }

    /// The status the guard acts on: unreviewed roles count as approved.
    pub fn effective_review_status(&self) -> ReviewStatus {
        self.review_status.unwrap_or(ReviewStatus::Approved)
    }

    /// Build the identity snapshot returned by whoami and login.
    pub fn identity(&self) -> Identity {
        let base = IdentityBase {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            is_active: self.is_active,
        };
        let review_status = self.effective_review_status();

        match &self.profile {
            Profile::Patient { phone } => Identity::Patient(PatientIdentity {
                base,
                phone: phone.clone(),
            }),
            Profile::Doctor {
                specialization,
                license_number,
            } => Identity::Doctor(DoctorIdentity {
                base,
                specialization: specialization.clone(),
                license_number: license_number.clone(),
                review_status,
                rejection_reason: self.rejection_reason.clone(),
                is_verified: self.is_verified,
            }),
            Profile::Admin { hospital_name } => Identity::Admin(AdminIdentity {
                base,
                hospital_name: hospital_name.clone(),
                review_status,
                rejection_reason: self.rejection_reason.clone(),
                is_verified: self.is_verified,
            }),
            Profile::SuperAdmin => Identity::SuperAdmin(SuperAdminIdentity { base }),
        }
    }
}
