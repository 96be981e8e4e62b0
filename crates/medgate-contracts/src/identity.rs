//! Identity snapshots returned by whoami and login.
//!
//! An `Identity` is a role-tagged union. On the wire it is a flat JSON object
//! discriminated by its `role` field:
//!
//! ```json
//! { "role": "doctor", "id": "…", "email": "…", "name": "…", "isActive": true,
//!   "specialization": "…", "licenseNumber": "…", "reviewStatus": "pending",
//!   "rejectionReason": null, "isVerified": false }
//! ```

use serde::{Deserialize, Serialize};

use crate::{account::AccountId, review::ReviewStatus, role::Role};

/// Fields every identity carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityBase {
    pub id: AccountId,
    pub email: String,
    pub name: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientIdentity {
    #[serde(flatten)]
    pub base: IdentityBase,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorIdentity {
    #[serde(flatten)]
    pub base: IdentityBase,
    pub specialization: String,
    pub license_number: String,
    pub review_status: ReviewStatus,
    pub rejection_reason: Option<String>,
    pub is_verified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminIdentity {
    #[serde(flatten)]
    pub base: IdentityBase,
    pub hospital_name: String,
    pub review_status: ReviewStatus,
    pub rejection_reason: Option<String>,
    pub is_verified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuperAdminIdentity {
    #[serde(flatten)]
    pub base: IdentityBase,
}

/// The identity of a signed-in account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Identity {
    Patient(PatientIdentity),
    Doctor(DoctorIdentity),
    Admin(AdminIdentity),
    SuperAdmin(SuperAdminIdentity),
}

impl Identity {
    pub fn base(&self) -> &IdentityBase {
        match self {
            Identity::Patient(p) => &p.base,
            Identity::Doctor(d) => &d.base,
            Identity::Admin(a) => &a.base,
            Identity::SuperAdmin(s) => &s.base,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Identity::Patient(_) => Role::Patient,
            Identity::Doctor(_) => Role::Doctor,
            Identity::Admin(_) => Role::Admin,
            Identity::SuperAdmin(_) => Role::SuperAdmin,
        }
    }

    pub fn id(&self) -> AccountId {
        self.base().id
    }

    pub fn is_active(&self) -> bool {
        self.base().is_active
    }

    /// Review status for gating; patients and superadmins are always approved.
    pub fn review_status(&self) -> ReviewStatus {
        match self {
            Identity::Doctor(d) => d.review_status,
            Identity::Admin(a) => a.review_status,
            Identity::Patient(_) | Identity::SuperAdmin(_) => ReviewStatus::Approved,
        }
    }

    /// Reason given by the approver on the last reject or revision request.
    pub fn rejection_reason(&self) -> Option<&str> {
        match self {
            Identity::Doctor(d) => d.rejection_reason.as_deref(),
            Identity::Admin(a) => a.rejection_reason.as_deref(),
            Identity::Patient(_) | Identity::SuperAdmin(_) => None,
        }
    }
}
