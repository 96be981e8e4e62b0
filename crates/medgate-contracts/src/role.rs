//! Account roles.
//!
//! The role selects the whoami endpoint, the guarded region, and whether the
//! account passes through credential review.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MedgateError;

/// The four account roles of the hospital platform.
///
/// Serialized in lowercase (`"superadmin"` for `SuperAdmin`), which is also
/// the form used in URL segments and the persisted role marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
    Admin,
    SuperAdmin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Patient, Role::Doctor, Role::Admin, Role::SuperAdmin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
            Role::Admin => "admin",
            Role::SuperAdmin => "superadmin",
        }
    }

    /// Doctors and hospital admins must be approved before full access.
    pub fn is_reviewed(&self) -> bool {
        matches!(self, Role::Doctor | Role::Admin)
    }

    /// Return true if an account with this role may approve, reject, or
    /// request revision of an account with role `target`.
    ///
    /// Hospital admins review doctors; only superadmins review admins.
    pub fn may_review(&self, target: Role) -> bool {
        match target {
            Role::Doctor => matches!(self, Role::Admin | Role::SuperAdmin),
            Role::Admin => matches!(self, Role::SuperAdmin),
            Role::Patient | Role::SuperAdmin => false,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = MedgateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "patient" => Ok(Role::Patient),
            "doctor" => Ok(Role::Doctor),
            "admin" => Ok(Role::Admin),
            "superadmin" => Ok(Role::SuperAdmin),
            other => Err(MedgateError::validation(format!("unknown role '{}'", other))),
        }
    }
}
