//! Fictional accounts for local runs, the demo, and tests.
//!
//! All data is hardcoded and fictional. Passwords are listed in plain text
//! on purpose so scenarios can sign in.

use chrono::{DateTime, Utc};

use medgate_contracts::{
    account::{CredentialRecord, Profile},
    error::MedgateResult,
    review::ReviewStatus,
    role::Role,
};

/// Credentials of a seeded account.
#[derive(Debug, Clone, Copy)]
pub struct SeedAccount {
    pub role: Role,
    pub email: &'static str,
    pub password: &'static str,
    pub name: &'static str,
}

// ── Accounts ─────────────────────────────────────────────────────────────────

pub const SUPERADMIN: SeedAccount = SeedAccount {
    role: Role::SuperAdmin,
    email: "root@medgate.example",
    password: "superadmin-pass",
    name: "Platform Operator",
};

/// Approved hospital admin; reviews doctors.
pub const HOSPITAL_ADMIN: SeedAccount = SeedAccount {
    role: Role::Admin,
    email: "webber@seattle-grace.example",
    password: "admin-pass",
    name: "Richard Webber",
};

/// Freshly registered doctor, still pending.
pub const PENDING_DOCTOR: SeedAccount = SeedAccount {
    role: Role::Doctor,
    email: "grey@seattle-grace.example",
    password: "doctor-pass",
    name: "Dr. Meredith Grey",
};

/// Doctor already through review.
pub const APPROVED_DOCTOR: SeedAccount = SeedAccount {
    role: Role::Doctor,
    email: "shepherd@seattle-grace.example",
    password: "doctor-pass",
    name: "Dr. Derek Shepherd",
};

pub const PATIENT: SeedAccount = SeedAccount {
    role: Role::Patient,
    email: "denny@example.com",
    password: "patient-pass",
    name: "Denny Duquette",
};

pub const ALL: [SeedAccount; 5] = [
    SUPERADMIN,
    HOSPITAL_ADMIN,
    PENDING_DOCTOR,
    APPROVED_DOCTOR,
    PATIENT,
];

fn profile(account: &SeedAccount) -> Profile {
    match account.role {
        Role::Patient => Profile::Patient {
            phone: Some("+1-206-555-0147".to_string()),
        },
        Role::Doctor => Profile::Doctor {
            specialization: "general surgery".to_string(),
            license_number: format!("WA-{}", account.email.len() * 131),
        },
        Role::Admin => Profile::Admin {
            hospital_name: "Seattle Grace Hospital".to_string(),
        },
        Role::SuperAdmin => Profile::SuperAdmin,
    }
}

/// Build the seeded records, hashing each password with `hash`.
///
/// The admin and the approved doctor start approved; the pending doctor
/// starts as a fresh registration would.
pub fn records(
    hash: impl Fn(&str) -> MedgateResult<String>,
    now: DateTime<Utc>,
) -> MedgateResult<Vec<CredentialRecord>> {
    ALL.iter()
        .map(|account| {
            let mut record = CredentialRecord::register(
                account.email,
                hash(account.password)?,
                account.name,
                profile(account),
                now,
            );
            let pre_approved = account.email == HOSPITAL_ADMIN.email
                || account.email == APPROVED_DOCTOR.email;
            if pre_approved {
                record.review_status = Some(ReviewStatus::Approved);
                record.is_verified = true;
            }
            Ok(record)
        })
        .collect()
}
