//! Argon2id password hashes in PHC string form
//! (`$argon2id$v=19$m=...,t=...,p=...$<salt>$<hash>`).

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Argon2,
};

use medgate_contracts::error::{MedgateError, MedgateResult};

/// Hashes and checks account passwords.
#[derive(Clone, Default)]
pub struct PasswordHasher {
    argon: Argon2<'static>,
}

impl PasswordHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash `password` with a fresh random salt.
    pub fn hash(&self, password: &str) -> MedgateResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| MedgateError::PasswordHash {
                reason: e.to_string(),
            })?;
        Ok(hash.to_string())
    }

    /// Check `password` against a PHC-encoded hash. The cost parameters
    /// come from the hash itself. Malformed hashes never match.
    pub fn verify(encoded: &str, password: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(encoded) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}
