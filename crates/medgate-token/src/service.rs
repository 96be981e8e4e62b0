//! Token issuance and verification.
//!
//! Access and refresh tokens are HS256 JWTs signed with separate secrets.
//! Expiry is checked against the injected `Clock` rather than by the JWT
//! library, so tests and the demo can expire tokens by moving a clock.

use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::{debug, info, warn};

use medgate_contracts::{
    account::CredentialRecord,
    error::{MedgateError, MedgateResult},
    token::{Claims, SessionPair, TokenUse},
};
use medgate_core::traits::Clock;

use crate::{config::TokenConfig, password::PasswordHasher};

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Mints and validates the session pair.
pub struct TokenService {
    access: KeyPair,
    refresh: KeyPair,
    issuer: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
    hasher: PasswordHasher,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    /// Build a service from a validated config.
    pub fn new(config: &TokenConfig, clock: Arc<dyn Clock>) -> MedgateResult<Self> {
        config.validate()?;
        Ok(Self {
            access: KeyPair::from_secret(&config.access_secret),
            refresh: KeyPair::from_secret(&config.refresh_secret),
            issuer: config.issuer.clone(),
            access_ttl: config.access_ttl(),
            refresh_ttl: config.refresh_ttl(),
            hasher: PasswordHasher::new(),
            clock,
        })
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Hash a password for storage.
    pub fn hash_password(&self, password: &str) -> MedgateResult<String> {
        self.hasher.hash(password)
    }

    /// Check `password` against `record` and mint a session pair.
    ///
    /// The password is checked before the active flag, so a blocked status
    /// is only revealed to someone who knows the password.
    ///
    /// # Errors
    ///
    /// - `InvalidCredentials` if the password does not match
    /// - `AccountBlocked` if the account is inactive
    pub fn issue(&self, record: &CredentialRecord, password: &str) -> MedgateResult<SessionPair> {
        if !PasswordHasher::verify(&record.password_hash, password) {
            warn!(account_id = %record.id, role = %record.role(), "password mismatch");
            return Err(MedgateError::InvalidCredentials);
        }
        if !record.is_active {
            warn!(account_id = %record.id, role = %record.role(), "login refused for blocked account");
            return Err(MedgateError::AccountBlocked);
        }

        let pair = SessionPair {
            access_token: self.mint(record_claims(record), TokenUse::Access)?,
            refresh_token: self.mint(record_claims(record), TokenUse::Refresh)?,
        };
        info!(account_id = %record.id, role = %record.role(), "session pair issued");
        Ok(pair)
    }

    /// Validate an access token's signature, issuer, use, and expiry.
    ///
    /// Every failure is reported as `AuthExpired`: the caller's only
    /// recovery is to refresh.
    pub fn verify(&self, access_token: &str) -> MedgateResult<Claims> {
        self.decode(access_token, TokenUse::Access).map_err(|reason| {
            debug!(reason = %reason, "access token rejected");
            MedgateError::AuthExpired
        })
    }

    /// Validate a refresh token. Failures are `SessionInvalid`.
    pub fn verify_refresh(&self, refresh_token: &str) -> MedgateResult<Claims> {
        self.decode(refresh_token, TokenUse::Refresh).map_err(|reason| {
            debug!(reason = %reason, "refresh token rejected");
            MedgateError::SessionInvalid { reason }
        })
    }

    /// Mint a new access token from a valid refresh token.
    ///
    /// The refresh token itself is not rotated and stays valid until its
    /// own expiry.
    pub fn refresh(&self, refresh_token: &str) -> MedgateResult<String> {
        let claims = self.verify_refresh(refresh_token)?;
        let identity = IdentityClaims {
            user_id: claims.user_id,
            email: claims.email,
            role: claims.role,
        };
        let access_token = self.mint(identity, TokenUse::Access)?;
        info!(account_id = %claims.user_id, role = %claims.role, "access token refreshed");
        Ok(access_token)
    }

    fn mint(&self, identity: IdentityClaims, token_use: TokenUse) -> MedgateResult<String> {
        let now = self.clock.now();
        let (keys, ttl) = match token_use {
            TokenUse::Access => (&self.access, self.access_ttl),
            TokenUse::Refresh => (&self.refresh, self.refresh_ttl),
        };

        let claims = Claims {
            sub: identity.user_id.to_string(),
            user_id: identity.user_id,
            email: identity.email,
            role: identity.role,
            token_use,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding).map_err(|e| {
            MedgateError::ConfigError {
                reason: format!("failed to sign token: {}", e),
            }
        })
    }

    fn decode(&self, token: &str, expected: TokenUse) -> Result<Claims, String> {
        let keys = match expected {
            TokenUse::Access => &self.access,
            TokenUse::Refresh => &self.refresh,
        };

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        let claims = decode::<Claims>(token, &keys.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| e.to_string())?;

        if claims.token_use != expected {
            return Err(format!("expected a {:?} token", expected));
        }
        if self.clock.now().timestamp() >= claims.exp {
            return Err("token expired".to_string());
        }
        Ok(claims)
    }
}

/// The identity part of the claims: what both tokens assert.
struct IdentityClaims {
    user_id: medgate_contracts::account::AccountId,
    email: String,
    role: medgate_contracts::role::Role,
}

fn record_claims(record: &CredentialRecord) -> IdentityClaims {
    IdentityClaims {
        user_id: record.id,
        email: record.email.clone(),
        role: record.role(),
    }
}
