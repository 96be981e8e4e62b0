//! Error taxonomy shared by the server and client halves of MEDGATE.
//!
//! Every fallible operation returns `MedgateResult<T>`. Each variant maps to
//! exactly one HTTP status so errors survive a round trip through the
//! response envelope (`status_code` on the way out, `from_status` on the way
//! back in).
//!
//! A non-approved review status is deliberately absent: it is a gating state
//! the route guard handles, not a failure.

use thiserror::Error;

/// The unified error type for MEDGATE.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MedgateError {
    /// The access token is expired or otherwise unusable. Recoverable via refresh.
    #[error("access token expired or invalid")]
    AuthExpired,

    /// The refresh token is dead. Not recoverable; the client must log out.
    #[error("session invalid: {reason}")]
    SessionInvalid { reason: String },

    /// The account has been deactivated. Terminal until an external unblock.
    #[error("account is blocked")]
    AccountBlocked,

    /// Unknown email/role pair or wrong password. The two are never distinguished.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// A request was malformed or a required field (e.g. a rejection reason) was missing.
    #[error("validation error: {reason}")]
    ValidationError { reason: String },

    /// The referenced entity does not exist.
    #[error("{entity} '{id}' not found")]
    NotFound { entity: String, id: String },

    /// A review action that is not permitted from the record's current status.
    #[error("cannot {action} an account whose review status is {from}")]
    InvalidTransition { from: String, action: String },

    /// The caller is authenticated but not allowed to perform the action.
    #[error("forbidden: {reason}")]
    Forbidden { reason: String },

    /// A uniqueness constraint was violated (e.g. duplicate registration).
    #[error("conflict: {reason}")]
    Conflict { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// The request never produced a usable response.
    #[error("transport error: {reason}")]
    Transport { reason: String },

    /// The credential store failed internally.
    #[error("credential store error: {reason}")]
    StoreError { reason: String },

    /// Hashing a password failed or a stored hash could not be parsed.
    #[error("password hash error: {reason}")]
    PasswordHash { reason: String },
}

impl MedgateError {
    /// HTTP status code used when this error is written to a response.
    pub fn status_code(&self) -> u16 {
        match self {
            MedgateError::AuthExpired | MedgateError::SessionInvalid { .. } => 401,
            MedgateError::InvalidCredentials => 401,
            MedgateError::AccountBlocked | MedgateError::Forbidden { .. } => 403,
            MedgateError::ValidationError { .. } => 400,
            MedgateError::NotFound { .. } => 404,
            MedgateError::InvalidTransition { .. } | MedgateError::Conflict { .. } => 409,
            MedgateError::ConfigError { .. }
            | MedgateError::Transport { .. }
            | MedgateError::StoreError { .. }
            | MedgateError::PasswordHash { .. } => 500,
        }
    }

    /// Rebuild an error from a non-success status and its envelope message.
    ///
    /// A 401 other than a failed login becomes `AuthExpired`: the client
    /// cannot tell which token failed, and the gateway decides whether that
    /// is recoverable.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 if message == MedgateError::InvalidCredentials.to_string() => {
                MedgateError::InvalidCredentials
            }
            401 => MedgateError::AuthExpired,
            403 if message == MedgateError::AccountBlocked.to_string() => MedgateError::AccountBlocked,
            403 => MedgateError::Forbidden { reason: message },
            400 => MedgateError::ValidationError { reason: message },
            404 => MedgateError::NotFound {
                entity: "resource".to_string(),
                id: message,
            },
            409 => MedgateError::Conflict { reason: message },
            _ => MedgateError::Transport {
                reason: format!("unexpected status {}: {}", status, message),
            },
        }
    }

    /// Shorthand for a `ValidationError`.
    pub fn validation(reason: impl Into<String>) -> Self {
        MedgateError::ValidationError { reason: reason.into() }
    }

    /// Shorthand for an account `NotFound`.
    pub fn account_not_found(id: impl ToString) -> Self {
        MedgateError::NotFound {
            entity: "account".to_string(),
            id: id.to_string(),
        }
    }

    /// True for the two token failures the gateway owns.
    pub fn is_session_error(&self) -> bool {
        matches!(
            self,
            MedgateError::AuthExpired | MedgateError::SessionInvalid { .. }
        )
    }
}

/// Convenience alias used throughout the MEDGATE crates.
pub type MedgateResult<T> = Result<T, MedgateError>;
