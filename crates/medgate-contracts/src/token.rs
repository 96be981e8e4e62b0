//! Token claims and the session pair.

use serde::{Deserialize, Serialize};

use crate::{account::AccountId, role::Role};

/// Which half of the session pair a token belongs to.
///
/// Stamped into every token so an access token can never be presented as a
/// refresh token or the other way round, even if the secrets were shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenUse {
    Access,
    Refresh,
}

/// Claims carried by both tokens of a session pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the account id as a string.
    pub sub: String,
    /// Account id.
    #[serde(rename = "userId")]
    pub user_id: AccountId,
    pub email: String,
    pub role: Role,
    #[serde(rename = "use")]
    pub token_use: TokenUse,
    /// Expiration, seconds since the Unix epoch.
    pub exp: i64,
    /// Issued at, seconds since the Unix epoch.
    pub iat: i64,
    pub iss: String,
    /// Unique token id.
    pub jti: String,
}

/// The two tokens minted at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPair {
    pub access_token: String,
    pub refresh_token: String,
}
