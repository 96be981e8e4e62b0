//! Token configuration.
//!
//! ```toml
//! issuer = "medgate"
//! access_secret = "change-me-access"
//! refresh_secret = "change-me-refresh"
//! access_ttl_secs = 900        # 15 minutes
//! refresh_ttl_secs = 604800    # 7 days
//! ```

use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use medgate_contracts::error::{MedgateError, MedgateResult};

fn default_issuer() -> String {
    "medgate".to_string()
}

fn default_access_ttl() -> i64 {
    15 * 60
}

fn default_refresh_ttl() -> i64 {
    7 * 24 * 60 * 60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// HMAC secret for access tokens.
    pub access_secret: String,

    /// HMAC secret for refresh tokens. Must differ from `access_secret`.
    pub refresh_secret: String,

    #[serde(default = "default_access_ttl")]
    pub access_ttl_secs: i64,

    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl_secs: i64,
}

impl TokenConfig {
    /// A config with the default issuer and TTLs.
    pub fn new(access_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        Self {
            issuer: default_issuer(),
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_ttl_secs: default_access_ttl(),
            refresh_ttl_secs: default_refresh_ttl(),
        }
    }

    /// Parse `s` as TOML and validate the result.
    pub fn from_toml_str(s: &str) -> MedgateResult<Self> {
        let config: TokenConfig = toml::from_str(s).map_err(|e| MedgateError::ConfigError {
            reason: format!("failed to parse token TOML: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> MedgateResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| MedgateError::ConfigError {
            reason: format!("failed to read token config '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Refuse configurations that would weaken the session pair.
    pub fn validate(&self) -> MedgateResult<()> {
        let fail = |reason: &str| {
            Err(MedgateError::ConfigError {
                reason: reason.to_string(),
            })
        };

        if self.access_secret.is_empty() || self.refresh_secret.is_empty() {
            return fail("token secrets must not be empty");
        }
        if self.access_secret == self.refresh_secret {
            return fail("access and refresh secrets must differ");
        }
        if self.access_ttl_secs <= 0 {
            return fail("access_ttl_secs must be positive");
        }
        if self.access_ttl_secs >= self.refresh_ttl_secs {
            return fail("access token TTL must be shorter than refresh token TTL");
        }
        Ok(())
    }

    pub fn access_ttl(&self) -> Duration {
        Duration::seconds(self.access_ttl_secs)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::seconds(self.refresh_ttl_secs)
    }
}
