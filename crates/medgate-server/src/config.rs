//! Server configuration.
//!
//! ```toml
//! [token]
//! access_secret = "change-me-access"
//! refresh_secret = "change-me-refresh"
//!
//! [cookies]
//! production = false
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use medgate_contracts::{
    error::{MedgateError, MedgateResult},
    wire::SameSite,
};
use medgate_token::TokenConfig;

/// How session cookies are flagged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookiePolicy {
    /// `Secure` + `SameSite=Strict` when true, `SameSite=Lax` otherwise.
    #[serde(default)]
    pub production: bool,
}

impl CookiePolicy {
    pub fn secure(&self) -> bool {
        self.production
    }

    pub fn same_site(&self) -> SameSite {
        if self.production {
            SameSite::Strict
        } else {
            SameSite::Lax
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub token: TokenConfig,
    #[serde(default)]
    pub cookies: CookiePolicy,
}

impl ServerConfig {
    /// Fixed development secrets. Never use outside local runs and tests.
    pub fn development() -> Self {
        Self {
            token: TokenConfig::new("dev-access-secret", "dev-refresh-secret"),
            cookies: CookiePolicy::default(),
        }
    }

    pub fn from_toml_str(s: &str) -> MedgateResult<Self> {
        let config: ServerConfig = toml::from_str(s).map_err(|e| MedgateError::ConfigError {
            reason: format!("failed to parse server TOML: {}", e),
        })?;
        config.token.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> MedgateResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| MedgateError::ConfigError {
            reason: format!("failed to read server config '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }
}
