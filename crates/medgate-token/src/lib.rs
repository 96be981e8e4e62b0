//! # medgate-token
//!
//! Issues and validates the MEDGATE session pair.
//!
//! - **Access token**: 15 minutes by default, presented on every request.
//! - **Refresh token**: 7 days by default, used only to mint access tokens.
//!   It is not rotated; see DESIGN.md for why that stays as is.
//!
//! Both carry `{userId, email, role}` and a `use` claim, and are signed
//! with different secrets.

pub mod config;
pub mod password;
pub mod service;

pub use config::TokenConfig;
pub use password::PasswordHasher;
pub use service::TokenService;
