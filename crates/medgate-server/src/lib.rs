//! # medgate-server
//!
//! In-process implementation of the MEDGATE auth endpoints.
//!
//! [`AuthServer`] owns the credential store, the token service, the review
//! state machine and its ledger, and answers [`ApiRequest`]s with the
//! standard envelope. [`InProcessTransport`] connects a client to it through
//! a cookie jar, so the session layer can be exercised end to end without a
//! network.
//!
//! ```rust,ignore
//! let server = Arc::new(AuthServer::seeded(&ServerConfig::development(), Arc::new(SystemClock))?);
//! let client = SessionClient::new(Arc::new(InProcessTransport::new(server)), roles);
//! ```
//!
//! [`ApiRequest`]: medgate_contracts::wire::ApiRequest

pub mod config;
pub mod cookies;
pub mod seed;
pub mod server;
pub mod transport;

pub use config::{CookiePolicy, ServerConfig};
pub use server::AuthServer;
pub use transport::InProcessTransport;

// ── Tests ─────────────────────────────────────────────────────────────────────
