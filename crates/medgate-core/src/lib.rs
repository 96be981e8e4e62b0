//! # medgate-core
//!
//! The trust boundary of the MEDGATE access layer.
//!
//! This crate provides:
//! - The trait seams (`CredentialStore`, `ReviewAuditWriter`, `Clock`,
//!   `Transport`, `RoleStore`)
//! - The `ReviewStateMachine` that owns every change to an account's review
//!   status
//! - In-memory reference implementations of the store and clocks
//!
//! ## Usage
//!
//! ```rust,ignore
//! use medgate_core::{ReviewStateMachine, InMemoryCredentialStore, SystemClock};
//!
//! let machine = ReviewStateMachine::new(store, ledger, Arc::new(SystemClock));
//! machine.reject(&doctor_id, "missing license", Some(admin_id))?;
//! ```

pub mod clock;
pub mod memory;
pub mod review;
pub mod traits;

pub use clock::{ManualClock, SystemClock};
pub use memory::InMemoryCredentialStore;
pub use review::ReviewStateMachine;
