//! # medgate-contracts
//!
//! Shared types, wire formats, and the error taxonomy for the MEDGATE
//! access layer of the hospital platform.
//!
//! Both the server crates and the client session crate import from here.
//! No business logic lives in this crate — only data definitions and the
//! conversions between them.

pub mod account;
pub mod error;
pub mod identity;
pub mod review;
pub mod role;
pub mod token;
pub mod wire;
