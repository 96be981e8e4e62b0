//! # medgate-guard
//!
//! Per-role route guard for the MEDGATE front end.
//!
//! ## Overview
//!
//! Each role owns a protected region (`/patient`, `/doctor`, `/admin`,
//! `/superadmin`). [`RouteGuard`] combines the session view with the
//! account's review status and returns a [`GuardDecision`]: render, show a
//! loading placeholder, or redirect.
//!
//! Regions are declared in TOML. The built-in table lives in
//! `routes/hospital.toml`:
//!
//! ```rust,ignore
//! let guard = RouteGuard::hospital()?;
//! match guard.evaluate(Role::Doctor, &view, "/doctor/dashboard") {
//!     GuardDecision::Render => { /* show the page */ }
//!     other => { /* follow other.redirect() */ }
//! }
//! ```
//!
//! ## Allow-lists
//!
//! A reviewed account that is not yet approved only sees its review-pending
//! page, plus the paths its region's `allow` entries open for its current
//! status. Entries match exactly or as a `/`-delimited prefix.

pub mod engine;
pub mod routes;

pub use engine::{review_message, GuardDecision, RouteGuard, SessionView, BLOCKED_MESSAGE};
pub use routes::{AllowEntry, RegionRoutes, RouteConfig};

// ── Tests ─────────────────────────────────────────────────────────────────────
