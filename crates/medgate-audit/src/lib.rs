//! # medgate-audit
//!
//! Append-only, SHA-256 hash-chained ledger of credential review decisions.
//!
//! Every approve, reject, revision request, and reapply the review state
//! machine applies is written here as a `LedgerEntry` that commits to the
//! entry before it. Rewriting history (a reason, an actor, a status) breaks
//! the chain, which `verify_chain` detects.
//!
//! ```rust,ignore
//! let ledger = Arc::new(InMemoryReviewLedger::new("hospital-reviews"));
//! let machine = ReviewStateMachine::new(store, ledger.clone(), clock);
//! machine.approve(&doctor_id, Some(admin_id))?;
//! assert!(ledger.verify_integrity());
//! ```

pub mod chain;
pub mod entry;
pub mod ledger;

pub use chain::{hash_entry, verify_chain};
pub use entry::{LedgerEntry, LedgerExport};
pub use ledger::InMemoryReviewLedger;

// ── Tests ─────────────────────────────────────────────────────────────────────
