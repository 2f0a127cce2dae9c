//! Append-only traceability ledger.
//!
//! This crate owns all durable state:
//!
//! - The **registry** of organizations, products, and lots
//! - The **event log**: every ownership-changing event, never updated
//!   or deleted
//! - The **code projection**: each virtual code's current owner and
//!   status, rebuilt transactionally alongside every event write
//! - The **stock projection**: in-stock counts per
//!   (product, organization, lot), so availability reads never reduce
//!   the full log
//! - **Advisory holds**: pre-commit quantity reservations that shadow
//!   client carts
//!
//! The write surface is deliberately narrow: [`Ledger::mint_lot`] for
//! production and [`Ledger::commit`] for everything else. A commit is a
//! list of [`EventDraft`]s, each pinning the owner and status its code
//! must still have; validation and application happen atomically under
//! one write lock, and a failed precondition aborts the whole commit
//! with a retryable [`LedgerError::Conflict`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod hold;
mod projection;
mod registry;
mod store;

pub use error::LedgerError;
pub use hold::HoldId;
pub use store::{CommitReceipt, EventDraft, Ledger, MintReceipt};
