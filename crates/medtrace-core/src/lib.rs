//! Core types for medtrace
//!
//! This crate provides the fundamental types used throughout the medtrace
//! project:
//!
//! - [`Organization`] - A party in the supply chain (manufacturer, distributor, hospital)
//! - [`Product`] - A catalog entry owned by one manufacturer
//! - [`Lot`] - One manufacturing batch of a product, the FIFO allocation unit
//! - [`VirtualCode`] - One serialized, individually trackable unit
//! - [`TransferEvent`] - An immutable, append-only ledger entry
//! - [`TransferAction`] - The closed sum of everything that can happen to a code
//! - [`Batch`] - A group of ledger events created by one logical operation
//! - [`Reason`] - Validated free-text justification for reversals and disposal
//!
//! The ledger event log is the sole source of truth for history. A code's
//! current owner and status are a materialized projection of its latest
//! event, never independently mutated.
//!
//! # Example
//!
//! ```
//! use medtrace_core::{ActionKind, CodeStatus, OrgId, Owner, TransferAction};
//!
//! let action = TransferAction::Received { from: OrgId(1), to: OrgId(2) };
//! assert_eq!(action.kind(), ActionKind::Received);
//! assert_eq!(action.owner_after(), Some(Owner::Org(OrgId(2))));
//! assert_eq!(action.status_after(), Some(CodeStatus::InStock));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod batch;
pub mod clock;
pub mod code;
pub mod event;
pub mod ids;
pub mod limits;
pub mod lot;
pub mod org;
pub mod product;
pub mod reason;

pub use batch::{Batch, BatchKind, ReversalInfo};
pub use clock::{Clock, ManualClock, SystemClock};
pub use code::{CodeStatus, Owner, PatientRef, VirtualCode};
pub use event::{ActionKind, TransferAction, TransferEvent};
pub use ids::{BatchId, CodeId, EventId, LotId, OrgId, ProductId};
pub use lot::Lot;
pub use org::{OrgKind, OrgStatus, Organization};
pub use product::{DeactivationReason, Product};
pub use reason::{DisposalReason, Reason, ReasonError};

// Re-export commonly used external types
pub use chrono::{DateTime, NaiveDate, Utc};
