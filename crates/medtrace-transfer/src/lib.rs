//! Transfer and reversal services.
//!
//! This crate implements the custody-changing operations of the
//! traceability core:
//!
//! - [`TransferService`] - production registration, shipment, treatment,
//!   disposal. Each call validates the request, allocates concrete
//!   codes, and commits the whole batch atomically; partial transfers
//!   are never a valid end state.
//! - [`ReversalService`] - recall (hospital-initiated, time-boxed) and
//!   return (receiver-initiated, unbounded). Reversals append
//!   compensating events; ledger history is never edited.
//! - [`NotificationSink`] - the post-commit seam to external delivery
//!   (SMS, KakaoTalk). A failed dispatch is logged, never propagated:
//!   a committed transfer stays committed.
//!
//! # Error handling
//!
//! Every failure is a typed, recoverable error ([`TransferError`],
//! [`ReversalError`]). Losing an allocation race against a concurrent
//! operation is retried internally a bounded number of times before
//! surfacing as `InsufficientInventory`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod notify;
mod reversal;
mod transfer;

pub use error::{ReversalError, TransferError};
pub use notify::{NoopSink, Notification, NotificationSink, NotifyError, RecordingSink};
pub use reversal::{ReversalReceipt, ReversalService};
pub use transfer::{
    DisposalRequest, ShipmentRequest, StockSelector, TransferReceipt, TransferService,
    TreatmentRequest,
};
