//! Ledger-level error types.

use thiserror::Error;

use medtrace_core::{BatchId, CodeId, LotId, OrgId, ProductId};

use crate::hold::HoldId;

/// Error returned by registry lookups and ledger commits.
///
/// `Conflict` is the only retryable variant: it means a precondition on
/// a specific code no longer held when the write lock was taken, i.e.
/// the caller lost an allocation race and should re-read and retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// No organization with this id.
    #[error("unknown organization: {0}")]
    UnknownOrganization(OrgId),
    /// No product with this id.
    #[error("unknown product: {0}")]
    UnknownProduct(ProductId),
    /// No lot with this id.
    #[error("unknown lot: {0}")]
    UnknownLot(LotId),
    /// No virtual code with this id.
    #[error("unknown code: {0}")]
    UnknownCode(CodeId),
    /// No batch with this id.
    #[error("unknown batch: {0}")]
    UnknownBatch(BatchId),
    /// No hold with this id.
    #[error("unknown hold: {0}")]
    UnknownHold(HoldId),
    /// The organization registering a product is not a manufacturer.
    #[error("organization {0} is not a manufacturer")]
    NotAManufacturer(OrgId),
    /// New production attempted against a deactivated product.
    #[error("product {0} is deactivated")]
    ProductInactive(ProductId),
    /// A code named in a commit no longer satisfies its precondition;
    /// the caller lost a concurrent race and may retry.
    #[error("code {code} changed concurrently")]
    Conflict {
        /// The code whose owner or status no longer matched.
        code: CodeId,
    },
    /// A reversal commit targeted a batch that is already reversed.
    #[error("batch {0} is already reversed")]
    AlreadyReversed(BatchId),
    /// A commit carried no event drafts.
    #[error("commit contains no events")]
    EmptyCommit,
    /// A hold request exceeded the quantity currently available.
    #[error("cannot hold {requested} units, only {available} available")]
    HoldExceedsStock {
        /// Units requested for the hold.
        requested: u32,
        /// Units actually available (stock minus existing holds).
        available: u32,
    },
}
