//! Error types for the transfer and reversal services.
//!
//! All variants are recoverable at the caller level and surface as
//! user-facing messages; nothing here should crash a process. The
//! ledger's retryable `Conflict` never appears: the services retry it a
//! bounded number of times and then surface the terminal kind.

use thiserror::Error;

use medtrace_core::{BatchId, BatchKind, CodeId, OrgId, OrgKind, ReasonError};
use medtrace_ledger::LedgerError;

/// Error returned by transfer operations (production, shipment,
/// treatment, disposal).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// The requested quantity exceeds what is available.
    #[error("requested {requested} units, only {available} available ({shortfall} short)")]
    InsufficientInventory {
        /// Units requested.
        requested: u32,
        /// Units actually available.
        available: u32,
        /// How many units the request fell short by.
        shortfall: u32,
    },
    /// The quantity was zero (or otherwise not a positive whole number).
    #[error("quantity must be a positive whole number, got {quantity}")]
    InvalidQuantity {
        /// The rejected quantity.
        quantity: i64,
    },
    /// The caller's organization does not hold the referenced codes.
    #[error("organization {org} does not own the referenced codes")]
    NotOwner {
        /// The organization that failed the ownership check.
        org: OrgId,
    },
    /// The organization exists but is not approved for operations.
    #[error("organization {org} is not active")]
    OrganizationNotActive {
        /// The inactive organization.
        org: OrgId,
    },
    /// The operation requires a different organization role.
    #[error("organization {org} must be a {required} for this operation")]
    WrongRole {
        /// The organization with the wrong role.
        org: OrgId,
        /// The role the operation requires.
        required: OrgKind,
    },
    /// Free-text reason validation failed.
    #[error(transparent)]
    Reason(#[from] ReasonError),
    /// A registry or store error.
    #[error(transparent)]
    Ledger(LedgerError),
}

impl From<LedgerError> for TransferError {
    fn from(err: LedgerError) -> Self {
        Self::Ledger(err)
    }
}

/// Error returned by reversal operations (recall, return).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReversalError {
    /// Recall attempted after the window closed.
    #[error("recall window of {limit_hours}h exceeded: {elapsed_hours}h since treatment")]
    TimeWindowExceeded {
        /// Whole hours elapsed since the treatment.
        elapsed_hours: i64,
        /// The configured window.
        limit_hours: i64,
    },
    /// The batch already carries a reversal.
    #[error("batch {batch} is already reversed")]
    AlreadyReversed {
        /// The doubly-targeted batch.
        batch: BatchId,
    },
    /// The caller is not the party entitled to reverse this batch.
    #[error("organization {org} may not reverse batch {batch}")]
    NotOwner {
        /// The rejected caller.
        org: OrgId,
        /// The targeted batch.
        batch: BatchId,
    },
    /// Return blocked: some codes have moved on since the shipment.
    #[error("{} code(s) are no longer held by the receiver", codes.len())]
    CodesNotOwned {
        /// The codes that left the receiver's stock.
        codes: Vec<CodeId>,
    },
    /// The batch kind does not support this reversal.
    #[error("batch {batch} is a {kind} batch and cannot be reversed this way")]
    NotReversible {
        /// The targeted batch.
        batch: BatchId,
        /// Its kind.
        kind: BatchKind,
    },
    /// Free-text reason validation failed.
    #[error(transparent)]
    Reason(#[from] ReasonError),
    /// A registry or store error.
    #[error(transparent)]
    Ledger(LedgerError),
}

impl From<LedgerError> for ReversalError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::AlreadyReversed(batch) => Self::AlreadyReversed { batch },
            other => Self::Ledger(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_already_reversed_maps_to_reversal_kind() {
        let err: ReversalError = LedgerError::AlreadyReversed(BatchId(4)).into();
        assert_eq!(err, ReversalError::AlreadyReversed { batch: BatchId(4) });
    }

    #[test]
    fn reason_errors_pass_through() {
        let err: ReversalError = ReasonError::Required.into();
        assert_eq!(err.to_string(), "a reason is required");
    }
}
