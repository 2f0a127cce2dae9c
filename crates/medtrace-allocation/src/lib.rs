//! FIFO lot-allocation engine.
//!
//! Given a snapshot of available stock, the engine decides *which*
//! physical units satisfy a requested quantity:
//!
//! - Candidate lots are walked oldest `manufacture_date` first, ties
//!   broken by lot id, consuming available codes until the quantity is
//!   satisfied or the lots are exhausted.
//! - Within a lot, codes are taken in public-token order, so the same
//!   snapshot always yields the same selection.
//! - A shortage is reported as a [`shortfall`](AllocationPlan::shortfall)
//!   count rather than an error: the caller decides whether a partial
//!   plan is acceptable (the transfer service never accepts one).
//!
//! The engine is pure. It never sees the ledger; the caller produces the
//! snapshot (already filtered to in-stock codes owned by the requesting
//! organization, minus advisory holds) and re-validates at commit time.
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use medtrace_allocation::{allocate, AvailableLot};
//! use medtrace_core::{CodeId, LotId};
//!
//! let jan = AvailableLot::new(
//!     LotId(1),
//!     NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
//!     vec![CodeId(1), CodeId(2)],
//! );
//! let feb = AvailableLot::new(
//!     LotId(2),
//!     NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
//!     vec![CodeId(3), CodeId(4)],
//! );
//!
//! // The February lot is listed first, but January stock wins.
//! let plan = allocate(&[feb, jan], 3);
//! assert!(plan.is_complete());
//! assert_eq!(
//!     plan.selections.iter().map(|s| s.code).collect::<Vec<_>>(),
//!     vec![CodeId(1), CodeId(2), CodeId(3)],
//! );
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use medtrace_core::{CodeId, LotId};

/// One lot's worth of allocatable stock, as seen by the engine.
///
/// `codes` must already be restricted to units the requesting
/// organization holds in stock, sorted ascending by public token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailableLot {
    /// The lot the codes belong to.
    pub lot: LotId,
    /// FIFO sort key.
    pub manufacture_date: NaiveDate,
    /// Allocatable codes, in token order.
    pub codes: Vec<CodeId>,
}

impl AvailableLot {
    /// Bundle a lot's allocatable codes with its FIFO key.
    #[must_use]
    pub const fn new(lot: LotId, manufacture_date: NaiveDate, codes: Vec<CodeId>) -> Self {
        Self {
            lot,
            manufacture_date,
            codes,
        }
    }

    /// Number of allocatable codes in this lot.
    #[must_use]
    pub fn available(&self) -> u32 {
        self.codes.len() as u32
    }
}

/// One selected unit: the code and the lot it was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// The selected code.
    pub code: CodeId,
    /// The lot it came from.
    pub lot: LotId,
}

/// The engine's answer: which codes to claim, and how many units short
/// the snapshot was.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AllocationPlan {
    /// Selected codes, in claim order.
    pub selections: Vec<Selection>,
    /// Units requested beyond what was available. Zero when satisfied.
    pub shortfall: u32,
}

impl AllocationPlan {
    /// Whether the full requested quantity was covered.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.shortfall == 0
    }

    /// Number of units the plan covers.
    #[must_use]
    pub fn quantity(&self) -> u32 {
        self.selections.len() as u32
    }
}

/// Select up to `quantity` codes from the snapshot, oldest lot first.
///
/// Lots are ordered by `manufacture_date` ascending with ties broken by
/// lot id; the input order of `available` does not matter. For
/// lot-specific allocation, pass a snapshot containing only that lot.
#[must_use]
pub fn allocate(available: &[AvailableLot], quantity: u32) -> AllocationPlan {
    let mut order: Vec<&AvailableLot> = available.iter().filter(|l| !l.codes.is_empty()).collect();
    order.sort_by_key(|l| (l.manufacture_date, l.lot));

    let mut remaining = quantity;
    let mut selections = Vec::with_capacity(quantity as usize);

    for lot in order {
        if remaining == 0 {
            break;
        }
        let take = remaining.min(lot.available()) as usize;
        selections.extend(lot.codes[..take].iter().map(|&code| Selection {
            code,
            lot: lot.lot,
        }));
        remaining -= take as u32;
    }

    AllocationPlan {
        selections,
        shortfall: remaining,
    }
}
