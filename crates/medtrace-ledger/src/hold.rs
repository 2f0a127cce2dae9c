//! Advisory holds: pre-commit quantity reservations.
//!
//! A hold is the server-side shadow of a client cart line: a *count* of
//! units against a (product, organization, optional lot), never a set of
//! code ids. Holds reduce reported availability so concurrent carts do
//! not oversell each other, but they are advisory only; the commit path
//! re-validates every selected code under the write lock regardless.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use medtrace_core::{LotId, OrgId, ProductId};

/// Handle to an advisory hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HoldId(pub u64);

impl fmt::Display for HoldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One held quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Hold {
    pub product: ProductId,
    pub org: OrgId,
    pub lot: Option<LotId>,
    pub quantity: u32,
}

/// All live holds.
#[derive(Debug, Default)]
pub(crate) struct HoldBook {
    next: u64,
    holds: HashMap<HoldId, Hold>,
}

impl HoldBook {
    pub fn place(&mut self, hold: Hold) -> HoldId {
        self.next += 1;
        let id = HoldId(self.next);
        self.holds.insert(id, hold);
        id
    }

    pub fn release(&mut self, id: HoldId) -> Option<Hold> {
        self.holds.remove(&id)
    }

    /// Total held units counting against (product, org, lot).
    ///
    /// A product-level hold (no lot) counts against every lot of the
    /// product; a lot-level hold counts only against that lot.
    pub fn held(&self, product: ProductId, org: OrgId, lot: Option<LotId>, ignore: Option<HoldId>) -> u32 {
        self.holds
            .iter()
            .filter(|(id, _)| Some(**id) != ignore)
            .filter(|(_, h)| h.product == product && h.org == org)
            .filter(|(_, h)| match (h.lot, lot) {
                (Some(held_lot), Some(wanted)) => held_lot == wanted,
                // product-level holds weigh on any lot query; lot-level
                // holds weigh on the product-level query
                _ => true,
            })
            .map(|(_, h)| h.quantity)
            .sum()
    }

    /// Held units scoped to exactly this lot.
    pub fn held_on_lot(
        &self,
        lot: LotId,
        product: ProductId,
        org: OrgId,
        ignore: Option<HoldId>,
    ) -> u32 {
        self.holds
            .iter()
            .filter(|(id, _)| Some(**id) != ignore)
            .filter(|(_, h)| h.product == product && h.org == org && h.lot == Some(lot))
            .map(|(_, h)| h.quantity)
            .sum()
    }

    /// Held units with no lot scope (product-level carts).
    pub fn held_unscoped(&self, product: ProductId, org: OrgId, ignore: Option<HoldId>) -> u32 {
        self.holds
            .iter()
            .filter(|(id, _)| Some(**id) != ignore)
            .filter(|(_, h)| h.product == product && h.org == org && h.lot.is_none())
            .map(|(_, h)| h.quantity)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn held_sums_matching_holds() {
        let mut book = HoldBook::default();
        let product = ProductId(1);
        let org = OrgId(2);

        book.place(Hold { product, org, lot: None, quantity: 3 });
        let lot_hold = book.place(Hold { product, org, lot: Some(LotId(7)), quantity: 2 });

        assert_eq!(book.held(product, org, None, None), 5);
        assert_eq!(book.held(product, org, Some(LotId(7)), None), 5);
        // a different lot sees only the product-level hold
        assert_eq!(book.held(product, org, Some(LotId(8)), None), 3);
        // the holder's own hold can be excluded
        assert_eq!(book.held(product, org, None, Some(lot_hold)), 3);
    }

    #[test]
    fn release_removes_the_hold() {
        let mut book = HoldBook::default();
        let id = book.place(Hold {
            product: ProductId(1),
            org: OrgId(1),
            lot: None,
            quantity: 4,
        });
        assert!(book.release(id).is_some());
        assert!(book.release(id).is_none());
        assert_eq!(book.held(ProductId(1), OrgId(1), None, None), 0);
    }
}
