//! Materialized stock projection.
//!
//! Counts in-stock codes per (product, organization, lot). Updated in
//! the same critical section as every event append, so reads never
//! reduce the full event log.

use std::collections::HashMap;

use medtrace_core::{LotId, OrgId, ProductId};

#[derive(Debug, Default)]
pub(crate) struct StockProjection {
    counts: HashMap<(ProductId, OrgId), HashMap<LotId, u32>>,
}

impl StockProjection {
    pub fn add(&mut self, product: ProductId, org: OrgId, lot: LotId, quantity: u32) {
        *self
            .counts
            .entry((product, org))
            .or_default()
            .entry(lot)
            .or_insert(0) += quantity;
    }

    pub fn remove(&mut self, product: ProductId, org: OrgId, lot: LotId, quantity: u32) {
        if let Some(lots) = self.counts.get_mut(&(product, org)) {
            if let Some(count) = lots.get_mut(&lot) {
                *count = count.saturating_sub(quantity);
                if *count == 0 {
                    lots.remove(&lot);
                }
            }
            if lots.is_empty() {
                self.counts.remove(&(product, org));
            }
        }
    }

    /// In-stock units for (product, org), optionally narrowed to one lot.
    pub fn quantity(&self, product: ProductId, org: OrgId, lot: Option<LotId>) -> u32 {
        let Some(lots) = self.counts.get(&(product, org)) else {
            return 0;
        };
        match lot {
            Some(lot) => lots.get(&lot).copied().unwrap_or(0),
            None => lots.values().sum(),
        }
    }

    /// Per-lot counts for (product, org).
    pub fn lots(&self, product: ProductId, org: OrgId) -> Vec<(LotId, u32)> {
        let mut lots: Vec<(LotId, u32)> = self
            .counts
            .get(&(product, org))
            .map(|m| m.iter().map(|(&lot, &n)| (lot, n)).collect())
            .unwrap_or_default();
        lots.sort_by_key(|&(lot, _)| lot);
        lots
    }

    /// Every (product, lot, count) an organization currently holds.
    pub fn holdings_of(&self, org: OrgId) -> Vec<(ProductId, LotId, u32)> {
        let mut holdings: Vec<(ProductId, LotId, u32)> = self
            .counts
            .iter()
            .filter(|((_, o), _)| *o == org)
            .flat_map(|(&(product, _), lots)| {
                lots.iter().map(move |(&lot, &n)| (product, lot, n))
            })
            .collect();
        holdings.sort_by_key(|&(product, lot, _)| (product, lot));
        holdings
    }
}
