//! History queries over the event log.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use medtrace_core::{ActionKind, BatchId, CodeId, Lot, OrgId, ProductId, TransferEvent};
use medtrace_ledger::Ledger;

/// Criteria for a history query. All fields are conjunctive; an unset
/// field matches everything.
///
/// # Examples
///
/// ```
/// use medtrace_core::ActionKind;
/// use medtrace_query::HistoryFilter;
///
/// let filter = HistoryFilter::new()
///     .with_kinds([ActionKind::Shipped, ActionKind::Received])
///     .with_lot_number("ACM-260110-001");
/// ```
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    from: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
    kinds: Option<Vec<ActionKind>>,
    organization: Option<OrgId>,
    product: Option<ProductId>,
    lot_number: Option<String>,
    code: Option<CodeId>,
    batch: Option<BatchId>,
}

impl HistoryFilter {
    /// A filter matching every event.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Only events at or after this instant.
    #[must_use]
    pub const fn with_from(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    /// Only events at or before this instant.
    #[must_use]
    pub const fn with_until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    /// Only events of these action kinds.
    #[must_use]
    pub fn with_kinds(mut self, kinds: impl IntoIterator<Item = ActionKind>) -> Self {
        self.kinds = Some(kinds.into_iter().collect());
        self
    }

    /// Only events where this organization appears as sender or
    /// recipient.
    #[must_use]
    pub const fn with_organization(mut self, org: OrgId) -> Self {
        self.organization = Some(org);
        self
    }

    /// Only events on codes of this product.
    #[must_use]
    pub const fn with_product(mut self, product: ProductId) -> Self {
        self.product = Some(product);
        self
    }

    /// Only events on codes of the lot with this lot number.
    #[must_use]
    pub fn with_lot_number(mut self, lot_number: impl Into<String>) -> Self {
        self.lot_number = Some(lot_number.into());
        self
    }

    /// Only events on this code.
    #[must_use]
    pub const fn with_code(mut self, code: CodeId) -> Self {
        self.code = Some(code);
        self
    }

    /// Only events of this batch.
    #[must_use]
    pub const fn with_batch(mut self, batch: BatchId) -> Self {
        self.batch = Some(batch);
        self
    }
}

/// Run a history query, returning matching events in append order.
#[must_use]
pub fn history(ledger: &Ledger, filter: &HistoryFilter) -> Vec<TransferEvent> {
    let needs_lot = filter.product.is_some() || filter.lot_number.is_some();
    let mut lot_cache: HashMap<CodeId, Option<Lot>> = HashMap::new();

    ledger
        .all_events()
        .into_iter()
        .filter(|event| {
            if let Some(from) = filter.from {
                if event.at < from {
                    return false;
                }
            }
            if let Some(until) = filter.until {
                if event.at > until {
                    return false;
                }
            }
            if let Some(kinds) = &filter.kinds {
                if !kinds.contains(&event.action.kind()) {
                    return false;
                }
            }
            if let Some(code) = filter.code {
                if event.code != code {
                    return false;
                }
            }
            if let Some(batch) = filter.batch {
                if event.batch != batch {
                    return false;
                }
            }
            if let Some(org) = filter.organization {
                let from_match = event.action.from_owner().is_some_and(|o| o.is_org(org));
                let to_match = event.action.to_owner().is_some_and(|o| o.is_org(org));
                if !from_match && !to_match {
                    return false;
                }
            }
            if needs_lot {
                let lot = lot_cache.entry(event.code).or_insert_with(|| {
                    ledger
                        .code(event.code)
                        .ok()
                        .and_then(|c| ledger.lot(c.lot).ok())
                });
                let Some(lot) = lot else { return false };
                if let Some(product) = filter.product {
                    if lot.product != product {
                        return false;
                    }
                }
                if let Some(lot_number) = &filter.lot_number {
                    if &lot.lot_number != lot_number {
                        return false;
                    }
                }
            }
            true
        })
        .collect()
}
