//! Per-unit custody traces and per-organization stock reports.

use chrono::{DateTime, Utc};

use medtrace_core::{
    ActionKind, BatchId, CodeId, EventId, Lot, OrgId, Owner, Product, VirtualCode,
};
use medtrace_ledger::{Ledger, LedgerError};

/// One hop in a unit's custody history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustodyStep {
    /// The underlying ledger event.
    pub event: EventId,
    /// When it happened.
    pub at: DateTime<Utc>,
    /// What happened.
    pub kind: ActionKind,
    /// Who the unit left. `None` for production.
    pub from: Option<Owner>,
    /// Who the unit went to. `None` for disposal.
    pub to: Option<Owner>,
    /// The operation the event was part of.
    pub batch: BatchId,
}

/// The full answer to "who owns this unit, and how did it get there."
#[derive(Debug, Clone)]
pub struct CustodyTrace {
    /// The unit, including its current owner and status.
    pub code: VirtualCode,
    /// The lot it was minted in.
    pub lot: Lot,
    /// Every custody hop, oldest first.
    pub steps: Vec<CustodyStep>,
}

/// Trace one unit by code id.
pub fn trace(ledger: &Ledger, code: CodeId) -> Result<CustodyTrace, LedgerError> {
    let code = ledger.code(code)?;
    let lot = ledger.lot(code.lot)?;
    let steps = ledger
        .events_for_code(code.id)?
        .into_iter()
        .map(|event| CustodyStep {
            event: event.id,
            at: event.at,
            kind: event.action.kind(),
            from: event.action.from_owner(),
            to: event.action.to_owner(),
            batch: event.batch,
        })
        .collect();
    Ok(CustodyTrace { code, lot, steps })
}

/// Trace one unit by its public token, as scanned off the packaging.
pub fn trace_by_token(ledger: &Ledger, token: &str) -> Option<CustodyTrace> {
    let code = ledger.code_by_token(token)?;
    trace(ledger, code.id).ok()
}

/// One line of a stock report: a lot an organization holds units of.
#[derive(Debug, Clone)]
pub struct StockLine {
    /// The product.
    pub product: Product,
    /// The lot.
    pub lot: Lot,
    /// In-stock units of this lot held by the organization.
    pub quantity: u32,
}

/// Everything an organization currently holds, grouped by product and
/// lot, in (product, lot) order.
pub fn stock_report(ledger: &Ledger, org: OrgId) -> Result<Vec<StockLine>, LedgerError> {
    ledger.organization(org)?;
    ledger
        .holdings_of(org)
        .into_iter()
        .map(|(product, lot, quantity)| {
            Ok(StockLine {
                product: ledger.product(product)?,
                lot: ledger.lot(lot)?,
                quantity,
            })
        })
        .collect()
}
