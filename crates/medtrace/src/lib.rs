//! Serialized medical-unit traceability.
//!
//! `medtrace` tracks individually serialized product units ("virtual
//! codes") through a manufacturer → distributor → hospital → patient
//! supply chain, and can answer at any time *who owns this unit, and
//! how did it get there*.
//!
//! The design is an append-only event ledger with materialized
//! projections:
//!
//! - every ownership change is a permanent [`TransferEvent`];
//! - a code's current owner and status are rebuilt transactionally
//!   alongside each event write, never independently mutated;
//! - reversal (recall, return) appends compensating events rather than
//!   editing history.
//!
//! [`TraceLedger`] bundles the ledger, the transfer service, the
//! reversal service, and the read-only queries behind one surface.
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use medtrace::{OrgKind, ShipmentRequest, StockSelector, TraceLedger};
//!
//! fn date(y: i32, m: u32, d: u32) -> NaiveDate {
//!     NaiveDate::from_ymd_opt(y, m, d).unwrap()
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let trace = TraceLedger::new();
//!
//! let maker = trace.register_organization("Acme Implants", OrgKind::Manufacturer, "ACM");
//! let hospital = trace.register_organization("St. Jude", OrgKind::Hospital, "SJH");
//! trace.approve_organization(maker)?;
//! trace.approve_organization(hospital)?;
//!
//! let product = trace.register_product(maker, "UDI-DI-0001", "Stent X2")?;
//! trace.register_production(maker, product, date(2026, 1, 10), date(2028, 1, 10), 100)?;
//!
//! trace.ship(&ShipmentRequest {
//!     from: maker,
//!     to: hospital,
//!     selector: StockSelector::Auto { product, lot: None, quantity: 40 },
//!     hold: None,
//! })?;
//!
//! assert_eq!(trace.available_quantity(product, hospital, None)?, 40);
//! assert_eq!(trace.available_quantity(product, maker, None)?, 60);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::sync::Arc;

pub use medtrace_allocation::{allocate, AllocationPlan, AvailableLot, Selection};
pub use medtrace_core::{
    limits, ActionKind, Batch, BatchId, BatchKind, Clock, CodeId, CodeStatus, DateTime,
    DeactivationReason, DisposalReason, EventId, Lot, LotId, ManualClock, NaiveDate, OrgId,
    OrgKind, OrgStatus, Organization, Owner, PatientRef, Product, ProductId, Reason, ReasonError,
    ReversalInfo, SystemClock, TransferAction, TransferEvent, Utc, VirtualCode,
};
pub use medtrace_ledger::{CommitReceipt, EventDraft, HoldId, Ledger, LedgerError, MintReceipt};
pub use medtrace_query::{
    audit_chain, history, stock_report, trace, trace_by_token, ChainViolation, CustodyStep,
    CustodyTrace, HistoryFilter, StockLine,
};
pub use medtrace_transfer::{
    DisposalRequest, NoopSink, Notification, NotificationSink, NotifyError, RecordingSink,
    ReversalError, ReversalReceipt, ReversalService, ShipmentRequest, StockSelector,
    TransferError, TransferReceipt, TransferService, TreatmentRequest,
};

/// The whole traceability core behind one handle.
///
/// Cheap to share: wrap it in an [`Arc`] and call from as many threads
/// as needed; commits serialize on the ledger's internal lock.
pub struct TraceLedger {
    ledger: Arc<Ledger>,
    transfers: TransferService,
    reversals: ReversalService,
}

impl Default for TraceLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceLedger {
    /// A fresh ledger with notifications discarded and the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_parts(Arc::new(NoopSink), Arc::new(SystemClock))
    }

    /// A fresh ledger with an explicit notification sink and clock.
    #[must_use]
    pub fn with_parts(notifier: Arc<dyn NotificationSink>, clock: Arc<dyn Clock>) -> Self {
        let ledger = Arc::new(Ledger::new());
        let transfers = TransferService::new(Arc::clone(&ledger))
            .with_notifier(Arc::clone(&notifier))
            .with_clock(Arc::clone(&clock));
        let reversals = ReversalService::new(Arc::clone(&ledger))
            .with_notifier(notifier)
            .with_clock(clock);
        Self {
            ledger,
            transfers,
            reversals,
        }
    }

    /// The underlying ledger, for direct use with the query functions.
    #[must_use]
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    // === Registry ===

    /// Register an organization; it starts pending approval.
    pub fn register_organization(
        &self,
        name: impl Into<String>,
        kind: OrgKind,
        prefix: impl Into<String>,
    ) -> OrgId {
        self.ledger.register_organization(name, kind, prefix)
    }

    /// Mark an organization active. In production this is driven by the
    /// external admin approval workflow.
    pub fn approve_organization(&self, org: OrgId) -> Result<(), LedgerError> {
        self.ledger.set_organization_status(org, OrgStatus::Active)
    }

    /// Set an organization's approval status directly.
    pub fn set_organization_status(&self, org: OrgId, status: OrgStatus) -> Result<(), LedgerError> {
        self.ledger.set_organization_status(org, status)
    }

    /// Register a product under a manufacturer.
    pub fn register_product(
        &self,
        manufacturer: OrgId,
        udi_di: impl Into<String>,
        model_name: impl Into<String>,
    ) -> Result<ProductId, LedgerError> {
        self.ledger.register_product(manufacturer, udi_di, model_name)
    }

    /// Deactivate a product: blocks new production, keeps existing codes
    /// valid and transferable.
    pub fn deactivate_product(
        &self,
        product: ProductId,
        reason: DeactivationReason,
    ) -> Result<(), LedgerError> {
        self.ledger.deactivate_product(product, reason)
    }

    // === Transfers ===

    /// Register a production run: create a lot and mint its codes.
    pub fn register_production(
        &self,
        manufacturer: OrgId,
        product: ProductId,
        manufacture_date: NaiveDate,
        expiry_date: NaiveDate,
        quantity: u32,
    ) -> Result<MintReceipt, TransferError> {
        self.transfers
            .register_production(manufacturer, product, manufacture_date, expiry_date, quantity)
    }

    /// Preview a FIFO allocation without reserving anything.
    pub fn allocate(
        &self,
        org: OrgId,
        product: ProductId,
        lot: Option<LotId>,
        quantity: u32,
    ) -> Result<AllocationPlan, TransferError> {
        self.transfers.allocate(org, product, lot, quantity)
    }

    /// Ship units to another organization.
    pub fn ship(&self, request: &ShipmentRequest) -> Result<TransferReceipt, TransferError> {
        self.transfers.ship(request)
    }

    /// Apply units to a patient.
    pub fn treat(&self, request: &TreatmentRequest) -> Result<TransferReceipt, TransferError> {
        self.transfers.treat(request)
    }

    /// Dispose of units.
    pub fn dispose(&self, request: &DisposalRequest) -> Result<TransferReceipt, TransferError> {
        self.transfers.dispose(request)
    }

    // === Reversals ===

    /// Recall a treatment batch (hospital-initiated, time-boxed).
    pub fn recall(
        &self,
        treatment_batch: BatchId,
        caller: OrgId,
        reason: &str,
    ) -> Result<ReversalReceipt, ReversalError> {
        self.reversals.recall(treatment_batch, caller, reason)
    }

    /// Return a shipment batch to its sender (receiver-initiated,
    /// unbounded).
    pub fn return_shipment(
        &self,
        shipment_batch: BatchId,
        caller: OrgId,
        reason: &str,
    ) -> Result<ReversalReceipt, ReversalError> {
        self.reversals.return_shipment(shipment_batch, caller, reason)
    }

    // === Holds ===

    /// Place an advisory cart hold against available stock.
    pub fn place_hold(
        &self,
        product: ProductId,
        org: OrgId,
        lot: Option<LotId>,
        quantity: u32,
    ) -> Result<HoldId, LedgerError> {
        self.ledger.place_hold(product, org, lot, quantity)
    }

    /// Release an advisory hold.
    pub fn release_hold(&self, hold: HoldId) -> Result<(), LedgerError> {
        self.ledger.release_hold(hold)
    }

    // === Reads ===

    /// In-stock units minus advisory holds.
    pub fn available_quantity(
        &self,
        product: ProductId,
        org: OrgId,
        lot: Option<LotId>,
    ) -> Result<u32, LedgerError> {
        self.ledger.available_quantity(product, org, lot)
    }

    /// Filtered event history.
    #[must_use]
    pub fn history(&self, filter: &HistoryFilter) -> Vec<TransferEvent> {
        history(&self.ledger, filter)
    }

    /// One unit's full custody chain.
    pub fn trace(&self, code: CodeId) -> Result<CustodyTrace, LedgerError> {
        trace(&self.ledger, code)
    }

    /// One unit's custody chain, looked up by public token.
    #[must_use]
    pub fn trace_by_token(&self, token: &str) -> Option<CustodyTrace> {
        trace_by_token(&self.ledger, token)
    }

    /// Everything an organization holds, by product and lot.
    pub fn stock_report(&self, org: OrgId) -> Result<Vec<StockLine>, LedgerError> {
        stock_report(&self.ledger, org)
    }

    /// Verify every code's history forms a consistent custody chain.
    #[must_use]
    pub fn audit(&self) -> Vec<ChainViolation> {
        audit_chain(&self.ledger)
    }
}
