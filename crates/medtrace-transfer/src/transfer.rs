//! The transfer service: production, shipment, treatment, disposal.
//!
//! Every operation is snapshot → allocate → commit. The commit carries
//! per-code preconditions, so losing a race against a concurrent
//! operation surfaces as a ledger conflict; the service re-reads and
//! retries up to [`ALLOCATION_RETRY_LIMIT`] times before giving up.
//! All codes in one call succeed or none do.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, warn};

use medtrace_allocation::{allocate, AllocationPlan, AvailableLot, Selection};
use medtrace_core::{
    ActionKind, BatchId, BatchKind, Clock, CodeId, CodeStatus, DisposalReason, EventId, LotId,
    NaiveDate, OrgId, OrgKind, Organization, Owner, PatientRef, ProductId, SystemClock,
    TransferAction, limits::ALLOCATION_RETRY_LIMIT,
};
use medtrace_ledger::{CommitReceipt, EventDraft, HoldId, Ledger, LedgerError, MintReceipt};

use crate::error::TransferError;
use crate::notify::{NoopSink, Notification, NotificationSink};

/// Which units an operation should move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockSelector {
    /// FIFO auto-allocation of `quantity` units of a product, optionally
    /// restricted to one lot.
    Auto {
        /// The product to draw from.
        product: ProductId,
        /// Restrict to this lot, or allocate across lots oldest-first.
        lot: Option<LotId>,
        /// Units to move.
        quantity: u32,
    },
    /// Exactly these scanned codes.
    Codes(Vec<CodeId>),
}

/// A shipment from one organization to another.
#[derive(Debug, Clone)]
pub struct ShipmentRequest {
    /// Sending organization.
    pub from: OrgId,
    /// Destination organization.
    pub to: OrgId,
    /// What to ship.
    pub selector: StockSelector,
    /// Cart hold to consume on success.
    pub hold: Option<HoldId>,
}

/// A treatment applying units to a patient.
#[derive(Debug, Clone)]
pub struct TreatmentRequest {
    /// The treating hospital.
    pub hospital: OrgId,
    /// The patient the units are applied to.
    pub patient: PatientRef,
    /// What to apply.
    pub selector: StockSelector,
    /// Cart hold to consume on success.
    pub hold: Option<HoldId>,
}

/// A disposal of units from an organization's stock.
#[derive(Debug, Clone)]
pub struct DisposalRequest {
    /// The organization disposing of the units.
    pub org: OrgId,
    /// Why. Free text is required for (and only for) `Other`.
    pub reason: DisposalReason,
    /// What to dispose of.
    pub selector: StockSelector,
    /// Cart hold to consume on success.
    pub hold: Option<HoldId>,
}

/// Result of a successful transfer operation.
#[derive(Debug, Clone)]
pub struct TransferReceipt {
    /// The batch grouping this operation's events.
    pub batch: BatchId,
    /// The written events.
    pub events: Vec<EventId>,
    /// Codes moved.
    pub quantity: u32,
}

/// Orchestrates all forward custody movement.
pub struct TransferService {
    ledger: Arc<Ledger>,
    notifier: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
}

impl TransferService {
    /// Create a service over a ledger, with notifications discarded and
    /// the system clock.
    #[must_use]
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self {
            ledger,
            notifier: Arc::new(NoopSink),
            clock: Arc::new(SystemClock),
        }
    }

    /// Use this notification sink.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Use this clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Register a production run: create the lot, mint its codes, and
    /// write the `Produced` events.
    ///
    /// Only the product's own (active) manufacturer may produce.
    pub fn register_production(
        &self,
        manufacturer: OrgId,
        product: ProductId,
        manufacture_date: NaiveDate,
        expiry_date: NaiveDate,
        quantity: u32,
    ) -> Result<MintReceipt, TransferError> {
        if quantity == 0 {
            return Err(TransferError::InvalidQuantity { quantity: 0 });
        }
        self.active_org(manufacturer)?;
        let product = self.ledger.product(product)?;
        if product.manufacturer != manufacturer {
            return Err(TransferError::NotOwner { org: manufacturer });
        }
        Ok(self.ledger.mint_lot(
            product.id,
            manufacture_date,
            expiry_date,
            quantity,
            self.clock.now(),
        )?)
    }

    /// Preview which codes a FIFO allocation would claim.
    ///
    /// Returns the plan including any shortfall; unlike the transfer
    /// operations, a short plan is not an error here. Nothing is
    /// reserved; the selection is re-made at commit time.
    pub fn allocate(
        &self,
        org: OrgId,
        product: ProductId,
        lot: Option<LotId>,
        quantity: u32,
    ) -> Result<AllocationPlan, TransferError> {
        if quantity == 0 {
            return Err(TransferError::InvalidQuantity { quantity: 0 });
        }
        let snapshot = self.ledger.snapshot(product, org, lot, None)?;
        Ok(allocate(&snapshot, quantity))
    }

    /// Ship units to another organization.
    ///
    /// Writes a `Shipped` and a `Received` event per code under one
    /// batch: dispatch and acceptance commit atomically.
    pub fn ship(&self, request: &ShipmentRequest) -> Result<TransferReceipt, TransferError> {
        self.active_org(request.from)?;
        let to_org = self.active_org(request.to)?;

        let from = request.from;
        let to = request.to;
        let receipt = self.commit_with_retry(
            BatchKind::Shipment,
            from,
            &request.selector,
            request.hold,
            |selection| {
                vec![
                    EventDraft {
                        code: selection.code,
                        require_owner: Owner::Org(from),
                        require_status: CodeStatus::InStock,
                        action: TransferAction::Shipped { from, to },
                    },
                    EventDraft {
                        code: selection.code,
                        require_owner: Owner::Org(from),
                        require_status: CodeStatus::InStock,
                        action: TransferAction::Received { from, to },
                    },
                ]
            },
        )?;

        self.notify(Notification {
            event: ActionKind::Shipped,
            recipient: to_org.name,
            payload: json!({
                "batch": receipt.batch.value(),
                "from": from.value(),
                "quantity": receipt.quantity,
            }),
        });
        Ok(receipt)
    }

    /// Apply units to a patient.
    ///
    /// Only an active hospital may treat; the codes flip to `Used` and
    /// custody moves to the patient reference.
    pub fn treat(&self, request: &TreatmentRequest) -> Result<TransferReceipt, TransferError> {
        let org = self.active_org(request.hospital)?;
        if org.kind != OrgKind::Hospital {
            return Err(TransferError::WrongRole {
                org: request.hospital,
                required: OrgKind::Hospital,
            });
        }

        let hospital = request.hospital;
        let patient = request.patient.clone();
        let receipt = self.commit_with_retry(
            BatchKind::Treatment,
            hospital,
            &request.selector,
            request.hold,
            |selection| {
                vec![EventDraft {
                    code: selection.code,
                    require_owner: Owner::Org(hospital),
                    require_status: CodeStatus::InStock,
                    action: TransferAction::Treated {
                        hospital,
                        patient: patient.clone(),
                    },
                }]
            },
        )?;

        self.notify(Notification {
            event: ActionKind::Treated,
            recipient: request.patient.contact().to_owned(),
            payload: json!({
                "batch": receipt.batch.value(),
                "quantity": receipt.quantity,
            }),
        });
        Ok(receipt)
    }

    /// Dispose of units from stock. Terminal; no recipient.
    pub fn dispose(&self, request: &DisposalRequest) -> Result<TransferReceipt, TransferError> {
        self.active_org(request.org)?;

        let org = request.org;
        let reason = request.reason.clone();
        self.commit_with_retry(
            BatchKind::Disposal,
            org,
            &request.selector,
            request.hold,
            |selection| {
                vec![EventDraft {
                    code: selection.code,
                    require_owner: Owner::Org(org),
                    require_status: CodeStatus::InStock,
                    action: TransferAction::Disposed {
                        owner: org,
                        reason: reason.clone(),
                    },
                }]
            },
        )
    }

    // === Internals ===

    fn active_org(&self, org: OrgId) -> Result<Organization, TransferError> {
        let record = self.ledger.organization(org)?;
        if record.is_active() {
            Ok(record)
        } else {
            Err(TransferError::OrganizationNotActive { org })
        }
    }

    /// Turn a selector into concrete selections against current state.
    fn resolve(
        &self,
        owner: OrgId,
        selector: &StockSelector,
        hold: Option<HoldId>,
    ) -> Result<Vec<Selection>, TransferError> {
        match selector {
            StockSelector::Auto {
                product,
                lot,
                quantity,
            } => {
                if *quantity == 0 {
                    return Err(TransferError::InvalidQuantity { quantity: 0 });
                }
                let snapshot = self.ledger.snapshot(*product, owner, *lot, hold)?;
                let available: u32 = snapshot.iter().map(AvailableLot::available).sum();
                let plan = allocate(&snapshot, *quantity);
                if plan.is_complete() {
                    Ok(plan.selections)
                } else {
                    // no partial shipments: reject atomically
                    Err(TransferError::InsufficientInventory {
                        requested: *quantity,
                        available,
                        shortfall: plan.shortfall,
                    })
                }
            }
            StockSelector::Codes(codes) => {
                if codes.is_empty() {
                    return Err(TransferError::InvalidQuantity { quantity: 0 });
                }
                codes
                    .iter()
                    .map(|&id| {
                        let code = self.ledger.code(id)?;
                        if code.is_available_to(owner) {
                            Ok(Selection {
                                code: id,
                                lot: code.lot,
                            })
                        } else {
                            Err(TransferError::NotOwner { org: owner })
                        }
                    })
                    .collect()
            }
        }
    }

    /// Resolve, build drafts, and commit, retrying allocation from
    /// fresh state after each lost race, a bounded number of times.
    fn commit_with_retry(
        &self,
        kind: BatchKind,
        initiated_by: OrgId,
        selector: &StockSelector,
        hold: Option<HoldId>,
        build: impl Fn(&Selection) -> Vec<EventDraft>,
    ) -> Result<TransferReceipt, TransferError> {
        for attempt in 0..=ALLOCATION_RETRY_LIMIT {
            let selections = self.resolve(initiated_by, selector, hold)?;
            let drafts: Vec<EventDraft> = selections.iter().flat_map(&build).collect();

            match self.ledger.commit(kind, initiated_by, self.clock.now(), &drafts, None) {
                Ok(CommitReceipt { batch, events }) => {
                    if let Some(id) = hold {
                        // the hold served its purpose; a missing hold is
                        // not worth failing a committed transfer over
                        let _ = self.ledger.release_hold(id);
                    }
                    return Ok(TransferReceipt {
                        batch,
                        events,
                        quantity: selections.len() as u32,
                    });
                }
                Err(LedgerError::Conflict { code }) => {
                    debug!(%code, attempt, %kind, "lost allocation race, retrying");
                }
                Err(other) => return Err(other.into()),
            }
        }

        // Retries exhausted: report against fresh availability.
        match selector {
            StockSelector::Auto {
                product,
                lot,
                quantity,
            } => {
                let available = self.ledger.available_quantity(*product, initiated_by, *lot)?;
                Err(TransferError::InsufficientInventory {
                    requested: *quantity,
                    available,
                    shortfall: quantity.saturating_sub(available),
                })
            }
            StockSelector::Codes(_) => Err(TransferError::NotOwner { org: initiated_by }),
        }
    }

    fn notify(&self, notification: Notification) {
        if let Err(err) = self.notifier.dispatch(notification) {
            // post-commit side effect: never propagate
            warn!(%err, "notification dispatch failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medtrace_core::OrgStatus;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    struct Fixture {
        ledger: Arc<Ledger>,
        service: TransferService,
        maker: OrgId,
        hospital: OrgId,
        product: ProductId,
    }

    fn fixture() -> Fixture {
        let ledger = Arc::new(Ledger::new());
        let maker = ledger.register_organization("Acme", OrgKind::Manufacturer, "ACM");
        let hospital = ledger.register_organization("St. Jude", OrgKind::Hospital, "SJH");
        for org in [maker, hospital] {
            ledger.set_organization_status(org, OrgStatus::Active).unwrap();
        }
        let product = ledger.register_product(maker, "UDI-0001", "Stent X2").unwrap();
        let service = TransferService::new(Arc::clone(&ledger));
        Fixture {
            ledger,
            service,
            maker,
            hospital,
            product,
        }
    }

    #[test]
    fn production_then_shipment_moves_stock() {
        let f = fixture();
        f.service
            .register_production(f.maker, f.product, date(2026, 1, 10), date(2028, 1, 10), 10)
            .unwrap();

        let receipt = f
            .service
            .ship(&ShipmentRequest {
                from: f.maker,
                to: f.hospital,
                selector: StockSelector::Auto {
                    product: f.product,
                    lot: None,
                    quantity: 4,
                },
                hold: None,
            })
            .unwrap();

        assert_eq!(receipt.quantity, 4);
        // one Shipped and one Received event per code
        assert_eq!(receipt.events.len(), 8);
        assert_eq!(f.ledger.available_quantity(f.product, f.maker, None).unwrap(), 6);
        assert_eq!(
            f.ledger.available_quantity(f.product, f.hospital, None).unwrap(),
            4
        );
    }

    #[test]
    fn shipment_rejects_shortfall_atomically() {
        let f = fixture();
        f.service
            .register_production(f.maker, f.product, date(2026, 1, 10), date(2028, 1, 10), 3)
            .unwrap();

        let err = f
            .service
            .ship(&ShipmentRequest {
                from: f.maker,
                to: f.hospital,
                selector: StockSelector::Auto {
                    product: f.product,
                    lot: None,
                    quantity: 5,
                },
                hold: None,
            })
            .unwrap_err();

        assert_eq!(
            err,
            TransferError::InsufficientInventory {
                requested: 5,
                available: 3,
                shortfall: 2,
            }
        );
        // nothing moved
        assert_eq!(f.ledger.available_quantity(f.product, f.maker, None).unwrap(), 3);
    }

    #[test]
    fn zero_quantity_is_invalid() {
        let f = fixture();
        let err = f
            .service
            .ship(&ShipmentRequest {
                from: f.maker,
                to: f.hospital,
                selector: StockSelector::Auto {
                    product: f.product,
                    lot: None,
                    quantity: 0,
                },
                hold: None,
            })
            .unwrap_err();
        assert_eq!(err, TransferError::InvalidQuantity { quantity: 0 });
    }

    #[test]
    fn only_hospitals_treat() {
        let f = fixture();
        f.service
            .register_production(f.maker, f.product, date(2026, 1, 10), date(2028, 1, 10), 2)
            .unwrap();

        let err = f
            .service
            .treat(&TreatmentRequest {
                hospital: f.maker,
                patient: PatientRef::new("010-1234-5678"),
                selector: StockSelector::Auto {
                    product: f.product,
                    lot: None,
                    quantity: 1,
                },
                hold: None,
            })
            .unwrap_err();

        assert_eq!(
            err,
            TransferError::WrongRole {
                org: f.maker,
                required: OrgKind::Hospital,
            }
        );
    }

    #[test]
    fn explicit_codes_must_be_owned() {
        let f = fixture();
        let minted = f
            .service
            .register_production(f.maker, f.product, date(2026, 1, 10), date(2028, 1, 10), 2)
            .unwrap();

        // hospital does not own the freshly minted codes
        let err = f
            .service
            .dispose(&DisposalRequest {
                org: f.hospital,
                reason: DisposalReason::Expired,
                selector: StockSelector::Codes(minted.codes.clone()),
                hold: None,
            })
            .unwrap_err();
        assert_eq!(err, TransferError::NotOwner { org: f.hospital });

        // the owner can dispose them
        let receipt = f
            .service
            .dispose(&DisposalRequest {
                org: f.maker,
                reason: DisposalReason::Expired,
                selector: StockSelector::Codes(minted.codes),
                hold: None,
            })
            .unwrap();
        assert_eq!(receipt.quantity, 2);
        assert_eq!(f.ledger.available_quantity(f.product, f.maker, None).unwrap(), 0);
    }

    #[test]
    fn inactive_org_cannot_ship() {
        let f = fixture();
        f.service
            .register_production(f.maker, f.product, date(2026, 1, 10), date(2028, 1, 10), 2)
            .unwrap();
        f.ledger
            .set_organization_status(f.hospital, OrgStatus::Inactive)
            .unwrap();

        let err = f
            .service
            .ship(&ShipmentRequest {
                from: f.maker,
                to: f.hospital,
                selector: StockSelector::Auto {
                    product: f.product,
                    lot: None,
                    quantity: 1,
                },
                hold: None,
            })
            .unwrap_err();
        assert_eq!(err, TransferError::OrganizationNotActive { org: f.hospital });
    }

    #[test]
    fn production_requires_owning_manufacturer() {
        let f = fixture();
        let other = f
            .ledger
            .register_organization("Beta Medical", OrgKind::Manufacturer, "BET");
        f.ledger.set_organization_status(other, OrgStatus::Active).unwrap();

        let err = f
            .service
            .register_production(other, f.product, date(2026, 1, 10), date(2028, 1, 10), 5)
            .unwrap_err();
        assert_eq!(err, TransferError::NotOwner { org: other });
    }
}
