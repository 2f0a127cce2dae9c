//! The append-only ledger store.
//!
//! One [`Ledger`] holds the registry, the event log, the materialized
//! per-code state, batch records, the stock projection, and advisory
//! holds, all behind a single `RwLock`. Every write path goes through
//! [`Ledger::mint_lot`] or [`Ledger::commit`]; both update the event log
//! and every projection in the same critical section, so readers never
//! observe a half-applied operation.
//!
//! Commits are optimistic: callers read a snapshot, decide what to
//! write, and attach to each event draft the owner and status the code
//! must *still* have. A mismatch under the write lock means the caller
//! lost a race; the commit fails with [`LedgerError::Conflict`] without
//! touching anything, and the caller re-reads and retries.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, info};

use medtrace_allocation::AvailableLot;
use medtrace_core::{
    Batch, BatchId, BatchKind, CodeId, CodeStatus, DeactivationReason, EventId, Lot, LotId,
    NaiveDate, OrgId, OrgKind, OrgStatus, Organization, Owner, Product, ProductId, Reason,
    ReversalInfo, TransferAction, TransferEvent, VirtualCode,
};

use crate::error::LedgerError;
use crate::hold::{Hold, HoldBook, HoldId};
use crate::projection::StockProjection;
use crate::registry::Registry;

/// One event to append, with the precondition the code must still meet.
///
/// The precondition is what makes commits safe under concurrency: it
/// pins the exact custody state the caller based its decision on.
#[derive(Debug, Clone)]
pub struct EventDraft {
    /// The code the event concerns.
    pub code: CodeId,
    /// Owner the code must still have at commit time.
    pub require_owner: Owner,
    /// Status the code must still have at commit time.
    pub require_status: CodeStatus,
    /// What happens.
    pub action: TransferAction,
}

/// Result of a successful [`Ledger::commit`].
#[derive(Debug, Clone)]
pub struct CommitReceipt {
    /// The batch grouping the written events.
    pub batch: BatchId,
    /// Ids of the written events, in draft order.
    pub events: Vec<EventId>,
}

/// Result of a successful [`Ledger::mint_lot`].
#[derive(Debug, Clone)]
pub struct MintReceipt {
    /// The newly created lot.
    pub lot: Lot,
    /// The production batch.
    pub batch: BatchId,
    /// Ids of the minted codes, in token order.
    pub codes: Vec<CodeId>,
    /// Ids of the `Produced` events.
    pub events: Vec<EventId>,
}

#[derive(Debug, Default)]
struct Inner {
    registry: Registry,
    events: Vec<TransferEvent>,
    codes: HashMap<CodeId, VirtualCode>,
    tokens: HashMap<String, CodeId>,
    /// Minted in token order, so each vec is already sorted for FIFO
    /// tie-breaking within a lot.
    codes_by_lot: HashMap<LotId, Vec<CodeId>>,
    code_history: HashMap<CodeId, Vec<EventId>>,
    batches: BTreeMap<BatchId, Batch>,
    batch_events: HashMap<BatchId, Vec<EventId>>,
    /// origin batch -> reversing batch. The authoritative
    /// "already reversed" index, derived from reversal events.
    reversed_by: HashMap<BatchId, BatchId>,
    stock: StockProjection,
    holds: HoldBook,
    next_event: u64,
    next_batch: u64,
    next_code: u64,
}

/// The durable heart of the system: every ownership-changing event, the
/// registry, and the read-optimized projections.
#[derive(Debug, Default)]
pub struct Ledger {
    inner: RwLock<Inner>,
}

impl Ledger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // === Registry operations ===

    /// Register an organization in the `PendingApproval` state.
    pub fn register_organization(
        &self,
        name: impl Into<String>,
        kind: OrgKind,
        prefix: impl Into<String>,
    ) -> OrgId {
        self.inner.write().registry.register_organization(name, kind, prefix)
    }

    /// Set an organization's approval status. Called by the external
    /// approval workflow; the core only reads the result.
    pub fn set_organization_status(&self, id: OrgId, status: OrgStatus) -> Result<(), LedgerError> {
        self.inner.write().registry.set_organization_status(id, status)
    }

    /// Register a product under a manufacturer.
    pub fn register_product(
        &self,
        manufacturer: OrgId,
        udi_di: impl Into<String>,
        model_name: impl Into<String>,
    ) -> Result<ProductId, LedgerError> {
        self.inner.write().registry.register_product(manufacturer, udi_di, model_name)
    }

    /// Deactivate a product. Blocks new production only; existing codes
    /// remain valid and transferable.
    pub fn deactivate_product(
        &self,
        id: ProductId,
        reason: DeactivationReason,
    ) -> Result<(), LedgerError> {
        self.inner.write().registry.deactivate_product(id, reason)
    }

    // === Reads ===

    /// Look up an organization.
    pub fn organization(&self, id: OrgId) -> Result<Organization, LedgerError> {
        self.inner.read().registry.organization(id).cloned()
    }

    /// Look up a product.
    pub fn product(&self, id: ProductId) -> Result<Product, LedgerError> {
        self.inner.read().registry.product(id).cloned()
    }

    /// Look up a lot.
    pub fn lot(&self, id: LotId) -> Result<Lot, LedgerError> {
        self.inner.read().registry.lot(id).cloned()
    }

    /// All lots of a product, in registration order.
    pub fn lots_of(&self, product: ProductId) -> Result<Vec<Lot>, LedgerError> {
        let inner = self.inner.read();
        inner.registry.product(product)?;
        Ok(inner.registry.lots_of(product).into_iter().cloned().collect())
    }

    /// Look up a code's current projection (owner, status).
    pub fn code(&self, id: CodeId) -> Result<VirtualCode, LedgerError> {
        self.inner.read().codes.get(&id).cloned().ok_or(LedgerError::UnknownCode(id))
    }

    /// Resolve a public token to its code.
    pub fn code_by_token(&self, token: &str) -> Option<VirtualCode> {
        let inner = self.inner.read();
        inner.tokens.get(token).and_then(|id| inner.codes.get(id)).cloned()
    }

    /// Look up a batch record.
    pub fn batch(&self, id: BatchId) -> Result<Batch, LedgerError> {
        self.inner.read().batches.get(&id).cloned().ok_or(LedgerError::UnknownBatch(id))
    }

    /// The batch that reversed `batch`, if any.
    ///
    /// This is the authoritative reversal check: the index is built from
    /// reversal events, not from the convenience flag on the batch row.
    pub fn reversal_of(&self, batch: BatchId) -> Option<BatchId> {
        self.inner.read().reversed_by.get(&batch).copied()
    }

    /// All events written under a batch, in append order.
    pub fn batch_events(&self, id: BatchId) -> Result<Vec<TransferEvent>, LedgerError> {
        let inner = self.inner.read();
        let event_ids = inner.batch_events.get(&id).ok_or(LedgerError::UnknownBatch(id))?;
        Ok(event_ids.iter().map(|&e| Self::event_at(&inner, e)).collect())
    }

    /// The distinct codes touched by a batch.
    pub fn batch_codes(&self, id: BatchId) -> Result<Vec<CodeId>, LedgerError> {
        let events = self.batch_events(id)?;
        let mut codes: Vec<CodeId> = events.iter().map(|e| e.code).collect();
        codes.sort_unstable();
        codes.dedup();
        Ok(codes)
    }

    /// A code's full history, oldest first.
    pub fn events_for_code(&self, id: CodeId) -> Result<Vec<TransferEvent>, LedgerError> {
        let inner = self.inner.read();
        let event_ids = inner.code_history.get(&id).ok_or(LedgerError::UnknownCode(id))?;
        Ok(event_ids.iter().map(|&e| Self::event_at(&inner, e)).collect())
    }

    /// A snapshot of the entire event log, in append order.
    ///
    /// Read-only reporting walks this; transactional paths use the
    /// projections instead.
    pub fn all_events(&self) -> Vec<TransferEvent> {
        self.inner.read().events.clone()
    }

    /// Number of events in the log.
    pub fn event_count(&self) -> usize {
        self.inner.read().events.len()
    }

    /// Every (product, lot, quantity) an organization holds in stock.
    pub fn holdings_of(&self, org: OrgId) -> Vec<(ProductId, LotId, u32)> {
        self.inner.read().stock.holdings_of(org)
    }

    /// In-stock units of a product held by an organization, optionally
    /// narrowed to one lot, minus advisory holds.
    pub fn available_quantity(
        &self,
        product: ProductId,
        org: OrgId,
        lot: Option<LotId>,
    ) -> Result<u32, LedgerError> {
        let inner = self.inner.read();
        inner.registry.product(product)?;
        if let Some(lot_id) = lot {
            Self::check_lot_of_product(&inner, product, lot_id)?;
        }
        let stock = inner.stock.quantity(product, org, lot);
        let held = inner.holds.held(product, org, lot, None);
        Ok(stock.saturating_sub(held))
    }

    /// Allocatable stock for (product, org), optionally narrowed to one
    /// lot, with advisory holds already subtracted.
    ///
    /// Lot-scoped holds trim their own lot; product-scoped holds trim
    /// from the newest lots backward, keeping the oldest stock
    /// allocatable for FIFO. `ignore_hold` exempts the caller's own hold
    /// from the subtraction.
    pub fn snapshot(
        &self,
        product: ProductId,
        org: OrgId,
        lot: Option<LotId>,
        ignore_hold: Option<HoldId>,
    ) -> Result<Vec<AvailableLot>, LedgerError> {
        let inner = self.inner.read();
        inner.registry.product(product)?;

        let lots: Vec<Lot> = match lot {
            Some(lot_id) => {
                Self::check_lot_of_product(&inner, product, lot_id)?;
                vec![inner.registry.lot(lot_id)?.clone()]
            }
            None => inner.registry.lots_of(product).into_iter().cloned().collect(),
        };

        let mut snapshot: Vec<AvailableLot> = lots
            .into_iter()
            .map(|l| {
                let mut codes: Vec<CodeId> = inner
                    .codes_by_lot
                    .get(&l.id)
                    .map(|ids| {
                        ids.iter()
                            .filter(|id| {
                                inner.codes.get(id).is_some_and(|c| c.is_available_to(org))
                            })
                            .copied()
                            .collect()
                    })
                    .unwrap_or_default();

                let held = inner.holds.held_on_lot(l.id, product, org, ignore_hold);
                let keep = codes.len().saturating_sub(held as usize);
                codes.truncate(keep);
                AvailableLot::new(l.id, l.manufacture_date, codes)
            })
            .collect();

        snapshot.sort_by_key(|l| (l.manufacture_date, l.lot));

        // Product-level holds weigh on the newest stock first.
        let mut unscoped = inner.holds.held_unscoped(product, org, ignore_hold);
        for available in snapshot.iter_mut().rev() {
            if unscoped == 0 {
                break;
            }
            let trim = (unscoped as usize).min(available.codes.len());
            available.codes.truncate(available.codes.len() - trim);
            unscoped -= trim as u32;
        }

        Ok(snapshot)
    }

    // === Holds ===

    /// Place an advisory hold against available stock.
    pub fn place_hold(
        &self,
        product: ProductId,
        org: OrgId,
        lot: Option<LotId>,
        quantity: u32,
    ) -> Result<HoldId, LedgerError> {
        let mut inner = self.inner.write();
        inner.registry.product(product)?;
        if let Some(lot_id) = lot {
            Self::check_lot_of_product(&inner, product, lot_id)?;
        }
        let stock = inner.stock.quantity(product, org, lot);
        let held = inner.holds.held(product, org, lot, None);
        let available = stock.saturating_sub(held);
        if quantity > available {
            return Err(LedgerError::HoldExceedsStock {
                requested: quantity,
                available,
            });
        }
        let id = inner.holds.place(Hold {
            product,
            org,
            lot,
            quantity,
        });
        debug!(hold = %id, %product, %org, quantity, "hold placed");
        Ok(id)
    }

    /// Release an advisory hold.
    pub fn release_hold(&self, id: HoldId) -> Result<(), LedgerError> {
        let mut inner = self.inner.write();
        inner.holds.release(id).map(|_| ()).ok_or(LedgerError::UnknownHold(id))
    }

    // === Writes ===

    /// Create a lot and mint its codes, writing one `Produced` event per
    /// unit under a production batch.
    pub fn mint_lot(
        &self,
        product: ProductId,
        manufacture_date: NaiveDate,
        expiry_date: NaiveDate,
        quantity: u32,
        at: DateTime<Utc>,
    ) -> Result<MintReceipt, LedgerError> {
        let mut inner = self.inner.write();
        let manufacturer = inner.registry.product(product)?.manufacturer;
        let lot = inner
            .registry
            .register_lot(product, manufacture_date, expiry_date, quantity)?;

        inner.next_batch += 1;
        let batch = BatchId(inner.next_batch);

        let mut codes = Vec::with_capacity(quantity as usize);
        let mut events = Vec::with_capacity(quantity as usize);
        for unit in 1..=quantity {
            inner.next_code += 1;
            let code_id = CodeId(inner.next_code);
            let token = format!("{}-{unit:04}", lot.lot_number);

            inner.codes.insert(
                code_id,
                VirtualCode {
                    id: code_id,
                    token: token.clone(),
                    lot: lot.id,
                    owner: Owner::Org(manufacturer),
                    status: CodeStatus::InStock,
                },
            );
            inner.tokens.insert(token, code_id);
            inner.codes_by_lot.entry(lot.id).or_default().push(code_id);

            let event_id = Self::append_event(
                &mut inner,
                code_id,
                batch,
                at,
                TransferAction::Produced { manufacturer },
            );
            events.push(event_id);
            codes.push(code_id);
        }

        inner.stock.add(product, manufacturer, lot.id, quantity);
        inner.batches.insert(
            batch,
            Batch {
                id: batch,
                kind: BatchKind::Production,
                created_at: at,
                initiated_by: manufacturer,
                quantity,
                reversal: None,
            },
        );

        info!(
            batch = %batch,
            lot = %lot.lot_number,
            %product,
            quantity,
            "lot minted"
        );

        Ok(MintReceipt {
            lot,
            batch,
            codes,
            events,
        })
    }

    /// Atomically append a batch of events.
    ///
    /// Every draft's precondition is validated against current state
    /// (including the effect of earlier drafts in the same commit)
    /// before anything is written; a failed precondition aborts the
    /// whole commit with [`LedgerError::Conflict`] and no side effects.
    ///
    /// `reverses` marks an earlier batch as reversed by this one. The
    /// commit fails with [`LedgerError::AlreadyReversed`] if a reversal
    /// for that batch was committed concurrently.
    pub fn commit(
        &self,
        kind: BatchKind,
        initiated_by: OrgId,
        at: DateTime<Utc>,
        drafts: &[EventDraft],
        reverses: Option<(BatchId, Reason)>,
    ) -> Result<CommitReceipt, LedgerError> {
        if drafts.is_empty() {
            return Err(LedgerError::EmptyCommit);
        }

        let mut inner = self.inner.write();

        if let Some((origin, _)) = reverses {
            if !inner.batches.contains_key(&origin) {
                return Err(LedgerError::UnknownBatch(origin));
            }
            if inner.reversed_by.contains_key(&origin) {
                return Err(LedgerError::AlreadyReversed(origin));
            }
        }

        // First pass: validate every precondition against a scratch view
        // so a late conflict cannot leave earlier drafts applied.
        let mut scratch: HashMap<CodeId, (Owner, CodeStatus)> = HashMap::new();
        for draft in drafts {
            let (owner, status) = match scratch.get(&draft.code) {
                Some(state) => state.clone(),
                None => {
                    let code = inner
                        .codes
                        .get(&draft.code)
                        .ok_or(LedgerError::UnknownCode(draft.code))?;
                    (code.owner.clone(), code.status)
                }
            };
            if owner != draft.require_owner || status != draft.require_status {
                return Err(LedgerError::Conflict { code: draft.code });
            }
            let next_owner = draft.action.owner_after().unwrap_or(owner);
            let next_status = draft.action.status_after().unwrap_or(status);
            scratch.insert(draft.code, (next_owner, next_status));
        }

        // Second pass: apply.
        inner.next_batch += 1;
        let batch = BatchId(inner.next_batch);
        let mut events = Vec::with_capacity(drafts.len());

        for draft in drafts {
            let (lot_id, before_owner, before_status) = {
                let code = inner
                    .codes
                    .get(&draft.code)
                    .ok_or(LedgerError::UnknownCode(draft.code))?;
                (code.lot, code.owner.clone(), code.status)
            };
            let product = inner.registry.lot(lot_id)?.product;

            let after_owner = draft.action.owner_after().unwrap_or_else(|| before_owner.clone());
            let after_status = draft.action.status_after().unwrap_or(before_status);

            if before_status == CodeStatus::InStock {
                if let Owner::Org(org) = &before_owner {
                    inner.stock.remove(product, *org, lot_id, 1);
                }
            }
            if after_status == CodeStatus::InStock {
                if let Owner::Org(org) = &after_owner {
                    inner.stock.add(product, *org, lot_id, 1);
                }
            }

            {
                let code = inner
                    .codes
                    .get_mut(&draft.code)
                    .ok_or(LedgerError::UnknownCode(draft.code))?;
                code.owner = after_owner;
                code.status = after_status;
            }

            let event_id = Self::append_event(&mut inner, draft.code, batch, at, draft.action.clone());
            events.push(event_id);
        }

        let quantity = scratch.len() as u32;
        inner.batches.insert(
            batch,
            Batch {
                id: batch,
                kind,
                created_at: at,
                initiated_by,
                quantity,
                reversal: None,
            },
        );

        if let Some((origin, reason)) = reverses {
            inner.reversed_by.insert(origin, batch);
            if let Some(original) = inner.batches.get_mut(&origin) {
                original.reversal = Some(ReversalInfo {
                    reason,
                    reversed_at: at,
                    by: batch,
                });
            }
        }

        info!(batch = %batch, %kind, %initiated_by, quantity, "batch committed");

        Ok(CommitReceipt { batch, events })
    }

    fn append_event(
        inner: &mut Inner,
        code: CodeId,
        batch: BatchId,
        at: DateTime<Utc>,
        action: TransferAction,
    ) -> EventId {
        inner.next_event += 1;
        let id = EventId(inner.next_event);
        inner.events.push(TransferEvent {
            id,
            code,
            batch,
            at,
            action,
        });
        inner.code_history.entry(code).or_default().push(id);
        inner.batch_events.entry(batch).or_default().push(id);
        id
    }

    /// Event ids are assigned densely from 1 in append order, so the log
    /// index is `id - 1`.
    fn event_at(inner: &Inner, id: EventId) -> TransferEvent {
        inner.events[id.0 as usize - 1].clone()
    }

    fn check_lot_of_product(
        inner: &Inner,
        product: ProductId,
        lot: LotId,
    ) -> Result<(), LedgerError> {
        if inner.registry.lot(lot)?.product == product {
            Ok(())
        } else {
            Err(LedgerError::UnknownLot(lot))
        }
    }
}
