//! The reversal service: recall and return.
//!
//! The two reversal kinds are deliberately asymmetric:
//!
//! - **Recall** undoes a treatment. Only the hospital that performed it
//!   may recall, and only within [`RECALL_WINDOW_HOURS`] of the
//!   treatment time.
//! - **Return** undoes a shipment. Only the *receiving* organization may
//!   initiate, with no time limit, but only while it still holds every
//!   code of the batch in stock.
//!
//! Both write compensating events (history is never edited), and both
//! are permanent: a reversed batch cannot be reversed again.

use std::sync::Arc;

use chrono::Duration;
use serde_json::json;
use tracing::warn;

use medtrace_core::{
    ActionKind, BatchId, BatchKind, Clock, CodeId, CodeStatus, EventId, OrgId, Owner, Reason,
    SystemClock, TransferAction, limits::RECALL_WINDOW_HOURS,
};
use medtrace_ledger::{EventDraft, Ledger};

use crate::error::ReversalError;
use crate::notify::{NoopSink, Notification, NotificationSink};

/// Result of a successful recall or return.
#[derive(Debug, Clone)]
pub struct ReversalReceipt {
    /// The batch of compensating events.
    pub batch: BatchId,
    /// The batch that was reversed.
    pub reversed: BatchId,
    /// The written events.
    pub events: Vec<EventId>,
    /// Codes reverted.
    pub quantity: u32,
}

/// Orchestrates recall and return.
pub struct ReversalService {
    ledger: Arc<Ledger>,
    notifier: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
}

impl ReversalService {
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

    /// Recall a treatment batch.
    ///
    /// Every code of the batch reverts to the hospital, in stock, and
    /// the affected patients are notified after the commit.
    pub fn recall(
        &self,
        treatment_batch: BatchId,
        caller: OrgId,
        reason: &str,
    ) -> Result<ReversalReceipt, ReversalError> {
        let reason = Reason::new(reason)?;
        let batch = self.ledger.batch(treatment_batch)?;

        if batch.kind != BatchKind::Treatment {
            return Err(ReversalError::NotReversible {
                batch: treatment_batch,
                kind: batch.kind,
            });
        }
        if batch.initiated_by != caller {
            return Err(ReversalError::NotOwner {
                org: caller,
                batch: treatment_batch,
            });
        }
        if self.ledger.reversal_of(treatment_batch).is_some() {
            return Err(ReversalError::AlreadyReversed {
                batch: treatment_batch,
            });
        }

        let elapsed = self.clock.now() - batch.created_at;
        if elapsed > Duration::hours(RECALL_WINDOW_HOURS) {
            return Err(ReversalError::TimeWindowExceeded {
                elapsed_hours: elapsed.num_hours(),
                limit_hours: RECALL_WINDOW_HOURS,
            });
        }

        let events = self.ledger.batch_events(treatment_batch)?;
        let mut drafts = Vec::with_capacity(events.len());
        let mut patients = Vec::with_capacity(events.len());
        for event in &events {
            if let TransferAction::Treated { hospital, patient } = &event.action {
                drafts.push(EventDraft {
                    code: event.code,
                    require_owner: Owner::Patient(patient.clone()),
                    require_status: CodeStatus::Used,
                    action: TransferAction::Recalled {
                        hospital: *hospital,
                        patient: patient.clone(),
                        reason: reason.clone(),
                        origin: treatment_batch,
                    },
                });
                patients.push(patient.clone());
            }
        }

        let receipt = self.ledger.commit(
            BatchKind::Recall,
            caller,
            self.clock.now(),
            &drafts,
            Some((treatment_batch, reason.clone())),
        )?;

        for patient in patients {
            self.notify(Notification {
                event: ActionKind::Recalled,
                recipient: patient.contact().to_owned(),
                payload: json!({
                    "batch": treatment_batch.value(),
                    "reason": reason.as_str(),
                }),
            });
        }

        Ok(ReversalReceipt {
            batch: receipt.batch,
            reversed: treatment_batch,
            quantity: receipt.events.len() as u32,
            events: receipt.events,
        })
    }

    /// Return a shipment batch to its sender.
    ///
    /// Blocked unless the receiver still holds every code of the batch
    /// in stock; a single unit shipped onward, treated, or disposed
    /// blocks the whole return.
    pub fn return_shipment(
        &self,
        shipment_batch: BatchId,
        caller: OrgId,
        reason: &str,
    ) -> Result<ReversalReceipt, ReversalError> {
        let reason = Reason::new(reason)?;
        let batch = self.ledger.batch(shipment_batch)?;

        if batch.kind != BatchKind::Shipment {
            return Err(ReversalError::NotReversible {
                batch: shipment_batch,
                kind: batch.kind,
            });
        }

        let events = self.ledger.batch_events(shipment_batch)?;
        let (sender, receiver) = events
            .iter()
            .find_map(|e| match e.action {
                TransferAction::Shipped { from, to } => Some((from, to)),
                _ => None,
            })
            .ok_or(ReversalError::NotReversible {
                batch: shipment_batch,
                kind: batch.kind,
            })?;

        if caller != receiver {
            return Err(ReversalError::NotOwner {
                org: caller,
                batch: shipment_batch,
            });
        }
        if self.ledger.reversal_of(shipment_batch).is_some() {
            return Err(ReversalError::AlreadyReversed {
                batch: shipment_batch,
            });
        }

        let codes = self.ledger.batch_codes(shipment_batch)?;
        let moved: Vec<CodeId> = codes
            .iter()
            .filter(|&&id| {
                self.ledger
                    .code(id)
                    .map_or(true, |c| !c.is_available_to(receiver))
            })
            .copied()
            .collect();
        if !moved.is_empty() {
            return Err(ReversalError::CodesNotOwned { codes: moved });
        }

        let drafts: Vec<EventDraft> = codes
            .iter()
            .flat_map(|&code| {
                [
                    EventDraft {
                        code,
                        require_owner: Owner::Org(receiver),
                        require_status: CodeStatus::InStock,
                        action: TransferAction::ReturnSent {
                            from: receiver,
                            to: sender,
                            reason: reason.clone(),
                            origin: shipment_batch,
                        },
                    },
                    EventDraft {
                        code,
                        require_owner: Owner::Org(receiver),
                        require_status: CodeStatus::InStock,
                        action: TransferAction::ReturnReceived {
                            from: receiver,
                            to: sender,
                            reason: reason.clone(),
                            origin: shipment_batch,
                        },
                    },
                ]
            })
            .collect();

        let receipt = self.ledger.commit(
            BatchKind::Return,
            caller,
            self.clock.now(),
            &drafts,
            Some((shipment_batch, reason.clone())),
        )?;

        if let Ok(sender_org) = self.ledger.organization(sender) {
            self.notify(Notification {
                event: ActionKind::ReturnReceived,
                recipient: sender_org.name,
                payload: json!({
                    "batch": shipment_batch.value(),
                    "reason": reason.as_str(),
                    "quantity": codes.len(),
                }),
            });
        }

        Ok(ReversalReceipt {
            batch: receipt.batch,
            reversed: shipment_batch,
            quantity: codes.len() as u32,
            events: receipt.events,
        })
    }

    fn notify(&self, notification: Notification) {
        if let Err(err) = self.notifier.dispatch(notification) {
            warn!(%err, "notification dispatch failed");
        }
    }
}
