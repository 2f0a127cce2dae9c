//! Ledger events: the append-only record of every ownership change.
//!
//! [`TransferAction`] is a closed sum with one variant per action type,
//! each carrying only the fields relevant to it. Everything that needs
//! per-action behavior does an exhaustive match, so adding an action
//! type is a compile error everywhere it matters rather than a silent
//! gap.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::code::{CodeStatus, Owner, PatientRef};
use crate::ids::{BatchId, CodeId, EventId, OrgId};
use crate::reason::{DisposalReason, Reason};

/// Everything that can happen to a virtual code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferAction {
    /// Minted at production registration; custody begins at the manufacturer.
    Produced {
        /// The manufacturer that minted the unit.
        manufacturer: OrgId,
    },
    /// Dispatch leg of a shipment. Custody is unchanged until `Received`.
    Shipped {
        /// Sending organization.
        from: OrgId,
        /// Destination organization.
        to: OrgId,
    },
    /// Acceptance leg of a shipment; custody moves to the destination.
    Received {
        /// Sending organization.
        from: OrgId,
        /// Destination organization.
        to: OrgId,
    },
    /// Applied to a patient by a hospital.
    Treated {
        /// The treating hospital.
        hospital: OrgId,
        /// The patient the unit was applied to.
        patient: PatientRef,
    },
    /// Time-boxed reversal of a treatment; the unit returns to the hospital.
    Recalled {
        /// The hospital taking the unit back.
        hospital: OrgId,
        /// The patient the unit is recalled from.
        patient: PatientRef,
        /// Why the treatment was recalled.
        reason: Reason,
        /// The treatment batch being reversed.
        origin: BatchId,
    },
    /// Dispatch leg of a shipment return. Custody is unchanged until
    /// `ReturnReceived`.
    ReturnSent {
        /// The returning (receiving-side) organization.
        from: OrgId,
        /// The original sender the units go back to.
        to: OrgId,
        /// Why the shipment was returned.
        reason: Reason,
        /// The shipment batch being reversed.
        origin: BatchId,
    },
    /// Acceptance leg of a shipment return; custody moves back to the
    /// original sender.
    ReturnReceived {
        /// The returning (receiving-side) organization.
        from: OrgId,
        /// The original sender the units go back to.
        to: OrgId,
        /// Why the shipment was returned.
        reason: Reason,
        /// The shipment batch being reversed.
        origin: BatchId,
    },
    /// Terminal destruction or loss. The owner keeps attribution but the
    /// unit never moves again.
    Disposed {
        /// The organization that held the unit.
        owner: OrgId,
        /// Why the unit was disposed of.
        reason: DisposalReason,
    },
}

impl TransferAction {
    /// The fieldless discriminant of this action.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::Produced { .. } => ActionKind::Produced,
            Self::Shipped { .. } => ActionKind::Shipped,
            Self::Received { .. } => ActionKind::Received,
            Self::Treated { .. } => ActionKind::Treated,
            Self::Recalled { .. } => ActionKind::Recalled,
            Self::ReturnSent { .. } => ActionKind::ReturnSent,
            Self::ReturnReceived { .. } => ActionKind::ReturnReceived,
            Self::Disposed { .. } => ActionKind::Disposed,
        }
    }

    /// The custodian the unit left, if any. `None` for production.
    #[must_use]
    pub fn from_owner(&self) -> Option<Owner> {
        match self {
            Self::Produced { .. } => None,
            Self::Shipped { from, .. }
            | Self::Received { from, .. }
            | Self::ReturnSent { from, .. }
            | Self::ReturnReceived { from, .. } => Some(Owner::Org(*from)),
            Self::Treated { hospital, .. } => Some(Owner::Org(*hospital)),
            Self::Recalled { patient, .. } => Some(Owner::Patient(patient.clone())),
            Self::Disposed { owner, .. } => Some(Owner::Org(*owner)),
        }
    }

    /// The custodian the unit went to, if any. `None` for disposal.
    #[must_use]
    pub fn to_owner(&self) -> Option<Owner> {
        match self {
            Self::Produced { manufacturer } => Some(Owner::Org(*manufacturer)),
            Self::Shipped { to, .. }
            | Self::Received { to, .. }
            | Self::ReturnSent { to, .. }
            | Self::ReturnReceived { to, .. } => Some(Owner::Org(*to)),
            Self::Treated { patient, .. } => Some(Owner::Patient(patient.clone())),
            Self::Recalled { hospital, .. } => Some(Owner::Org(*hospital)),
            Self::Disposed { .. } => None,
        }
    }

    /// The new owner once this event is applied, or `None` if custody is
    /// unchanged (dispatch legs and disposal keep the current owner).
    #[must_use]
    pub fn owner_after(&self) -> Option<Owner> {
        match self {
            Self::Produced { manufacturer } => Some(Owner::Org(*manufacturer)),
            Self::Received { to, .. } | Self::ReturnReceived { to, .. } => Some(Owner::Org(*to)),
            Self::Treated { patient, .. } => Some(Owner::Patient(patient.clone())),
            Self::Recalled { hospital, .. } => Some(Owner::Org(*hospital)),
            Self::Shipped { .. } | Self::ReturnSent { .. } | Self::Disposed { .. } => None,
        }
    }

    /// The new status once this event is applied, or `None` if the status
    /// is unchanged.
    #[must_use]
    pub const fn status_after(&self) -> Option<CodeStatus> {
        match self {
            Self::Produced { .. }
            | Self::Received { .. }
            | Self::Recalled { .. }
            | Self::ReturnReceived { .. } => Some(CodeStatus::InStock),
            Self::Treated { .. } => Some(CodeStatus::Used),
            Self::Disposed { .. } => Some(CodeStatus::Disposed),
            Self::Shipped { .. } | Self::ReturnSent { .. } => None,
        }
    }

    /// The batch this action reverses, if it is a reversal.
    #[must_use]
    pub const fn reverses(&self) -> Option<BatchId> {
        match self {
            Self::Recalled { origin, .. }
            | Self::ReturnSent { origin, .. }
            | Self::ReturnReceived { origin, .. } => Some(*origin),
            Self::Produced { .. }
            | Self::Shipped { .. }
            | Self::Received { .. }
            | Self::Treated { .. }
            | Self::Disposed { .. } => None,
        }
    }

    /// The free-text reason attached to this action, if any.
    #[must_use]
    pub fn reason_text(&self) -> Option<&str> {
        match self {
            Self::Recalled { reason, .. }
            | Self::ReturnSent { reason, .. }
            | Self::ReturnReceived { reason, .. } => Some(reason.as_str()),
            Self::Disposed { reason, .. } => reason.detail(),
            Self::Produced { .. }
            | Self::Shipped { .. }
            | Self::Received { .. }
            | Self::Treated { .. } => None,
        }
    }
}

/// Fieldless discriminant of [`TransferAction`], used by history filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// Unit minted at production.
    Produced,
    /// Shipment dispatched.
    Shipped,
    /// Shipment accepted.
    Received,
    /// Unit applied to a patient.
    Treated,
    /// Treatment reversed.
    Recalled,
    /// Return dispatched.
    ReturnSent,
    /// Return accepted.
    ReturnReceived,
    /// Unit destroyed or lost.
    Disposed,
}

impl ActionKind {
    /// Whether this kind reverses an earlier batch.
    #[must_use]
    pub const fn is_reversal(self) -> bool {
        matches!(self, Self::Recalled | Self::ReturnSent | Self::ReturnReceived)
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PRODUCED" => Ok(Self::Produced),
            "SHIPPED" => Ok(Self::Shipped),
            "RECEIVED" => Ok(Self::Received),
            "TREATED" => Ok(Self::Treated),
            "RECALLED" => Ok(Self::Recalled),
            "RETURN_SENT" => Ok(Self::ReturnSent),
            "RETURN_RECEIVED" => Ok(Self::ReturnReceived),
            "DISPOSED" => Ok(Self::Disposed),
            _ => Err(format!("unknown action kind: {s}")),
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Produced => write!(f, "PRODUCED"),
            Self::Shipped => write!(f, "SHIPPED"),
            Self::Received => write!(f, "RECEIVED"),
            Self::Treated => write!(f, "TREATED"),
            Self::Recalled => write!(f, "RECALLED"),
            Self::ReturnSent => write!(f, "RETURN_SENT"),
            Self::ReturnReceived => write!(f, "RETURN_RECEIVED"),
            Self::Disposed => write!(f, "DISPOSED"),
        }
    }
}

/// An immutable, append-only ledger entry.
///
/// Never updated or deleted; reversal is a *new* event. `id` is the
/// global append sequence, so per-code history is `order by id`, not by
/// wall clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEvent {
    /// Append-sequence identifier.
    pub id: EventId,
    /// The code this event concerns.
    pub code: CodeId,
    /// The logical operation this event was part of.
    pub batch: BatchId,
    /// Wall-clock time of the commit.
    pub at: DateTime<Utc>,
    /// What happened.
    pub action: TransferAction,
}
