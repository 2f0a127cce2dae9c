//! Batches: logical groupings of events written by one operation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{BatchId, OrgId};
use crate::reason::Reason;

/// What kind of operation produced a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BatchKind {
    /// Lot registration: codes minted.
    Production,
    /// Shipment from one organization to another.
    Shipment,
    /// Treatment of one or more units.
    Treatment,
    /// Disposal of one or more units.
    Disposal,
    /// Recall of a treatment batch.
    Recall,
    /// Return of a shipment batch.
    Return,
}

impl fmt::Display for BatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Production => write!(f, "PRODUCTION"),
            Self::Shipment => write!(f, "SHIPMENT"),
            Self::Treatment => write!(f, "TREATMENT"),
            Self::Disposal => write!(f, "DISPOSAL"),
            Self::Recall => write!(f, "RECALL"),
            Self::Return => write!(f, "RETURN"),
        }
    }
}

/// Reversal bookkeeping stamped on a batch once it has been undone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReversalInfo {
    /// Why the batch was reversed.
    pub reason: Reason,
    /// When the reversal committed.
    pub reversed_at: DateTime<Utc>,
    /// The batch of compensating events.
    pub by: BatchId,
}

/// A convenience aggregate over the events sharing one `batch` id.
///
/// The `reversal` field mirrors the ledger for reporting; the
/// authoritative "already reversed" check is the presence of a reversal
/// event referencing this batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    /// Identifier shared by this operation's events.
    pub id: BatchId,
    /// What kind of operation this was.
    pub kind: BatchKind,
    /// When the operation committed.
    pub created_at: DateTime<Utc>,
    /// The organization that performed the operation.
    pub initiated_by: OrgId,
    /// Number of codes in the batch.
    pub quantity: u32,
    /// Set once the batch has been recalled or returned.
    pub reversal: Option<ReversalInfo>,
}

impl Batch {
    /// Whether this batch has been reversed.
    #[must_use]
    pub const fn is_reversed(&self) -> bool {
        self.reversal.is_some()
    }

    /// Whether this batch kind can be reversed at all.
    ///
    /// Treatments are recalled, shipments are returned; everything else
    /// is permanent.
    #[must_use]
    pub const fn is_reversible_kind(&self) -> bool {
        matches!(self.kind, BatchKind::Shipment | BatchKind::Treatment)
    }
}
