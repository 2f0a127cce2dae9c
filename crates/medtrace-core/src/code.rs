//! Virtual codes: the serialized, individually trackable units.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ids::{CodeId, LotId, OrgId};

/// Current status of a virtual code, as projected from its latest event.
///
/// `Used` iff the latest non-reversed event is a treatment; `Disposed`
/// iff the latest event is a disposal; otherwise `InStock`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CodeStatus {
    /// Held by an organization, available for transfer.
    #[default]
    InStock,
    /// Applied to a patient.
    Used,
    /// Destroyed, lost, or otherwise terminal.
    Disposed,
}

impl CodeStatus {
    /// Whether the code can still change hands.
    #[must_use]
    pub const fn is_transferable(self) -> bool {
        matches!(self, Self::InStock)
    }
}

impl FromStr for CodeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "IN_STOCK" => Ok(Self::InStock),
            "USED" => Ok(Self::Used),
            "DISPOSED" => Ok(Self::Disposed),
            _ => Err(format!("unknown code status: {s}")),
        }
    }
}

impl fmt::Display for CodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InStock => write!(f, "IN_STOCK"),
            Self::Used => write!(f, "USED"),
            Self::Disposed => write!(f, "DISPOSED"),
        }
    }
}

/// Terminal patient reference: the contact a treated unit is attributed to.
///
/// Patients are not organizations; a phone contact is all the ledger
/// stores about them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatientRef(String);

impl PatientRef {
    /// Wrap a patient contact, trimming surrounding whitespace.
    #[must_use]
    pub fn new(contact: impl Into<String>) -> Self {
        Self(contact.into().trim().to_owned())
    }

    /// The contact string (phone number).
    #[must_use]
    pub fn contact(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PatientRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who currently holds a code: an organization, or a patient after
/// treatment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Owner {
    /// An organization in the chain.
    Org(OrgId),
    /// A patient, reached via their contact.
    Patient(PatientRef),
}

impl Owner {
    /// The organization id, if the owner is an organization.
    #[must_use]
    pub const fn as_org(&self) -> Option<OrgId> {
        match self {
            Self::Org(id) => Some(*id),
            Self::Patient(_) => None,
        }
    }

    /// Whether the given organization is the owner.
    #[must_use]
    pub fn is_org(&self, org: OrgId) -> bool {
        matches!(self, Self::Org(id) if *id == org)
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Org(id) => write!(f, "org {id}"),
            Self::Patient(patient) => write!(f, "patient {patient}"),
        }
    }
}

/// One serialized, individually trackable unit.
///
/// Exactly one per physical unit, created in bulk when its lot is
/// registered. `owner` and `status` are a materialized projection of
/// the latest relevant ledger event; they are mutated only by the
/// ledger store applying events, never directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualCode {
    /// Registry-assigned identifier.
    pub id: CodeId,
    /// Public-facing token, e.g. `ACM-260110-001-0042`.
    pub token: String,
    /// The lot this unit was minted in.
    pub lot: LotId,
    /// Current custodian.
    pub owner: Owner,
    /// Current status.
    pub status: CodeStatus,
}

impl VirtualCode {
    /// Whether the code is in stock and held by the given organization.
    #[must_use]
    pub fn is_available_to(&self, org: OrgId) -> bool {
        self.status.is_transferable() && self.owner.is_org(org)
    }
}
