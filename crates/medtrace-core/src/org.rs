//! Organizations: the parties that can hold custody of a unit.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ids::OrgId;

/// The role an organization plays in the supply chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrgKind {
    /// Manufactures products and mints lots.
    Manufacturer,
    /// Buys from manufacturers, sells to hospitals.
    Distributor,
    /// Treats patients with units.
    Hospital,
    /// Platform operator; approves organizations, holds no stock.
    Admin,
}

impl FromStr for OrgKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "MANUFACTURER" => Ok(Self::Manufacturer),
            "DISTRIBUTOR" => Ok(Self::Distributor),
            "HOSPITAL" => Ok(Self::Hospital),
            "ADMIN" => Ok(Self::Admin),
            _ => Err(format!("unknown organization kind: {s}")),
        }
    }
}

impl fmt::Display for OrgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manufacturer => write!(f, "MANUFACTURER"),
            Self::Distributor => write!(f, "DISTRIBUTOR"),
            Self::Hospital => write!(f, "HOSPITAL"),
            Self::Admin => write!(f, "ADMIN"),
        }
    }
}

/// Approval lifecycle of an organization.
///
/// Status is mutated only by the external admin approval workflow; the
/// core reads it to decide whether an organization may transfer stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OrgStatus {
    /// Registered, awaiting admin approval.
    #[default]
    PendingApproval,
    /// Approved and operating.
    Active,
    /// Temporarily suspended.
    Inactive,
    /// Soft-deleted; retained for ledger history.
    Deleted,
}

impl fmt::Display for OrgStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PendingApproval => write!(f, "PENDING_APPROVAL"),
            Self::Active => write!(f, "ACTIVE"),
            Self::Inactive => write!(f, "INACTIVE"),
            Self::Deleted => write!(f, "DELETED"),
        }
    }
}

/// A party in the supply chain.
///
/// Owns zero or more virtual codes at any time. The `prefix` is a short
/// uppercase code used when deriving lot numbers for manufacturers
/// (e.g. `"ACM"` yields lot numbers like `ACM-260110-001`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    /// Registry-assigned identifier.
    pub id: OrgId,
    /// Display name.
    pub name: String,
    /// Supply-chain role.
    pub kind: OrgKind,
    /// Approval status; only `Active` organizations move stock.
    pub status: OrgStatus,
    /// Short code used in derived lot numbers.
    pub prefix: String,
}

impl Organization {
    /// Create an organization in the `PendingApproval` state.
    #[must_use]
    pub fn new(id: OrgId, name: impl Into<String>, kind: OrgKind, prefix: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            status: OrgStatus::default(),
            prefix: prefix.into().to_uppercase(),
        }
    }

    /// Whether this organization may currently hold and move stock.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.status, OrgStatus::Active)
    }
}
