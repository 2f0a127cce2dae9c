//! Products: catalog entries owned by one manufacturer.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{OrgId, ProductId};

/// Why a product was taken off the market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeactivationReason {
    /// Discontinued by the manufacturer.
    Discontinued,
    /// Withdrawn over a safety issue.
    SafetyIssue,
    /// Withdrawn over a quality issue.
    QualityIssue,
    /// Any other reason.
    Other,
}

impl fmt::Display for DeactivationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discontinued => write!(f, "DISCONTINUED"),
            Self::SafetyIssue => write!(f, "SAFETY_ISSUE"),
            Self::QualityIssue => write!(f, "QUALITY_ISSUE"),
            Self::Other => write!(f, "OTHER"),
        }
    }
}

/// A catalog entry owned by one manufacturer.
///
/// Identity is immutable. Deactivation stops *new production* only:
/// already-minted codes of a deactivated product remain valid,
/// transferable, and traceable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Registry-assigned identifier.
    pub id: ProductId,
    /// The manufacturer that owns this entry.
    pub manufacturer: OrgId,
    /// Regulatory device identifier (UDI-DI).
    pub udi_di: String,
    /// Manufacturer's model name.
    pub model_name: String,
    /// Whether new lots may be produced.
    pub is_active: bool,
    /// Set when `is_active` is false.
    pub deactivation_reason: Option<DeactivationReason>,
}

impl Product {
    /// Create an active product.
    #[must_use]
    pub fn new(
        id: ProductId,
        manufacturer: OrgId,
        udi_di: impl Into<String>,
        model_name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            manufacturer,
            udi_di: udi_di.into(),
            model_name: model_name.into(),
            is_active: true,
            deactivation_reason: None,
        }
    }

    /// Mark the product inactive with the given reason.
    pub fn deactivate(&mut self, reason: DeactivationReason) {
        self.is_active = false;
        self.deactivation_reason = Some(reason);
    }
}
