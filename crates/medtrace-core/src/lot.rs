//! Lots: manufacturing batches, the FIFO allocation unit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ids::{LotId, ProductId};

/// One manufacturing batch of a product.
///
/// Created exactly once at production registration and immutable
/// thereafter; medical traceability requires permanent retention.
/// `manufacture_date` is the FIFO sort key across lots of the same
/// product, with `id` breaking ties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lot {
    /// Registry-assigned identifier.
    pub id: LotId,
    /// The product this batch belongs to.
    pub product: ProductId,
    /// Structured lot number: manufacturer prefix + date + sequence.
    pub lot_number: String,
    /// Date of manufacture; FIFO sort key.
    pub manufacture_date: NaiveDate,
    /// Expiry date.
    pub expiry_date: NaiveDate,
    /// Units minted for this lot.
    pub quantity: u32,
}

impl Lot {
    /// Whether the lot is past its expiry date on the given day.
    #[must_use]
    pub fn is_expired(&self, on: NaiveDate) -> bool {
        on > self.expiry_date
    }

    /// Derive the structured lot number for a batch.
    ///
    /// Format: `{PREFIX}-{YYMMDD}-{SEQ:03}`, where `seq` is the
    /// per-manufacturer production counter.
    #[must_use]
    pub fn derive_lot_number(prefix: &str, manufacture_date: NaiveDate, seq: u32) -> String {
        format!("{}-{}-{:03}", prefix, manufacture_date.format("%y%m%d"), seq)
    }
}
