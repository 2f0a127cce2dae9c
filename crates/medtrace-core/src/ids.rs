//! Numeric identifier newtypes for every ledger entity.
//!
//! All ids are registry-minted, monotonically increasing `u64` values.
//! [`EventId`] doubles as the global append sequence of the ledger: two
//! events compare in insertion order by comparing their ids, which is
//! what makes per-code history ordering reliable under concurrent
//! writes (wall-clock timestamps alone are not).

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(pub u64);

        impl $name {
            /// The raw numeric value.
            #[must_use]
            pub const fn value(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }
    };
}

entity_id!(
    /// Identifier of an [`Organization`](crate::Organization).
    OrgId
);
entity_id!(
    /// Identifier of a [`Product`](crate::Product).
    ProductId
);
entity_id!(
    /// Identifier of a [`Lot`](crate::Lot).
    LotId
);
entity_id!(
    /// Identifier of a [`VirtualCode`](crate::VirtualCode).
    CodeId
);
entity_id!(
    /// Identifier of a [`Batch`](crate::Batch): one logical transfer operation.
    BatchId
);
entity_id!(
    /// Identifier of a [`TransferEvent`](crate::TransferEvent).
    ///
    /// Also the global append sequence: ids are assigned in commit order.
    EventId
);
