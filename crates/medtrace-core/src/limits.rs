//! Operational limits shared across the transfer and reversal services.

/// Hours after a treatment event during which the performing hospital may
/// still recall it. Past this window, recall fails with
/// `TimeWindowExceeded`.
pub const RECALL_WINDOW_HOURS: i64 = 24;

/// Maximum length, in characters, of the free-text reason attached to a
/// recall, return, or disposal.
pub const REASON_MAX_LEN: usize = 500;

/// How many times a transfer re-runs allocation after losing a commit
/// race before the failure surfaces as insufficient inventory.
pub const ALLOCATION_RETRY_LIMIT: usize = 3;
