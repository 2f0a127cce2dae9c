//! Read-only queries over the traceability ledger.
//!
//! Everything here is a projection over the event log and the
//! registry; there are no mutation paths:
//!
//! - [`history`] - filtered event listings (date range, action kinds,
//!   organization, product, lot number, code, batch)
//! - [`trace`] / [`trace_by_token`] - one unit's full custody chain
//! - [`stock_report`] - what an organization holds, by product and lot
//! - [`audit_chain`] - verify every code's history forms a consistent
//!   owner chain

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod audit;
mod filter;
mod trace;

pub use audit::{audit_chain, ChainViolation};
pub use filter::{history, HistoryFilter};
pub use trace::{stock_report, trace, trace_by_token, CustodyStep, CustodyTrace, StockLine};
