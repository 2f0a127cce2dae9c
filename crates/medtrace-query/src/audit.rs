//! Custody-chain audit.
//!
//! Walks every code's history and verifies the owner chain is
//! consistent: each event departs from the custodian the previous
//! events established. Dispatch/acceptance pairs (`Shipped`/`Received`,
//! `ReturnSent`/`ReturnReceived`) count as a single hop (the dispatch
//! leg does not move custody), so the chain holds across them without
//! special cases.

use medtrace_core::{ActionKind, CodeId, CodeStatus, EventId, Owner, TransferAction};
use medtrace_ledger::Ledger;

/// One inconsistency found by the audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainViolation {
    /// The code whose chain is broken.
    pub code: CodeId,
    /// The offending event.
    pub event: EventId,
    /// Human-readable description.
    pub detail: String,
}

/// Audit the entire ledger.
///
/// Returns every violation found; an empty vec means every code's
/// history forms a consistent custody chain ending in a live or
/// terminal state.
#[must_use]
pub fn audit_chain(ledger: &Ledger) -> Vec<ChainViolation> {
    let mut violations = Vec::new();
    let mut per_code: std::collections::HashMap<CodeId, Vec<_>> = std::collections::HashMap::new();

    for event in ledger.all_events() {
        per_code.entry(event.code).or_default().push(event);
    }

    for (code, events) in per_code {
        let mut custodian: Option<Owner> = None;
        let mut status = CodeStatus::InStock;
        let mut minted = false;

        for event in events {
            let kind = event.action.kind();

            match &event.action {
                TransferAction::Produced { .. } => {
                    if minted {
                        violations.push(ChainViolation {
                            code,
                            event: event.id,
                            detail: "code produced twice".to_owned(),
                        });
                    }
                    minted = true;
                }
                _ if !minted => {
                    violations.push(ChainViolation {
                        code,
                        event: event.id,
                        detail: format!("{kind} before production"),
                    });
                }
                _ => {
                    // terminal states accept no further events, except
                    // that a treated unit may still be recalled
                    match status {
                        CodeStatus::Disposed => violations.push(ChainViolation {
                            code,
                            event: event.id,
                            detail: format!("{kind} after disposal"),
                        }),
                        CodeStatus::Used if kind != ActionKind::Recalled => {
                            violations.push(ChainViolation {
                                code,
                                event: event.id,
                                detail: format!("{kind} on a used unit"),
                            });
                        }
                        _ => {}
                    }

                    if event.action.from_owner() != custodian {
                        violations.push(ChainViolation {
                            code,
                            event: event.id,
                            detail: format!(
                                "{kind} departs from {:?} but custodian is {:?}",
                                event.action.from_owner(),
                                custodian
                            ),
                        });
                    }
                }
            }

            if let Some(next) = event.action.owner_after() {
                custodian = Some(next);
            }
            if let Some(next) = event.action.status_after() {
                status = next;
            }
        }
    }

    violations.sort_by_key(|v| v.event);
    violations
}
