//! Property-based tests: conservation of units under arbitrary
//! operation sequences.
//!
//! Run with: cargo test -p medtrace --test `property_tests`

use chrono::NaiveDate;
use proptest::prelude::*;

use medtrace::{
    ActionKind, BatchId, DisposalReason, DisposalRequest, HistoryFilter, OrgKind, PatientRef,
    ShipmentRequest, StockSelector, TraceLedger, TreatmentRequest,
};

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// One step of a random scenario. Quantities are deliberately allowed
/// to exceed availability; those operations must fail cleanly without
/// corrupting the ledger.
#[derive(Debug, Clone)]
enum Op {
    ShipToDistributor(u32),
    ShipToHospital(u32),
    Treat(u32),
    Dispose(u32),
    RecallLastTreatment,
    ReturnLastShipment,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u32..30).prop_map(Op::ShipToDistributor),
        (1u32..30).prop_map(Op::ShipToHospital),
        (1u32..10).prop_map(Op::Treat),
        (1u32..5).prop_map(Op::Dispose),
        Just(Op::RecallLastTreatment),
        Just(Op::ReturnLastShipment),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// After any sequence of operations, every minted unit is accounted
    /// for exactly once (in stock somewhere, used, or disposed), and the
    /// custody chain of every code is consistent.
    #[test]
    fn units_are_conserved(ops in prop::collection::vec(arb_op(), 0..24)) {
        const MINTED: u32 = 60;

        let trace = TraceLedger::new();
        let maker = trace.register_organization("Acme", OrgKind::Manufacturer, "ACM");
        let distributor = trace.register_organization("MedSupply", OrgKind::Distributor, "MSP");
        let hospital = trace.register_organization("St. Jude", OrgKind::Hospital, "SJH");
        for org in [maker, distributor, hospital] {
            trace.approve_organization(org).unwrap();
        }
        let product = trace.register_product(maker, "UDI-0001", "Stent X2").unwrap();
        trace
            .register_production(maker, product, date(2026, 1, 1), date(2028, 1, 1), MINTED / 2)
            .unwrap();
        trace
            .register_production(maker, product, date(2026, 2, 1), date(2028, 2, 1), MINTED / 2)
            .unwrap();

        let mut treatments: Vec<BatchId> = Vec::new();
        let mut shipments: Vec<BatchId> = Vec::new();

        for op in ops {
            match op {
                Op::ShipToDistributor(quantity) => {
                    if let Ok(receipt) = trace.ship(&ShipmentRequest {
                        from: maker,
                        to: distributor,
                        selector: StockSelector::Auto { product, lot: None, quantity },
                        hold: None,
                    }) {
                        shipments.push(receipt.batch);
                    }
                }
                Op::ShipToHospital(quantity) => {
                    if let Ok(receipt) = trace.ship(&ShipmentRequest {
                        from: distributor,
                        to: hospital,
                        selector: StockSelector::Auto { product, lot: None, quantity },
                        hold: None,
                    }) {
                        shipments.push(receipt.batch);
                    }
                }
                Op::Treat(quantity) => {
                    if let Ok(receipt) = trace.treat(&TreatmentRequest {
                        hospital,
                        patient: PatientRef::new("010-1234-5678"),
                        selector: StockSelector::Auto { product, lot: None, quantity },
                        hold: None,
                    }) {
                        treatments.push(receipt.batch);
                    }
                }
                Op::Dispose(quantity) => {
                    let _ = trace.dispose(&DisposalRequest {
                        org: hospital,
                        reason: DisposalReason::Expired,
                        selector: StockSelector::Auto { product, lot: None, quantity },
                        hold: None,
                    });
                }
                Op::RecallLastTreatment => {
                    if let Some(batch) = treatments.pop() {
                        let _ = trace.recall(batch, hospital, "precautionary recall");
                    }
                }
                Op::ReturnLastShipment => {
                    if let Some(batch) = shipments.pop() {
                        // the receiver differs per shipment; try both
                        if trace.return_shipment(batch, hospital, "overstock").is_err() {
                            let _ = trace.return_shipment(batch, distributor, "overstock");
                        }
                    }
                }
            }
        }

        // every custody chain is still consistent
        prop_assert_eq!(trace.audit(), vec![]);

        // conservation: in stock + used + disposed == minted
        let in_stock: u32 = [maker, distributor, hospital]
            .iter()
            .map(|&org| trace.available_quantity(product, org, None).unwrap())
            .sum();
        let treated = trace
            .history(&HistoryFilter::new().with_kinds([ActionKind::Treated]))
            .len() as u32;
        let recalled = trace
            .history(&HistoryFilter::new().with_kinds([ActionKind::Recalled]))
            .len() as u32;
        let disposed = trace
            .history(&HistoryFilter::new().with_kinds([ActionKind::Disposed]))
            .len() as u32;
        let used = treated - recalled;

        prop_assert_eq!(in_stock + used + disposed, MINTED);
    }
}
