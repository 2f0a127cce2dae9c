//! Concurrent allocation tests: racing transfers must never oversell.

use std::sync::Arc;
use std::thread;

use chrono::NaiveDate;

use medtrace::{
    OrgId, OrgKind, ProductId, ShipmentRequest, StockSelector, TraceLedger, TransferError,
};

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

struct World {
    trace: Arc<TraceLedger>,
    maker: OrgId,
    product: ProductId,
    hospitals: Vec<OrgId>,
}

fn world(units: u32, num_hospitals: usize) -> World {
    let trace = Arc::new(TraceLedger::new());
    let maker = trace.register_organization("Acme", OrgKind::Manufacturer, "ACM");
    trace.approve_organization(maker).unwrap();
    let product = trace.register_product(maker, "UDI-0001", "Stent X2").unwrap();
    trace
        .register_production(maker, product, date(2026, 1, 1), date(2028, 1, 1), units)
        .unwrap();

    let hospitals = (0..num_hospitals)
        .map(|i| {
            let org = trace.register_organization(
                format!("Hospital {i}"),
                OrgKind::Hospital,
                format!("H{i:02}"),
            );
            trace.approve_organization(org).unwrap();
            org
        })
        .collect();

    World {
        trace,
        maker,
        product,
        hospitals,
    }
}

#[test]
fn concurrent_shipments_never_oversell() {
    // 10 units, 8 threads each trying to take 3: at most 3 can win.
    let w = world(10, 8);

    let handles: Vec<_> = w
        .hospitals
        .iter()
        .map(|&hospital| {
            let trace = Arc::clone(&w.trace);
            let product = w.product;
            let maker = w.maker;
            thread::spawn(move || {
                trace.ship(&ShipmentRequest {
                    from: maker,
                    to: hospital,
                    selector: StockSelector::Auto {
                        product,
                        lot: None,
                        quantity: 3,
                    },
                    hold: None,
                })
            })
        })
        .collect();

    let mut shipped = 0u32;
    for handle in handles {
        match handle.join().unwrap() {
            Ok(receipt) => shipped += receipt.quantity,
            Err(TransferError::InsufficientInventory { .. }) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert!(shipped <= 10, "oversold: {shipped} units shipped from 10");
    let remaining = w.trace.available_quantity(w.product, w.maker, None).unwrap();
    assert_eq!(remaining + shipped, 10);

    // every hospital's stock is consistent with the ledger
    let delivered: u32 = w
        .hospitals
        .iter()
        .map(|&h| w.trace.available_quantity(w.product, h, None).unwrap())
        .sum();
    assert_eq!(delivered, shipped);
    assert_eq!(w.trace.audit(), vec![]);
}

#[test]
fn racing_claims_on_the_same_codes_pick_one_winner() {
    let w = world(3, 2);
    let codes = {
        let snapshot = w.trace.allocate(w.maker, w.product, None, 3).unwrap();
        snapshot.selections.iter().map(|s| s.code).collect::<Vec<_>>()
    };

    let handles: Vec<_> = w.hospitals[..2]
        .iter()
        .map(|&hospital| {
            let trace = Arc::clone(&w.trace);
            let maker = w.maker;
            let codes = codes.clone();
            thread::spawn(move || {
                trace.ship(&ShipmentRequest {
                    from: maker,
                    to: hospital,
                    selector: StockSelector::Codes(codes),
                    hold: None,
                })
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "exactly one claim must win");
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, TransferError::NotOwner { .. })));

    assert_eq!(w.trace.audit(), vec![]);
}
