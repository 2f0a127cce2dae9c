//! End-to-end tests of the traceability core through the facade.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, TimeZone, Utc};

use medtrace::{
    ActionKind, DisposalReason, DisposalRequest, HistoryFilter, ManualClock, NoopSink, OrgId,
    OrgKind, ProductId, PatientRef, ReasonError, RecordingSink, ReversalError, ShipmentRequest,
    StockSelector, TraceLedger, TransferError, TreatmentRequest,
};

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

struct World {
    trace: TraceLedger,
    maker: OrgId,
    distributor: OrgId,
    hospital: OrgId,
    product: ProductId,
}

/// Route commit-path tracing into the test writer; `RUST_LOG` narrows it.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn world_with(trace: TraceLedger) -> World {
    init_tracing();
    let maker = trace.register_organization("Acme", OrgKind::Manufacturer, "ACM");
    let distributor = trace.register_organization("MedSupply", OrgKind::Distributor, "MSP");
    let hospital = trace.register_organization("St. Jude", OrgKind::Hospital, "SJH");
    for org in [maker, distributor, hospital] {
        trace.approve_organization(org).unwrap();
    }
    let product = trace.register_product(maker, "UDI-0001", "Stent X2").unwrap();
    World {
        trace,
        maker,
        distributor,
        hospital,
        product,
    }
}

fn world() -> World {
    world_with(TraceLedger::new())
}

fn auto(product: ProductId, quantity: u32) -> StockSelector {
    StockSelector::Auto {
        product,
        lot: None,
        quantity,
    }
}

#[test]
fn fifo_allocation_drains_oldest_lot_first() {
    let w = world();
    let january = w
        .trace
        .register_production(w.maker, w.product, date(2026, 1, 1), date(2028, 1, 1), 10)
        .unwrap();
    let february = w
        .trace
        .register_production(w.maker, w.product, date(2026, 2, 1), date(2028, 2, 1), 10)
        .unwrap();

    w.trace
        .ship(&ShipmentRequest {
            from: w.maker,
            to: w.hospital,
            selector: auto(w.product, 15),
            hold: None,
        })
        .unwrap();

    // all 10 January units gone, 5 February units left
    assert_eq!(
        w.trace.available_quantity(w.product, w.maker, Some(january.lot.id)).unwrap(),
        0
    );
    assert_eq!(
        w.trace.available_quantity(w.product, w.maker, Some(february.lot.id)).unwrap(),
        5
    );
    assert_eq!(w.trace.available_quantity(w.product, w.hospital, None).unwrap(), 15);
}

#[test]
fn recall_succeeds_inside_the_window_and_fails_after_it() {
    let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();

    // 23h59m: still inside
    let clock = Arc::new(ManualClock::new(t0));
    let clock_dyn: Arc<dyn medtrace::Clock> = clock.clone();
    let w = world_with(TraceLedger::with_parts(Arc::new(NoopSink), clock_dyn));
    w.trace
        .register_production(w.maker, w.product, date(2026, 1, 1), date(2028, 1, 1), 5)
        .unwrap();
    w.trace
        .ship(&ShipmentRequest {
            from: w.maker,
            to: w.hospital,
            selector: auto(w.product, 5),
            hold: None,
        })
        .unwrap();
    let treatment = w
        .trace
        .treat(&TreatmentRequest {
            hospital: w.hospital,
            patient: PatientRef::new("010-1234-5678"),
            selector: auto(w.product, 2),
            hold: None,
        })
        .unwrap();

    clock.advance(Duration::hours(23) + Duration::minutes(59));
    w.trace
        .recall(treatment.batch, w.hospital, "adverse reaction")
        .unwrap();
    assert_eq!(w.trace.available_quantity(w.product, w.hospital, None).unwrap(), 5);

    // 24h01m: too late
    let clock = Arc::new(ManualClock::new(t0));
    let clock_dyn: Arc<dyn medtrace::Clock> = clock.clone();
    let w = world_with(TraceLedger::with_parts(Arc::new(NoopSink), clock_dyn));
    w.trace
        .register_production(w.maker, w.product, date(2026, 1, 1), date(2028, 1, 1), 5)
        .unwrap();
    w.trace
        .ship(&ShipmentRequest {
            from: w.maker,
            to: w.hospital,
            selector: auto(w.product, 5),
            hold: None,
        })
        .unwrap();
    let treatment = w
        .trace
        .treat(&TreatmentRequest {
            hospital: w.hospital,
            patient: PatientRef::new("010-1234-5678"),
            selector: auto(w.product, 2),
            hold: None,
        })
        .unwrap();

    clock.advance(Duration::hours(24) + Duration::minutes(1));
    let err = w
        .trace
        .recall(treatment.batch, w.hospital, "adverse reaction")
        .unwrap_err();
    assert!(matches!(err, ReversalError::TimeWindowExceeded { limit_hours: 24, .. }));
}

#[test]
fn return_blocked_once_a_code_has_moved_on() {
    let w = world();
    w.trace
        .register_production(w.maker, w.product, date(2026, 1, 1), date(2028, 1, 1), 5)
        .unwrap();
    let shipment = w
        .trace
        .ship(&ShipmentRequest {
            from: w.maker,
            to: w.hospital,
            selector: auto(w.product, 5),
            hold: None,
        })
        .unwrap();

    // the hospital disposes one of the five
    w.trace
        .dispose(&DisposalRequest {
            org: w.hospital,
            reason: DisposalReason::Defective,
            selector: auto(w.product, 1),
            hold: None,
        })
        .unwrap();

    let err = w
        .trace
        .return_shipment(shipment.batch, w.hospital, "order cancelled")
        .unwrap_err();
    match err {
        ReversalError::CodesNotOwned { codes } => assert_eq!(codes.len(), 1),
        other => panic!("expected CodesNotOwned, got {other:?}"),
    }
    // nothing moved back
    assert_eq!(w.trace.available_quantity(w.product, w.maker, None).unwrap(), 0);
}

#[test]
fn reversal_is_idempotent() {
    let w = world();
    w.trace
        .register_production(w.maker, w.product, date(2026, 1, 1), date(2028, 1, 1), 5)
        .unwrap();
    w.trace
        .ship(&ShipmentRequest {
            from: w.maker,
            to: w.hospital,
            selector: auto(w.product, 5),
            hold: None,
        })
        .unwrap();
    let treatment = w
        .trace
        .treat(&TreatmentRequest {
            hospital: w.hospital,
            patient: PatientRef::new("010-1234-5678"),
            selector: auto(w.product, 3),
            hold: None,
        })
        .unwrap();

    w.trace.recall(treatment.batch, w.hospital, "lot concern").unwrap();
    let err = w
        .trace
        .recall(treatment.batch, w.hospital, "lot concern")
        .unwrap_err();
    assert_eq!(err, ReversalError::AlreadyReversed { batch: treatment.batch });

    // exactly one recall event per treated code, never two
    let recalled = w
        .trace
        .history(&HistoryFilter::new().with_kinds([ActionKind::Recalled]));
    assert_eq!(recalled.len(), 3);
    let mut codes: Vec<_> = recalled.iter().map(|e| e.code).collect();
    codes.sort_unstable();
    codes.dedup();
    assert_eq!(codes.len(), 3);
}

#[test]
fn full_round_trip_restores_the_sender() {
    let w = world();
    w.trace
        .register_production(w.maker, w.product, date(2026, 1, 1), date(2028, 1, 1), 100)
        .unwrap();
    let shipment = w
        .trace
        .ship(&ShipmentRequest {
            from: w.maker,
            to: w.distributor,
            selector: auto(w.product, 100),
            hold: None,
        })
        .unwrap();
    assert_eq!(w.trace.available_quantity(w.product, w.maker, None).unwrap(), 0);

    w.trace
        .return_shipment(shipment.batch, w.distributor, "seasonal overstock")
        .unwrap();

    assert_eq!(w.trace.available_quantity(w.product, w.maker, None).unwrap(), 100);
    assert_eq!(w.trace.available_quantity(w.product, w.distributor, None).unwrap(), 0);
    assert_eq!(w.trace.audit(), vec![]);
}

#[test]
fn reversal_reasons_are_validated() {
    let w = world();
    w.trace
        .register_production(w.maker, w.product, date(2026, 1, 1), date(2028, 1, 1), 2)
        .unwrap();
    let shipment = w
        .trace
        .ship(&ShipmentRequest {
            from: w.maker,
            to: w.hospital,
            selector: auto(w.product, 2),
            hold: None,
        })
        .unwrap();

    let blank = w.trace.return_shipment(shipment.batch, w.hospital, "   ");
    assert_eq!(blank.unwrap_err(), ReversalError::Reason(ReasonError::Required));

    let long = "x".repeat(501);
    let too_long = w.trace.return_shipment(shipment.batch, w.hospital, &long);
    assert_eq!(
        too_long.unwrap_err(),
        ReversalError::Reason(ReasonError::TooLong { len: 501, max: 500 })
    );

    // the batch is still returnable after rejected attempts
    w.trace
        .return_shipment(shipment.batch, w.hospital, "wrong model delivered")
        .unwrap();
}

#[test]
fn reversal_kind_and_caller_are_enforced() {
    let w = world();
    w.trace
        .register_production(w.maker, w.product, date(2026, 1, 1), date(2028, 1, 1), 5)
        .unwrap();
    let shipment = w
        .trace
        .ship(&ShipmentRequest {
            from: w.maker,
            to: w.hospital,
            selector: auto(w.product, 5),
            hold: None,
        })
        .unwrap();

    // a shipment cannot be recalled
    assert!(matches!(
        w.trace.recall(shipment.batch, w.hospital, "x").unwrap_err(),
        ReversalError::NotReversible { .. }
    ));
    // only the receiver may return
    assert!(matches!(
        w.trace.return_shipment(shipment.batch, w.maker, "x").unwrap_err(),
        ReversalError::NotOwner { .. }
    ));

    let treatment = w
        .trace
        .treat(&TreatmentRequest {
            hospital: w.hospital,
            patient: PatientRef::new("010-1234-5678"),
            selector: auto(w.product, 1),
            hold: None,
        })
        .unwrap();

    // a treatment cannot be returned
    assert!(matches!(
        w.trace.return_shipment(treatment.batch, w.hospital, "x").unwrap_err(),
        ReversalError::NotReversible { .. }
    ));
    // only the treating hospital may recall
    assert!(matches!(
        w.trace.recall(treatment.batch, w.distributor, "x").unwrap_err(),
        ReversalError::NotOwner { .. }
    ));
}

#[test]
fn holds_shield_carted_quantities() {
    let w = world();
    w.trace
        .register_production(w.maker, w.product, date(2026, 1, 1), date(2028, 1, 1), 10)
        .unwrap();

    let hold = w.trace.place_hold(w.product, w.maker, None, 6).unwrap();
    assert_eq!(w.trace.available_quantity(w.product, w.maker, None).unwrap(), 4);

    // a competing shipment cannot take the held units
    let err = w
        .trace
        .ship(&ShipmentRequest {
            from: w.maker,
            to: w.distributor,
            selector: auto(w.product, 5),
            hold: None,
        })
        .unwrap_err();
    assert_eq!(
        err,
        TransferError::InsufficientInventory {
            requested: 5,
            available: 4,
            shortfall: 1,
        }
    );

    // the cart owner ships through its own hold, which is then released
    w.trace
        .ship(&ShipmentRequest {
            from: w.maker,
            to: w.hospital,
            selector: auto(w.product, 6),
            hold: Some(hold),
        })
        .unwrap();
    assert_eq!(w.trace.available_quantity(w.product, w.maker, None).unwrap(), 4);
    assert_eq!(w.trace.available_quantity(w.product, w.hospital, None).unwrap(), 6);
}

#[test]
fn notifications_fire_after_commit() {
    let sink = Arc::new(RecordingSink::new());
    let sink_dyn: Arc<dyn medtrace::NotificationSink> = sink.clone();
    let w = world_with(TraceLedger::with_parts(sink_dyn, Arc::new(medtrace::SystemClock)));
    w.trace
        .register_production(w.maker, w.product, date(2026, 1, 1), date(2028, 1, 1), 5)
        .unwrap();
    w.trace
        .ship(&ShipmentRequest {
            from: w.maker,
            to: w.hospital,
            selector: auto(w.product, 5),
            hold: None,
        })
        .unwrap();
    let treatment = w
        .trace
        .treat(&TreatmentRequest {
            hospital: w.hospital,
            patient: PatientRef::new("010-1234-5678"),
            selector: auto(w.product, 2),
            hold: None,
        })
        .unwrap();
    w.trace.recall(treatment.batch, w.hospital, "adverse reaction").unwrap();

    let sent = sink.sent();
    let kinds: Vec<ActionKind> = sent.iter().map(|n| n.event).collect();
    assert_eq!(
        kinds,
        vec![ActionKind::Shipped, ActionKind::Treated, ActionKind::Recalled]
    );
    // patient-facing notices go to the patient contact
    assert_eq!(sent[1].recipient, "010-1234-5678");
    assert_eq!(sent[2].recipient, "010-1234-5678");
    // recall notices carry the reason
    assert_eq!(sent[2].payload["reason"], "adverse reaction");

    // a failed recall (second attempt) produces no notification
    let _ = w.trace.recall(treatment.batch, w.hospital, "again");
    assert_eq!(sink.sent().len(), 3);
}

#[test]
fn deactivated_product_keeps_circulating() {
    let w = world();
    w.trace
        .register_production(w.maker, w.product, date(2026, 1, 1), date(2028, 1, 1), 5)
        .unwrap();
    w.trace
        .deactivate_product(w.product, medtrace::DeactivationReason::Discontinued)
        .unwrap();

    // no new production
    let err = w
        .trace
        .register_production(w.maker, w.product, date(2026, 2, 1), date(2028, 2, 1), 5)
        .unwrap_err();
    assert!(matches!(err, TransferError::Ledger(_)));

    // but existing codes still move
    w.trace
        .ship(&ShipmentRequest {
            from: w.maker,
            to: w.hospital,
            selector: auto(w.product, 5),
            hold: None,
        })
        .unwrap();
    assert_eq!(w.trace.available_quantity(w.product, w.hospital, None).unwrap(), 5);
}
