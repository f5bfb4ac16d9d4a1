//! Tests for the fixtures and mocks other crates lean on.

#![allow(clippy::unwrap_used)]

use chrono::Duration;
use railbook_core::{BookingLedger, Clock, ErrorKind, Requester, UserId};
use railbook_testing::{
    FailingLedger, TrainDraftBuilder, booking_request, test_clock, test_system_with_ledger,
};
use std::sync::Arc;

#[test]
fn failing_ledger_can_be_switched_back_on() {
    let ledger = Arc::new(FailingLedger::new());
    let system = test_system_with_ledger(ledger.clone());
    let train = system
        .admin()
        .create_train(&TrainDraftBuilder::new("22691").seats(4).build())
        .unwrap();

    ledger.fail_appends(true);
    let err = system
        .engine()
        .create_booking(&booking_request(train.train_id, 1, 2))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(system.train(train.train_id).unwrap().available_seats, 4);

    ledger.fail_appends(false);
    let booking = system
        .engine()
        .create_booking(&booking_request(train.train_id, 1, 2))
        .unwrap();
    assert_eq!(ledger.confirmed_seats(train.train_id), 2);

    ledger.fail_cancels(true);
    assert!(system
        .engine()
        .cancel_booking(booking.booking_id, &Requester::user(UserId::new(1)))
        .is_err());
    assert_eq!(system.train(train.train_id).unwrap().available_seats, 2);
}

#[test]
fn draft_builder_produces_valid_drafts() {
    let draft = TrainDraftBuilder::new("16526")
        .route("Bangalore", "Kanyakumari")
        .fare_rupees(640)
        .departs_in(Duration::hours(30))
        .build();

    draft.validate().unwrap();
    assert_eq!(draft.departure_time, test_clock().advanced(Duration::hours(30)).now());
    assert_eq!(draft.arrival_time - draft.departure_time, Duration::hours(8));
    assert_eq!(draft.base_fare.minor(), 64_000);
}
