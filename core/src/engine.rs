//! Booking engine: create and cancel bookings.
//!
//! Each mutation pairs a seat change with a ledger write inside the train's
//! critical section (see [`SeatInventory::transact`]). A failed ledger write
//! rolls the seat change back before the lock is released, so no observer
//! ever sees a decremented counter without its booking row or the reverse.

use crate::catalog::TrainCatalog;
use crate::environment::ReservationEnvironment;
use crate::error::{LedgerError, ReservationError, Result};
use crate::inventory::SeatInventory;
use crate::ledger::{BookingLedger, NewBooking};
use crate::pnr::transaction_id;
use crate::types::{
    Booking, BookingId, BookingRequest, PaymentStatus, Pnr, Requester, TrainId, UserId,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A train whose counter disagrees with its confirmed bookings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatDiscrepancy {
    /// Train
    pub train_id: TrainId,
    /// Capacity
    pub total_seats: u32,
    /// Counter value
    pub available_seats: u32,
    /// Seats held by confirmed bookings
    pub confirmed_seats: u32,
}

impl SeatDiscrepancy {
    /// What the counter should read
    #[must_use]
    pub const fn expected_available(&self) -> u32 {
        self.total_seats.saturating_sub(self.confirmed_seats)
    }
}

/// Orchestrates bookings against the seat inventory and the ledger.
pub struct BookingEngine {
    catalog: Arc<TrainCatalog>,
    inventory: Arc<SeatInventory>,
    ledger: Arc<dyn BookingLedger>,
    env: ReservationEnvironment,
}

impl BookingEngine {
    /// Creates a new `BookingEngine`
    #[must_use]
    pub fn new(
        catalog: Arc<TrainCatalog>,
        inventory: Arc<SeatInventory>,
        ledger: Arc<dyn BookingLedger>,
        env: ReservationEnvironment,
    ) -> Self {
        Self {
            catalog,
            inventory,
            ledger,
            env,
        }
    }

    /// Reserves seats and records a confirmed booking.
    ///
    /// Fails fast when seats run out; there is no waitlist and the engine
    /// never retries on the caller's behalf. Rejected attempts leave no
    /// ledger row.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::Validation`] for a bad passenger count or a
    ///   train that is not accepting bookings
    /// - [`ReservationError::TrainNotFound`] for an unknown train
    /// - [`ReservationError::InsufficientSeats`] when fewer seats remain
    /// - [`ReservationError::Conflict`] if no unique PNR could be issued
    /// - [`ReservationError::Ledger`] if the ledger refused the write
    pub fn create_booking(&self, request: &BookingRequest) -> Result<Booking> {
        let outcome = self.try_create(request);
        match &outcome {
            Ok(booking) => info!(
                booking_id = %booking.booking_id,
                pnr = %booking.pnr_number,
                train_id = %booking.train_id,
                user_id = %booking.user_id,
                passengers = booking.passengers_count,
                amount = %booking.total_amount,
                "Booking confirmed"
            ),
            Err(error) => warn!(
                train_id = %request.train_id,
                user_id = %request.user_id,
                passengers = request.passengers_count,
                reason = error.reason(),
                error = %error,
                "Booking rejected"
            ),
        }
        outcome
    }

    fn try_create(&self, request: &BookingRequest) -> Result<Booking> {
        let max = self.env.policy.max_passengers_per_booking;
        if request.passengers_count == 0 || request.passengers_count > max {
            return Err(ReservationError::validation(format!(
                "passengers_count must be between 1 and {max}"
            )));
        }

        let train = self
            .catalog
            .get(request.train_id)
            .ok_or(ReservationError::TrainNotFound(request.train_id))?;
        if !train.train_status.is_bookable() {
            return Err(ReservationError::validation(format!(
                "train {} is {} and not accepting bookings",
                train.train_number, train.train_status
            )));
        }
        let total_amount = train
            .base_fare
            .checked_multiply(request.passengers_count)
            .ok_or_else(|| ReservationError::validation("total amount is out of range"))?;

        let (payment_status, settlement) = match request.payment_method {
            Some(_) => (PaymentStatus::Paid, Some(transaction_id())),
            None => (PaymentStatus::Pending, None),
        };
        let booking_date = self.env.clock.now();

        self.inventory.transact(request.train_id, |seats| {
            let token = seats.reserve(request.passengers_count)?;
            self.append_with_unique_pnr(|pnr_number| NewBooking {
                pnr_number,
                user_id: request.user_id,
                train_id: token.train_id(),
                passengers_count: token.seats(),
                total_amount,
                payment_status,
                payment_method: request.payment_method,
                transaction_id: settlement.clone(),
                booking_date,
            })
        })
    }

    fn append_with_unique_pnr<F>(&self, build: F) -> Result<Booking>
    where
        F: Fn(Pnr) -> NewBooking,
    {
        let attempts = self.env.policy.pnr_max_attempts.max(1);
        for attempt in 1..=attempts {
            let pnr = self.env.pnr.generate();
            if self.ledger.contains_pnr(&pnr) {
                debug!(%pnr, attempt, "PNR already issued, drawing again");
                continue;
            }
            match self.ledger.append(build(pnr)) {
                Ok(booking) => return Ok(booking),
                Err(LedgerError::DuplicatePnr(pnr)) => {
                    debug!(%pnr, attempt, "PNR collided on append, drawing again");
                }
                Err(other) => return Err(other.into()),
            }
        }
        Err(ReservationError::Conflict(format!(
            "could not issue a unique PNR after {attempts} attempts"
        )))
    }

    /// Cancels a confirmed booking and returns its seats.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::BookingNotFound`] for an unknown booking
    /// - [`ReservationError::Forbidden`] if the requester neither owns the
    ///   booking nor is an administrator
    /// - [`ReservationError::AlreadyCancelled`] if it was cancelled before,
    ///   including by a concurrent request that won the race
    pub fn cancel_booking(&self, booking_id: BookingId, requester: &Requester) -> Result<Booking> {
        let outcome = self.try_cancel(booking_id, requester);
        match &outcome {
            Ok(booking) => info!(
                booking_id = %booking.booking_id,
                pnr = %booking.pnr_number,
                train_id = %booking.train_id,
                seats = booking.passengers_count,
                "Booking cancelled"
            ),
            Err(error) => warn!(
                booking_id = %booking_id,
                user_id = %requester.user_id,
                reason = error.reason(),
                error = %error,
                "Cancellation rejected"
            ),
        }
        outcome
    }

    fn try_cancel(&self, booking_id: BookingId, requester: &Requester) -> Result<Booking> {
        let existing = self
            .ledger
            .get(booking_id)
            .ok_or(ReservationError::BookingNotFound(booking_id))?;
        if !requester.can_access(&existing) {
            return Err(ReservationError::Forbidden(booking_id));
        }
        if !existing.is_confirmed() {
            return Err(ReservationError::AlreadyCancelled(booking_id));
        }

        let cancelled_at = self.env.clock.now();
        let outcome = self.inventory.transact(existing.train_id, |seats| {
            let cancelled = self
                .ledger
                .cancel(booking_id, cancelled_at)
                .map_err(|error| match error {
                    LedgerError::NotConfirmed(id) => ReservationError::AlreadyCancelled(id),
                    LedgerError::UnknownBooking(id) => ReservationError::BookingNotFound(id),
                    other => other.into(),
                })?;
            seats.release(cancelled.passengers_count);
            Ok(cancelled)
        });

        match outcome {
            // The train can only disappear once its last booking is gone, so
            // a concurrent cancellation got here first.
            Err(ReservationError::TrainNotFound(_)) => {
                Err(ReservationError::AlreadyCancelled(booking_id))
            }
            other => other,
        }
    }

    /// Fetches a booking the requester may see.
    ///
    /// # Errors
    ///
    /// [`ReservationError::BookingNotFound`] or [`ReservationError::Forbidden`].
    pub fn booking(&self, booking_id: BookingId, requester: &Requester) -> Result<Booking> {
        let booking = self
            .ledger
            .get(booking_id)
            .ok_or(ReservationError::BookingNotFound(booking_id))?;
        Self::authorize(booking, requester)
    }

    /// Fetches a booking by PNR.
    ///
    /// # Errors
    ///
    /// [`ReservationError::Validation`] for a malformed PNR, otherwise as
    /// [`BookingEngine::booking`].
    pub fn booking_by_pnr(&self, pnr: &str, requester: &Requester) -> Result<Booking> {
        let pnr = Pnr::parse(pnr)?;
        debug!(%pnr, "Looking up booking by PNR");
        let booking = self
            .ledger
            .find_by_pnr(&pnr)
            .ok_or(ReservationError::PnrNotFound(pnr))?;
        Self::authorize(booking, requester)
    }

    fn authorize(booking: Booking, requester: &Requester) -> Result<Booking> {
        if requester.can_access(&booking) {
            Ok(booking)
        } else {
            Err(ReservationError::Forbidden(booking.booking_id))
        }
    }

    /// Bookings owned by a user, oldest first
    #[must_use]
    pub fn bookings_for(&self, user_id: UserId) -> Vec<Booking> {
        self.ledger.list_for_user(user_id)
    }

    /// Every booking, oldest first
    #[must_use]
    pub fn all_bookings(&self) -> Vec<Booking> {
        self.ledger.list_all()
    }

    /// Compares every train's counter with the seats its confirmed bookings
    /// hold. An empty result means the inventory is consistent.
    ///
    /// Each train is checked inside its own critical section, so the
    /// comparison never straddles an in-flight booking.
    #[must_use]
    pub fn audit(&self) -> Vec<SeatDiscrepancy> {
        let mut discrepancies = Vec::new();
        for train_id in self.inventory.train_ids() {
            let checked = self.inventory.transact(train_id, |seats| {
                Ok((seats.snapshot(), self.ledger.confirmed_seats(train_id)))
            });
            // Retired between listing and locking.
            let Ok((snapshot, confirmed_seats)) = checked else {
                continue;
            };
            if snapshot.booked() != confirmed_seats {
                warn!(
                    train_id = %train_id,
                    available = snapshot.available,
                    confirmed = confirmed_seats,
                    "Seat counter disagrees with ledger"
                );
                discrepancies.push(SeatDiscrepancy {
                    train_id,
                    total_seats: snapshot.total,
                    available_seats: snapshot.available,
                    confirmed_seats,
                });
            }
        }
        discrepancies
    }
}

impl std::fmt::Debug for BookingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingEngine")
            .field("env", &self.env)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::environment::{Clock, ReservationPolicy};
    use crate::ledger::InMemoryLedger;
    use crate::pnr::PnrGenerator;
    use crate::types::{
        BookingStatus, Money, PaymentMethod, Railway, RailwayId, TrainDraft, TrainStatus,
        TrainType,
    };
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::sync::Mutex;

    struct StillClock(DateTime<Utc>);

    impl Clock for StillClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    struct Scripted(Mutex<Vec<&'static str>>);

    impl PnrGenerator for Scripted {
        fn generate(&self) -> Pnr {
            let mut script = self.0.lock().unwrap();
            let next = if script.len() > 1 {
                script.remove(0)
            } else {
                script[0]
            };
            Pnr::parse(next).unwrap()
        }
    }

    struct Fixture {
        engine: BookingEngine,
        catalog: Arc<TrainCatalog>,
        inventory: Arc<SeatInventory>,
        train_id: TrainId,
    }

    fn fixture(total_seats: u32, pnrs: Vec<&'static str>) -> Fixture {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap();
        let catalog = Arc::new(TrainCatalog::new());
        catalog
            .add_railway(Railway {
                railway_id: RailwayId::new(1),
                railway_name: "Indian Railways".to_string(),
                railway_code: "IR".to_string(),
            })
            .unwrap();
        let draft = TrainDraft {
            train_number: "12951".to_string(),
            train_name: "Rajdhani Express".to_string(),
            railway_id: RailwayId::new(1),
            source_station: "New Delhi".to_string(),
            destination_station: "Mumbai Central".to_string(),
            departure_time: now + Duration::days(1),
            arrival_time: now + Duration::days(1) + Duration::hours(16),
            total_seats,
            base_fare: Money::from_minor(50_000),
            train_type: TrainType::Express,
            train_status: None,
        };
        let record = catalog.insert(&draft, now).unwrap();
        let inventory = Arc::new(SeatInventory::new());
        inventory.register(record.train_id, total_seats, true).unwrap();

        let env = ReservationEnvironment::new(
            Arc::new(StillClock(now)),
            Arc::new(Scripted(Mutex::new(pnrs))),
            ReservationPolicy::default(),
        );
        let engine = BookingEngine::new(
            Arc::clone(&catalog),
            Arc::clone(&inventory),
            Arc::new(InMemoryLedger::new()),
            env,
        );
        Fixture {
            engine,
            catalog,
            inventory,
            train_id: record.train_id,
        }
    }

    fn request(train_id: TrainId, user: u64, passengers: u32) -> BookingRequest {
        BookingRequest {
            user_id: UserId::new(user),
            train_id,
            passengers_count: passengers,
            payment_method: Some(PaymentMethod::CreditCard),
        }
    }

    #[test]
    fn test_create_booking_freezes_amount_and_pays() {
        let fx = fixture(10, vec!["AAAAAAAAAA", "BBBBBBBBBB"]);
        let booking = fx.engine.create_booking(&request(fx.train_id, 7, 2)).unwrap();

        assert_eq!(booking.total_amount, Money::from_minor(100_000));
        assert_eq!(booking.booking_status, BookingStatus::Confirmed);
        assert_eq!(booking.payment_status, PaymentStatus::Paid);
        assert!(booking.transaction_id.unwrap().starts_with("TXN"));
        assert_eq!(booking.pnr_number.as_str(), "AAAAAAAAAA");
        assert_eq!(fx.inventory.snapshot(fx.train_id).unwrap().available, 8);
    }

    #[test]
    fn test_pending_payment_without_method() {
        let fx = fixture(10, vec!["AAAAAAAAAA"]);
        let mut unpaid = request(fx.train_id, 7, 1);
        unpaid.payment_method = None;
        let booking = fx.engine.create_booking(&unpaid).unwrap();
        assert_eq!(booking.payment_status, PaymentStatus::Pending);
        assert!(booking.transaction_id.is_none());
    }

    #[test]
    fn test_passenger_bounds() {
        let fx = fixture(10, vec!["AAAAAAAAAA"]);
        for passengers in [0, 7] {
            let err = fx
                .engine
                .create_booking(&request(fx.train_id, 7, passengers))
                .unwrap_err();
            assert!(matches!(err, ReservationError::Validation(_)));
        }
        assert_eq!(fx.inventory.snapshot(fx.train_id).unwrap().available, 10);
    }

    #[test]
    fn test_unknown_train() {
        let fx = fixture(10, vec!["AAAAAAAAAA"]);
        let err = fx
            .engine
            .create_booking(&request(TrainId::new(99), 7, 1))
            .unwrap_err();
        assert_eq!(err, ReservationError::TrainNotFound(TrainId::new(99)));
    }

    #[test]
    fn test_cancelled_train_not_bookable() {
        let fx = fixture(10, vec!["AAAAAAAAAA"]);
        fx.catalog
            .set_status(fx.train_id, TrainStatus::Cancelled)
            .unwrap();
        let err = fx.engine.create_booking(&request(fx.train_id, 7, 1)).unwrap_err();
        assert!(matches!(err, ReservationError::Validation(_)));
    }

    #[test]
    fn test_pnr_collision_is_retried() {
        let fx = fixture(10, vec!["AAAAAAAAAA", "AAAAAAAAAA", "CCCCCCCCCC"]);
        let first = fx.engine.create_booking(&request(fx.train_id, 7, 1)).unwrap();
        let second = fx.engine.create_booking(&request(fx.train_id, 7, 1)).unwrap();
        assert_eq!(first.pnr_number.as_str(), "AAAAAAAAAA");
        assert_eq!(second.pnr_number.as_str(), "CCCCCCCCCC");
    }

    #[test]
    fn test_exhausted_pnr_attempts_roll_back_seats() {
        let fx = fixture(10, vec!["AAAAAAAAAA"]);
        fx.engine.create_booking(&request(fx.train_id, 7, 1)).unwrap();

        let err = fx.engine.create_booking(&request(fx.train_id, 7, 3)).unwrap_err();
        assert!(matches!(err, ReservationError::Conflict(_)));
        assert_eq!(fx.inventory.snapshot(fx.train_id).unwrap().available, 9);
        assert_eq!(fx.engine.all_bookings().len(), 1);
    }

    #[test]
    fn test_cancel_rules() {
        let fx = fixture(10, vec!["AAAAAAAAAA", "BBBBBBBBBB"]);
        let booking = fx.engine.create_booking(&request(fx.train_id, 7, 3)).unwrap();

        let stranger = Requester::user(UserId::new(8));
        assert_eq!(
            fx.engine.cancel_booking(booking.booking_id, &stranger).unwrap_err(),
            ReservationError::Forbidden(booking.booking_id)
        );

        let owner = Requester::user(UserId::new(7));
        let cancelled = fx.engine.cancel_booking(booking.booking_id, &owner).unwrap();
        assert_eq!(cancelled.booking_status, BookingStatus::Cancelled);
        assert_eq!(cancelled.payment_status, PaymentStatus::Refunded);
        assert_eq!(fx.inventory.snapshot(fx.train_id).unwrap().available, 10);

        assert_eq!(
            fx.engine.cancel_booking(booking.booking_id, &owner).unwrap_err(),
            ReservationError::AlreadyCancelled(booking.booking_id)
        );
        assert_eq!(fx.inventory.snapshot(fx.train_id).unwrap().available, 10);

        assert_eq!(
            fx.engine
                .cancel_booking(BookingId::new(42), &owner)
                .unwrap_err(),
            ReservationError::BookingNotFound(BookingId::new(42))
        );
    }

    #[test]
    fn test_admin_may_cancel_any_booking() {
        let fx = fixture(10, vec!["AAAAAAAAAA"]);
        let booking = fx.engine.create_booking(&request(fx.train_id, 7, 2)).unwrap();
        let admin = Requester::admin(UserId::new(1));
        assert!(fx.engine.cancel_booking(booking.booking_id, &admin).is_ok());
    }

    #[test]
    fn test_lookup_by_pnr_checks_ownership() {
        let fx = fixture(10, vec!["AAAAAAAAAA"]);
        let booking = fx.engine.create_booking(&request(fx.train_id, 7, 1)).unwrap();

        let owner = Requester::user(UserId::new(7));
        assert_eq!(
            fx.engine.booking_by_pnr("aaaaaaaaaa", &owner).unwrap(),
            booking
        );
        assert!(matches!(
            fx.engine.booking_by_pnr("AAAAAAAAAA", &Requester::user(UserId::new(8))),
            Err(ReservationError::Forbidden(_))
        ));
        assert!(matches!(
            fx.engine.booking_by_pnr("0000000000", &owner),
            Err(ReservationError::PnrNotFound(_))
        ));
        assert!(matches!(
            fx.engine.booking_by_pnr("nope", &owner),
            Err(ReservationError::Validation(_))
        ));
    }

    #[test]
    fn test_audit_clean_after_traffic() {
        let fx = fixture(10, vec!["AAAAAAAAAA", "BBBBBBBBBB", "CCCCCCCCCC"]);
        let owner = Requester::user(UserId::new(7));
        let a = fx.engine.create_booking(&request(fx.train_id, 7, 2)).unwrap();
        fx.engine.create_booking(&request(fx.train_id, 7, 3)).unwrap();
        fx.engine.cancel_booking(a.booking_id, &owner).unwrap();

        assert!(fx.engine.audit().is_empty());
        assert_eq!(fx.engine.bookings_for(UserId::new(7)).len(), 2);
    }

    #[test]
    fn test_audit_reports_drift() {
        let fx = fixture(10, vec!["AAAAAAAAAA"]);
        fx.engine.create_booking(&request(fx.train_id, 7, 2)).unwrap();
        // Seats released behind the ledger's back.
        fx.inventory.release(fx.train_id, 1).unwrap();

        let report = fx.engine.audit();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].available_seats, 9);
        assert_eq!(report[0].expected_available(), 8);
    }
}
