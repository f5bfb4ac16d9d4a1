//! # Railbook Testing
//!
//! Testing utilities and fixtures for the Railbook reservation core.
//!
//! This crate provides:
//! - Mock implementations of environment traits (`FixedClock`, scripted PNRs)
//! - A ledger that fails on demand, for rollback tests
//! - Train and railway fixtures
//! - Proptest strategies for booking workloads
//!
//! ## Example
//!
//! ```
//! use railbook_testing::{system_with_train, booking_request};
//!
//! let (system, train_id) = system_with_train(2, 500);
//! let booking = system
//!     .engine()
//!     .create_booking(&booking_request(train_id, 1, 2))
//!     .unwrap();
//! assert_eq!(booking.total_amount.minor(), 100_000);
//! ```

use chrono::{DateTime, Utc};
use railbook_core::environment::Clock;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use chrono::Duration;
    use railbook_core::error::LedgerError;
    use railbook_core::ledger::{BookingLedger, InMemoryLedger, NewBooking};
    use railbook_core::pnr::PnrGenerator;
    use railbook_core::types::{Booking, BookingId, Pnr, TrainId, UserId};
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::{Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use railbook_testing::mocks::FixedClock;
    /// use railbook_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }

        /// The same clock moved by `offset`
        #[must_use]
        pub fn advanced(&self, offset: Duration) -> Self {
            Self::new(self.time + offset)
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Hands out PNRs from a script, repeating the last one forever.
    ///
    /// Repeating lets tests force collisions deterministically.
    #[derive(Debug)]
    pub struct ScriptedPnrGenerator {
        script: Mutex<Vec<Pnr>>,
        fallback: Pnr,
    }

    impl ScriptedPnrGenerator {
        /// Builds a generator from PNR strings; malformed entries are skipped.
        #[must_use]
        pub fn new(script: &[&str]) -> Self {
            let mut parsed: Vec<Pnr> = script.iter().filter_map(|s| Pnr::parse(s).ok()).collect();
            let fallback = parsed
                .last()
                .cloned()
                .unwrap_or_else(|| Pnr::from_bytes([0; 5]));
            parsed.reverse();
            Self {
                script: Mutex::new(parsed),
                fallback,
            }
        }
    }

    impl PnrGenerator for ScriptedPnrGenerator {
        fn generate(&self) -> Pnr {
            self.script
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop()
                .unwrap_or_else(|| self.fallback.clone())
        }
    }

    /// Issues `0000000001`, `0000000002`, ... Never collides.
    #[derive(Debug, Default)]
    pub struct SequentialPnrGenerator {
        next: AtomicU64,
    }

    impl PnrGenerator for SequentialPnrGenerator {
        fn generate(&self) -> Pnr {
            let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
            let bytes = n.to_be_bytes();
            Pnr::from_bytes([bytes[3], bytes[4], bytes[5], bytes[6], bytes[7]])
        }
    }

    /// In-memory ledger whose writes can be switched to fail.
    #[derive(Debug, Default)]
    pub struct FailingLedger {
        inner: InMemoryLedger,
        fail_appends: AtomicBool,
        fail_cancels: AtomicBool,
    }

    impl FailingLedger {
        /// A ledger that works until told otherwise
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes every later `append` fail (or succeed again)
        pub fn fail_appends(&self, fail: bool) {
            self.fail_appends.store(fail, Ordering::SeqCst);
        }

        /// Makes every later `cancel` fail (or succeed again)
        pub fn fail_cancels(&self, fail: bool) {
            self.fail_cancels.store(fail, Ordering::SeqCst);
        }
    }

    impl BookingLedger for FailingLedger {
        fn append(&self, booking: NewBooking) -> Result<Booking, LedgerError> {
            if self.fail_appends.load(Ordering::SeqCst) {
                return Err(LedgerError::Unavailable("injected append failure".to_string()));
            }
            self.inner.append(booking)
        }

        fn cancel(&self, booking_id: BookingId, at: DateTime<Utc>) -> Result<Booking, LedgerError> {
            if self.fail_cancels.load(Ordering::SeqCst) {
                return Err(LedgerError::Unavailable("injected cancel failure".to_string()));
            }
            self.inner.cancel(booking_id, at)
        }

        fn get(&self, booking_id: BookingId) -> Option<Booking> {
            self.inner.get(booking_id)
        }

        fn find_by_pnr(&self, pnr: &Pnr) -> Option<Booking> {
            self.inner.find_by_pnr(pnr)
        }

        fn contains_pnr(&self, pnr: &Pnr) -> bool {
            self.inner.contains_pnr(pnr)
        }

        fn list_for_user(&self, user_id: UserId) -> Vec<Booking> {
            self.inner.list_for_user(user_id)
        }

        fn list_all(&self) -> Vec<Booking> {
            self.inner.list_all()
        }

        fn confirmed_seats(&self, train_id: TrainId) -> u32 {
            self.inner.confirmed_seats(train_id)
        }

        fn active_count(&self, train_id: TrainId) -> usize {
            self.inner.active_count(train_id)
        }

        fn restore(&self, rows: Vec<Booking>) -> Result<(), LedgerError> {
            self.inner.restore(rows)
        }
    }
}

/// Fixtures for trains, railways and systems.
pub mod helpers {
    use super::mocks::{SequentialPnrGenerator, test_clock};
    use chrono::Duration;
    use railbook_core::environment::{Clock, ReservationEnvironment, ReservationPolicy};
    use railbook_core::ledger::BookingLedger;
    use railbook_core::system::ReservationSystem;
    use railbook_core::types::{
        BookingRequest, Money, PaymentMethod, Railway, RailwayId, TrainDraft, TrainId, TrainType,
        UserId,
    };
    use std::sync::Arc;

    /// Railway id every fixture train runs on
    pub const TEST_RAILWAY: RailwayId = RailwayId::new(1);

    /// The railway fixture trains belong to
    #[must_use]
    pub fn test_railway() -> Railway {
        Railway {
            railway_id: TEST_RAILWAY,
            railway_name: "Indian Railways".to_string(),
            railway_code: "IR".to_string(),
        }
    }

    /// Deterministic environment: fixed clock, sequential PNRs, default policy
    #[must_use]
    pub fn test_environment() -> ReservationEnvironment {
        ReservationEnvironment::new(
            Arc::new(test_clock()),
            Arc::new(SequentialPnrGenerator::default()),
            ReservationPolicy::default(),
        )
    }

    /// Builder for [`TrainDraft`] with sensible defaults.
    ///
    /// Departs one day after the test clock and runs for eight hours.
    #[derive(Debug, Clone)]
    pub struct TrainDraftBuilder {
        draft: TrainDraft,
    }

    impl TrainDraftBuilder {
        /// A 100-seat express from New Delhi to Mumbai Central at ₹500
        #[must_use]
        pub fn new(train_number: &str) -> Self {
            let departure = test_clock().now() + Duration::days(1);
            Self {
                draft: TrainDraft {
                    train_number: train_number.to_string(),
                    train_name: format!("Express {train_number}"),
                    railway_id: TEST_RAILWAY,
                    source_station: "New Delhi".to_string(),
                    destination_station: "Mumbai Central".to_string(),
                    departure_time: departure,
                    arrival_time: departure + Duration::hours(8),
                    total_seats: 100,
                    base_fare: Money::from_minor(50_000),
                    train_type: TrainType::Express,
                    train_status: None,
                },
            }
        }

        /// Seat capacity
        #[must_use]
        pub const fn seats(mut self, total_seats: u32) -> Self {
            self.draft.total_seats = total_seats;
            self
        }

        /// Fare per passenger in whole rupees
        #[must_use]
        pub const fn fare_rupees(mut self, rupees: u64) -> Self {
            self.draft.base_fare = Money::from_minor(rupees * 100);
            self
        }

        /// Origin and terminal stations
        #[must_use]
        pub fn route(mut self, from: &str, to: &str) -> Self {
            self.draft.source_station = from.to_string();
            self.draft.destination_station = to.to_string();
            self
        }

        /// Departure offset from the test clock
        #[must_use]
        pub fn departs_in(mut self, offset: Duration) -> Self {
            let journey = self.draft.arrival_time - self.draft.departure_time;
            self.draft.departure_time = test_clock().now() + offset;
            self.draft.arrival_time = self.draft.departure_time + journey;
            self
        }

        /// Finished draft
        #[must_use]
        pub fn build(self) -> TrainDraft {
            self.draft
        }
    }

    /// An empty deterministic system with [`test_railway`] registered.
    ///
    /// # Panics
    ///
    /// Panics if the fixture railway is rejected, which would be a bug in
    /// the catalog.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_system_with_ledger(ledger: Arc<dyn BookingLedger>) -> ReservationSystem {
        let system = ReservationSystem::new(test_environment(), ledger);
        system
            .add_railway(test_railway())
            .expect("fixture railway should register");
        system
    }

    /// An empty deterministic in-memory system with [`test_railway`] registered
    #[must_use]
    pub fn test_system() -> ReservationSystem {
        test_system_with_ledger(Arc::new(railbook_core::ledger::InMemoryLedger::new()))
    }

    /// A deterministic system holding one train with `seats` seats at
    /// `fare_rupees` per passenger.
    ///
    /// # Panics
    ///
    /// Panics if the fixture train is rejected.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn system_with_train(seats: u32, fare_rupees: u64) -> (ReservationSystem, TrainId) {
        let system = test_system();
        let train = system
            .admin()
            .create_train(
                &TrainDraftBuilder::new("12301")
                    .seats(seats)
                    .fare_rupees(fare_rupees)
                    .build(),
            )
            .expect("fixture train should be created");
        (system, train.train_id)
    }

    /// A paid booking request
    #[must_use]
    pub const fn booking_request(train_id: TrainId, user: u64, passengers: u32) -> BookingRequest {
        BookingRequest {
            user_id: UserId::new(user),
            train_id,
            passengers_count: passengers,
            payment_method: Some(PaymentMethod::Upi),
        }
    }

    /// Installs a test-writer tracing subscriber once per process.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "railbook=debug".into()),
            )
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;

    /// One step of a booking workload.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum BookingOp {
        /// Book `passengers` seats for `user`
        Book {
            /// Booking owner
            user: u64,
            /// Party size
            passengers: u32,
        },
        /// Cancel the n-th booking made so far (modulo the count)
        Cancel {
            /// Index into the bookings made so far
            nth: usize,
        },
        /// Set capacity
        Resize {
            /// New capacity
            total: u32,
        },
    }

    /// Party sizes within the default policy, with out-of-range values
    /// mixed in
    pub fn passengers() -> impl Strategy<Value = u32> {
        prop_oneof![8 => 1u32..=6, 1 => Just(0u32), 1 => 7u32..=10]
    }

    /// A single workload step
    pub fn booking_op() -> impl Strategy<Value = BookingOp> {
        prop_oneof![
            6 => (1u64..=4, passengers())
                .prop_map(|(user, passengers)| BookingOp::Book { user, passengers }),
            3 => any::<usize>().prop_map(|nth| BookingOp::Cancel { nth }),
            1 => (0u32..=40).prop_map(|total| BookingOp::Resize { total }),
        ]
    }

    /// A workload of up to `max_len` steps
    pub fn booking_workload(max_len: usize) -> impl Strategy<Value = Vec<BookingOp>> {
        prop::collection::vec(booking_op(), 1..=max_len)
    }
}

// Re-export commonly used items
pub use helpers::{
    TrainDraftBuilder, booking_request, init_tracing, system_with_train, test_environment,
    test_railway, test_system, test_system_with_ledger,
};
pub use mocks::{
    FailingLedger, FixedClock, ScriptedPnrGenerator, SequentialPnrGenerator, test_clock,
};
