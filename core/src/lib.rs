//! # Railbook Core
//!
//! Seat-reservation core for the Railbook train ticketing platform.
//!
//! Travelers search trains and book seats; administrators manage train
//! schedules and capacity. This crate holds everything that must stay
//! correct under concurrent traffic: per-train seat inventory, the booking
//! ledger, PNR issuance, and the orchestration that pairs them.
//!
//! ## Components
//!
//! - [`TrainCatalog`]: route, schedule, fare and status per train
//! - [`SeatInventory`]: available-seat counters with per-train critical sections
//! - [`BookingLedger`]: booking rows, with [`InMemoryLedger`] as the default store
//! - [`BookingEngine`]: create and cancel bookings
//! - [`AdminCapacityManager`]: add, edit and remove trains
//! - [`ReservationSystem`]: all of the above wired together, plus snapshots
//!
//! ## Invariant
//!
//! For every train, after every operation:
//!
//! ```text
//! available_seats = total_seats − Σ passengers_count (Confirmed bookings)
//! ```
//!
//! ## Example
//!
//! ```
//! use railbook_core::{BookingRequest, PaymentMethod, ReservationSystem, TrainQuery, UserId};
//!
//! let system = ReservationSystem::default();
//! system.seed_demo_data().unwrap();
//!
//! let train = system.search_trains(&TrainQuery::default()).remove(0);
//! let booking = system
//!     .engine()
//!     .create_booking(&BookingRequest {
//!         user_id: UserId::new(7),
//!         train_id: train.train_id,
//!         passengers_count: 2,
//!         payment_method: Some(PaymentMethod::Upi),
//!     })
//!     .unwrap();
//!
//! assert_eq!(system.train(train.train_id).unwrap().available_seats, train.available_seats - 2);
//! assert_eq!(booking.pnr_number.as_str().len(), 10);
//! ```

#![forbid(unsafe_code)]

pub mod admin;
pub mod catalog;
pub mod engine;
pub mod environment;
pub mod error;
pub mod inventory;
pub mod ledger;
pub mod pnr;
pub mod search;
pub mod snapshot;
pub mod system;
pub mod types;

mod sync;

pub use admin::AdminCapacityManager;
pub use catalog::{Stations, TrainCatalog, TrainRecord};
pub use engine::{BookingEngine, SeatDiscrepancy};
pub use environment::{Clock, ReservationEnvironment, ReservationPolicy, SystemClock};
pub use error::{ErrorKind, LedgerError, ReservationError, Result};
pub use inventory::{MAX_SEATS, ReservationToken, SeatInventory, SeatSnapshot, SeatTxn};
pub use ledger::{BookingLedger, InMemoryLedger, NewBooking};
pub use pnr::{PnrGenerator, RandomPnrGenerator};
pub use search::TrainQuery;
pub use snapshot::{Snapshot, SnapshotError};
pub use system::ReservationSystem;
pub use types::{
    Booking, BookingId, BookingRequest, BookingStatus, Money, PaymentMethod, PaymentStatus, Pnr,
    Railway, RailwayId, Requester, Role, Train, TrainDraft, TrainId, TrainStatus, TrainType, UserId,
};
