//! Administrative train management.
//!
//! Capacity and status edits run inside the train's seat critical section,
//! so they serialize with in-flight bookings: a shrink is checked against
//! the seats booked at that instant, and a train marked Cancelled stops
//! taking reservations before the lock is released.

use crate::catalog::TrainCatalog;
use crate::environment::Clock;
use crate::error::{ReservationError, Result};
use crate::inventory::SeatInventory;
use crate::ledger::BookingLedger;
use crate::types::{Train, TrainDraft, TrainId, TrainStatus};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Adds, edits and removes trains while keeping seat counts consistent.
pub struct AdminCapacityManager {
    catalog: Arc<TrainCatalog>,
    inventory: Arc<SeatInventory>,
    ledger: Arc<dyn BookingLedger>,
    clock: Arc<dyn Clock>,
}

impl AdminCapacityManager {
    /// Creates a new `AdminCapacityManager`
    #[must_use]
    pub fn new(
        catalog: Arc<TrainCatalog>,
        inventory: Arc<SeatInventory>,
        ledger: Arc<dyn BookingLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            inventory,
            ledger,
            clock,
        }
    }

    /// Adds a train with every seat available.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::Validation`] for a malformed draft, an
    /// unknown railway, a duplicate train number or an oversized capacity.
    pub fn create_train(&self, draft: &TrainDraft) -> Result<Train> {
        let record = self.catalog.insert(draft, self.clock.now())?;
        let seats = match self.inventory.register(
            record.train_id,
            draft.total_seats,
            record.train_status.is_bookable(),
        ) {
            Ok(seats) => seats,
            Err(error) => {
                // Leave no catalog row without seats behind.
                if let Err(cleanup) = self.catalog.remove(record.train_id) {
                    warn!(
                        train_id = %record.train_id,
                        error = %cleanup,
                        "Could not remove catalog row after failed seat registration"
                    );
                }
                return Err(error);
            }
        };
        info!(
            train_id = %record.train_id,
            train_number = %record.train_number,
            total_seats = seats.total,
            "Train created"
        );
        Ok(record.with_seats(seats))
    }

    /// Replaces a train's route, schedule, fare, type, capacity and
    /// (optionally) status.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::TrainNotFound`] for an unknown train
    /// - [`ReservationError::Validation`] as for [`Self::create_train`]
    /// - [`ReservationError::CapacityBelowBooked`] if the new capacity is
    ///   smaller than the seats already booked; nothing is changed
    pub fn update_train(&self, train_id: TrainId, draft: &TrainDraft) -> Result<Train> {
        let outcome = self.inventory.transact(train_id, |seats| {
            seats.adjust_capacity(draft.total_seats)?;
            // Status is read back from the catalog under the seat lock, so an
            // omitted status keeps whatever the last `set_status` committed.
            let record = self.catalog.update(train_id, draft)?;
            seats.set_bookable(record.train_status.is_bookable());
            Ok(record.with_seats(seats.snapshot()))
        });
        match &outcome {
            Ok(train) => info!(
                train_id = %train_id,
                total_seats = train.total_seats,
                available_seats = train.available_seats,
                status = %train.train_status,
                "Train updated"
            ),
            Err(error) => warn!(train_id = %train_id, error = %error, "Train update rejected"),
        }
        outcome
    }

    /// Changes a train's operational status. Cancelled and Completed close
    /// the train to new bookings; Scheduled and Delayed reopen it.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::TrainNotFound`] for an unknown train.
    pub fn set_status(&self, train_id: TrainId, status: TrainStatus) -> Result<Train> {
        let train = self.inventory.transact(train_id, |seats| {
            seats.set_bookable(status.is_bookable());
            let record = self.catalog.set_status(train_id, status)?;
            Ok(record.with_seats(seats.snapshot()))
        })?;
        info!(train_id = %train_id, status = %status, "Train status changed");
        Ok(train)
    }

    /// Removes a train that no confirmed booking references.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::TrainNotFound`] for an unknown train
    /// - [`ReservationError::HasActiveBookings`] while confirmed bookings
    ///   hold seats on it
    pub fn delete_train(&self, train_id: TrainId) -> Result<()> {
        self.inventory.transact(train_id, |seats| {
            let active = self.ledger.active_count(train_id);
            if active > 0 {
                return Err(ReservationError::HasActiveBookings { train_id, active });
            }
            self.catalog.remove(train_id)?;
            seats.retire();
            Ok(())
        })?;
        info!(train_id = %train_id, "Train deleted");
        Ok(())
    }

    /// One train with its current seat counts
    #[must_use]
    pub fn train(&self, train_id: TrainId) -> Option<Train> {
        let record = self.catalog.get(train_id)?;
        let seats = self.inventory.snapshot(train_id)?;
        Some(record.with_seats(seats))
    }

    /// Every train with its current seat counts, ordered by id
    #[must_use]
    pub fn list_trains(&self) -> Vec<Train> {
        let trains: Vec<Train> = self
            .catalog
            .list()
            .into_iter()
            .filter_map(|record| {
                let seats = self.inventory.snapshot(record.train_id)?;
                Some(record.with_seats(seats))
            })
            .collect();
        debug!(count = trains.len(), "Listed trains");
        trains
    }
}

impl std::fmt::Debug for AdminCapacityManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCapacityManager").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::environment::SystemClock;
    use crate::ledger::{InMemoryLedger, NewBooking};
    use crate::types::{
        Money, PaymentStatus, Pnr, Railway, RailwayId, TrainType, UserId,
    };
    use chrono::{Duration, Utc};
    use std::time::Duration as StdDuration;

    struct Fixture {
        admin: AdminCapacityManager,
        inventory: Arc<SeatInventory>,
        ledger: Arc<InMemoryLedger>,
    }

    fn fixture() -> Fixture {
        let catalog = Arc::new(TrainCatalog::new());
        catalog
            .add_railway(Railway {
                railway_id: RailwayId::new(1),
                railway_name: "Indian Railways".to_string(),
                railway_code: "IR".to_string(),
            })
            .unwrap();
        let inventory = Arc::new(SeatInventory::new());
        let ledger = Arc::new(InMemoryLedger::new());
        let admin = AdminCapacityManager::new(
            catalog,
            Arc::clone(&inventory),
            ledger.clone(),
            Arc::new(SystemClock),
        );
        Fixture {
            admin,
            inventory,
            ledger,
        }
    }

    fn draft(number: &str, total_seats: u32) -> TrainDraft {
        let departure = Utc::now() + Duration::days(2);
        TrainDraft {
            train_number: number.to_string(),
            train_name: "Shatabdi Express".to_string(),
            railway_id: RailwayId::new(1),
            source_station: "Bangalore".to_string(),
            destination_station: "Chennai".to_string(),
            departure_time: departure,
            arrival_time: departure + Duration::hours(5),
            total_seats,
            base_fare: Money::from_minor(80_000),
            train_type: TrainType::Superfast,
            train_status: None,
        }
    }

    fn book(fx: &Fixture, train_id: TrainId, seats: u32, pnr: &str) {
        fx.inventory
            .transact(train_id, |txn| {
                let _ = txn.reserve(seats)?;
                fx.ledger
                    .append(NewBooking {
                        pnr_number: Pnr::parse(pnr).unwrap(),
                        user_id: UserId::new(5),
                        train_id,
                        passengers_count: seats,
                        total_amount: Money::from_minor(80_000 * u64::from(seats)),
                        payment_status: PaymentStatus::Pending,
                        payment_method: None,
                        transaction_id: None,
                        booking_date: Utc::now(),
                    })
                    .map_err(ReservationError::from)
            })
            .unwrap();
    }

    #[test]
    fn test_create_train_starts_full() {
        let fx = fixture();
        let train = fx.admin.create_train(&draft("12007", 300)).unwrap();
        assert_eq!(train.total_seats, 300);
        assert_eq!(train.available_seats, 300);
        assert_eq!(fx.admin.list_trains(), vec![train.clone()]);
        assert_eq!(fx.admin.train(train.train_id), Some(train));
    }

    #[test]
    fn test_shrink_below_booked_rejected_and_unchanged() {
        let fx = fixture();
        let train = fx.admin.create_train(&draft("12007", 10)).unwrap();
        book(&fx, train.train_id, 5, "AAAAAAAAAA");

        let mut shrink = draft("12007", 3);
        shrink.base_fare = Money::from_minor(1);
        let err = fx.admin.update_train(train.train_id, &shrink).unwrap_err();
        assert_eq!(
            err,
            ReservationError::CapacityBelowBooked {
                train_id: train.train_id,
                requested_total: 3,
                booked: 5
            }
        );

        let after = fx.admin.train(train.train_id).unwrap();
        assert_eq!((after.total_seats, after.available_seats), (10, 5));
        assert_eq!(after.base_fare, Money::from_minor(80_000));
    }

    #[test]
    fn test_grow_keeps_booked_seats() {
        let fx = fixture();
        let train = fx.admin.create_train(&draft("12007", 10)).unwrap();
        book(&fx, train.train_id, 4, "AAAAAAAAAA");

        let updated = fx.admin.update_train(train.train_id, &draft("12007", 20)).unwrap();
        assert_eq!((updated.total_seats, updated.available_seats), (20, 16));
    }

    #[test]
    fn test_update_with_taken_number_changes_nothing() {
        let fx = fixture();
        let first = fx.admin.create_train(&draft("100", 10)).unwrap();
        fx.admin.create_train(&draft("200", 10)).unwrap();

        let err = fx.admin.update_train(first.train_id, &draft("200", 50)).unwrap_err();
        assert!(matches!(err, ReservationError::Validation(_)));
        assert_eq!(fx.admin.train(first.train_id).unwrap().total_seats, 10);
    }

    #[test]
    fn test_status_closes_and_reopens_bookings() {
        let fx = fixture();
        let train = fx.admin.create_train(&draft("12007", 10)).unwrap();

        let closed = fx.admin.set_status(train.train_id, TrainStatus::Cancelled).unwrap();
        assert_eq!(closed.train_status, TrainStatus::Cancelled);
        assert!(!fx.inventory.snapshot(train.train_id).unwrap().bookable);
        assert!(fx.inventory.reserve(train.train_id, 1).is_err());

        fx.admin.set_status(train.train_id, TrainStatus::Delayed).unwrap();
        assert!(fx.inventory.reserve(train.train_id, 1).is_ok());
    }

    #[test]
    fn test_status_less_update_keeps_concurrent_status_change() {
        for _ in 0..10 {
            let fx = fixture();
            let mut cancelled = draft("12007", 10);
            cancelled.train_status = Some(TrainStatus::Cancelled);
            let train_id = fx.admin.create_train(&cancelled).unwrap().train_id;

            let (admin, inventory) = (&fx.admin, &fx.inventory);
            std::thread::scope(|s| {
                let (held_tx, held_rx) = std::sync::mpsc::channel();
                s.spawn(move || {
                    inventory
                        .transact(train_id, |_| {
                            held_tx.send(()).unwrap();
                            std::thread::sleep(StdDuration::from_millis(50));
                            Ok(())
                        })
                        .unwrap();
                });
                held_rx.recv().unwrap();
                s.spawn(move || admin.set_status(train_id, TrainStatus::Scheduled).unwrap());
                std::thread::sleep(StdDuration::from_millis(10));
                s.spawn(move || admin.update_train(train_id, &draft("12007", 12)).unwrap());
            });

            let train = fx.admin.train(train_id).unwrap();
            assert_eq!(train.train_status, TrainStatus::Scheduled);
            assert_eq!(train.total_seats, 12);
            assert!(fx.inventory.snapshot(train_id).unwrap().bookable);
        }
    }

    #[test]
    fn test_created_cancelled_train_is_closed() {
        let fx = fixture();
        let mut closed = draft("12007", 10);
        closed.train_status = Some(TrainStatus::Completed);
        let train = fx.admin.create_train(&closed).unwrap();
        assert_eq!(train.train_status, TrainStatus::Completed);
        assert!(!fx.inventory.snapshot(train.train_id).unwrap().bookable);
    }

    #[test]
    fn test_delete_requires_no_active_bookings() {
        let fx = fixture();
        let train = fx.admin.create_train(&draft("12007", 10)).unwrap();
        book(&fx, train.train_id, 2, "AAAAAAAAAA");

        assert_eq!(
            fx.admin.delete_train(train.train_id).unwrap_err(),
            ReservationError::HasActiveBookings {
                train_id: train.train_id,
                active: 1
            }
        );

        let booking = fx.ledger.list_all().remove(0);
        fx.ledger.cancel(booking.booking_id, Utc::now()).unwrap();
        fx.inventory.release(train.train_id, 2).unwrap();

        fx.admin.delete_train(train.train_id).unwrap();
        assert!(fx.admin.train(train.train_id).is_none());
        assert!(fx.inventory.snapshot(train.train_id).is_none());
        assert_eq!(
            fx.admin.delete_train(train.train_id).unwrap_err(),
            ReservationError::TrainNotFound(train.train_id)
        );
    }

    #[test]
    fn test_oversized_capacity_leaves_no_catalog_row() {
        let fx = fixture();
        let err = fx
            .admin
            .create_train(&draft("12007", u32::MAX))
            .unwrap_err();
        assert!(matches!(err, ReservationError::Validation(_)));
        assert!(fx.admin.list_trains().is_empty());
        // The number is free again.
        assert!(fx.admin.create_train(&draft("12007", 10)).is_ok());
    }
}
