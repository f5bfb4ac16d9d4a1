//! The assembled reservation system.
//!
//! [`ReservationSystem`] wires one catalog, one seat inventory and one
//! ledger into a [`BookingEngine`] and an [`AdminCapacityManager`] that
//! share them, and owns snapshot export and restore.

use crate::admin::AdminCapacityManager;
use crate::catalog::{Stations, TrainCatalog};
use crate::engine::BookingEngine;
use crate::environment::ReservationEnvironment;
use crate::error::{ReservationError, Result};
use crate::inventory::{MAX_SEATS, SeatInventory};
use crate::ledger::{BookingLedger, InMemoryLedger};
use crate::search::{TrainQuery, search_trains};
use crate::snapshot::{SNAPSHOT_VERSION, Snapshot, SnapshotError, TrainEntry};
use crate::types::{Money, Railway, RailwayId, Train, TrainDraft, TrainId, TrainType};
use chrono::Duration;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

struct DemoTrain {
    number: &'static str,
    name: &'static str,
    from: &'static str,
    to: &'static str,
    departs_in: Duration,
    journey: Duration,
    seats: u32,
    fare: u64,
    train_type: TrainType,
}

/// Catalog, inventory and ledger behind the booking and admin APIs.
pub struct ReservationSystem {
    catalog: Arc<TrainCatalog>,
    inventory: Arc<SeatInventory>,
    ledger: Arc<dyn BookingLedger>,
    engine: BookingEngine,
    admin: AdminCapacityManager,
    env: ReservationEnvironment,
}

impl ReservationSystem {
    /// Creates an empty system over the given ledger
    #[must_use]
    pub fn new(env: ReservationEnvironment, ledger: Arc<dyn BookingLedger>) -> Self {
        let catalog = Arc::new(TrainCatalog::new());
        let inventory = Arc::new(SeatInventory::new());
        let engine = BookingEngine::new(
            Arc::clone(&catalog),
            Arc::clone(&inventory),
            Arc::clone(&ledger),
            env.clone(),
        );
        let admin = AdminCapacityManager::new(
            Arc::clone(&catalog),
            Arc::clone(&inventory),
            Arc::clone(&ledger),
            Arc::clone(&env.clock),
        );
        Self {
            catalog,
            inventory,
            ledger,
            engine,
            admin,
            env,
        }
    }

    /// Creates an empty system backed by an [`InMemoryLedger`]
    #[must_use]
    pub fn in_memory(env: ReservationEnvironment) -> Self {
        Self::new(env, Arc::new(InMemoryLedger::new()))
    }

    /// Booking operations
    #[must_use]
    pub const fn engine(&self) -> &BookingEngine {
        &self.engine
    }

    /// Train management operations
    #[must_use]
    pub const fn admin(&self) -> &AdminCapacityManager {
        &self.admin
    }

    /// Environment the system was built with
    #[must_use]
    pub const fn environment(&self) -> &ReservationEnvironment {
        &self.env
    }

    /// Bookable trains matching `query`
    #[must_use]
    pub fn search_trains(&self, query: &TrainQuery) -> Vec<Train> {
        search_trains(&self.catalog, &self.inventory, query)
    }

    /// One train with its current seat counts
    #[must_use]
    pub fn train(&self, train_id: TrainId) -> Option<Train> {
        self.admin.train(train_id)
    }

    /// Distinct origin and terminal stations
    #[must_use]
    pub fn stations(&self) -> Stations {
        self.catalog.stations()
    }

    /// Railway operators
    #[must_use]
    pub fn railways(&self) -> Vec<Railway> {
        self.catalog.railways()
    }

    /// Registers a railway operator.
    ///
    /// # Errors
    ///
    /// See [`TrainCatalog::add_railway`].
    pub fn add_railway(&self, railway: Railway) -> Result<()> {
        self.catalog.add_railway(railway)
    }

    /// Exports the catalog and ledger.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let trains = self
            .catalog
            .list()
            .into_iter()
            .filter_map(|record| {
                let seats = self.inventory.snapshot(record.train_id)?;
                Some(TrainEntry {
                    record,
                    total_seats: seats.total,
                })
            })
            .collect();
        Snapshot {
            version: SNAPSHOT_VERSION,
            taken_at: self.env.clock.now(),
            railways: self.catalog.railways(),
            trains,
            bookings: self.ledger.list_all(),
        }
    }

    /// Loads a snapshot into an empty system, rebuilding every seat counter
    /// from the confirmed bookings.
    ///
    /// # Errors
    ///
    /// - [`SnapshotError::Inconsistent`] if the system is not empty, a
    ///   confirmed booking names an unknown train, or confirmed seats exceed
    ///   a train's capacity
    /// - [`SnapshotError::Reservation`] if a component rejects its data
    pub fn restore(&self, snapshot: Snapshot) -> std::result::Result<(), SnapshotError> {
        if !self.catalog.is_empty() || !self.ledger.list_all().is_empty() {
            return Err(SnapshotError::Inconsistent(
                "restore requires an empty system".to_string(),
            ));
        }

        let capacity: HashMap<TrainId, u32> = snapshot
            .trains
            .iter()
            .map(|entry| (entry.record.train_id, entry.total_seats))
            .collect();
        if let Some(entry) = snapshot.trains.iter().find(|e| e.total_seats > MAX_SEATS) {
            return Err(SnapshotError::Inconsistent(format!(
                "train {} has capacity {} above the supported maximum",
                entry.record.train_id, entry.total_seats
            )));
        }
        let mut booked: HashMap<TrainId, u32> = HashMap::new();
        for booking in snapshot.bookings.iter().filter(|b| b.is_confirmed()) {
            if !capacity.contains_key(&booking.train_id) {
                return Err(SnapshotError::Inconsistent(format!(
                    "booking {} references unknown train {}",
                    booking.booking_id, booking.train_id
                )));
            }
            let seats = booked.entry(booking.train_id).or_default();
            *seats = seats.saturating_add(booking.passengers_count);
        }
        for (train_id, seats) in &booked {
            let total = capacity.get(train_id).copied().unwrap_or_default();
            if *seats > total {
                return Err(SnapshotError::Inconsistent(format!(
                    "train {train_id} has {seats} confirmed seat(s) but only {total} in total"
                )));
            }
        }

        let train_count = snapshot.trains.len();
        let booking_count = snapshot.bookings.len();
        self.ledger
            .restore(snapshot.bookings)
            .map_err(ReservationError::from)?;
        let mut records = Vec::with_capacity(train_count);
        for entry in snapshot.trains {
            let train_id = entry.record.train_id;
            let confirmed = booked.get(&train_id).copied().unwrap_or_default();
            self.inventory.restore(
                train_id,
                entry.total_seats,
                confirmed,
                entry.record.train_status.is_bookable(),
            )?;
            records.push(entry.record);
        }
        self.catalog.restore(snapshot.railways, records);

        info!(
            trains = train_count,
            bookings = booking_count,
            taken_at = %snapshot.taken_at,
            "Snapshot restored"
        );
        Ok(())
    }

    /// Seeds three railway operators and three long-distance trains
    /// departing relative to now.
    ///
    /// # Errors
    ///
    /// Fails if any of the seed rows clash with existing data.
    pub fn seed_demo_data(&self) -> Result<Vec<Train>> {
        let railways = [
            (1, "Indian Railways", "IR"),
            (2, "Metro Railway", "MR"),
            (3, "Regional Railway", "RR"),
        ];
        for (id, name, code) in railways {
            self.add_railway(Railway {
                railway_id: RailwayId::new(id),
                railway_name: name.to_string(),
                railway_code: code.to_string(),
            })?;
        }

        let now = self.env.clock.now();
        let trains = [
            DemoTrain {
                number: "12301",
                name: "Rajdhani Express",
                from: "New Delhi",
                to: "Mumbai Central",
                departs_in: Duration::days(1),
                journey: Duration::hours(16),
                seats: 400,
                fare: 1500,
                train_type: TrainType::Superfast,
            },
            DemoTrain {
                number: "12622",
                name: "Tamil Nadu Express",
                from: "New Delhi",
                to: "Chennai Central",
                departs_in: Duration::days(1) + Duration::hours(4),
                journey: Duration::hours(28),
                seats: 350,
                fare: 1200,
                train_type: TrainType::Express,
            },
            DemoTrain {
                number: "12430",
                name: "Shatabdi Express",
                from: "Bangalore",
                to: "Chennai",
                departs_in: Duration::days(2),
                journey: Duration::hours(5),
                seats: 300,
                fare: 800,
                train_type: TrainType::Superfast,
            },
        ];
        let mut seeded = Vec::with_capacity(trains.len());
        for demo in trains {
            let departure_time = now + demo.departs_in;
            let draft = TrainDraft {
                train_number: demo.number.to_string(),
                train_name: demo.name.to_string(),
                railway_id: RailwayId::new(1),
                source_station: demo.from.to_string(),
                destination_station: demo.to.to_string(),
                departure_time,
                arrival_time: departure_time + demo.journey,
                total_seats: demo.seats,
                base_fare: Money::checked_from_major(demo.fare)
                    .ok_or_else(|| ReservationError::validation("seed fare out of range"))?,
                train_type: demo.train_type,
                train_status: None,
            };
            seeded.push(self.admin.create_train(&draft)?);
        }
        info!(trains = seeded.len(), "Demo data seeded");
        Ok(seeded)
    }
}

impl Default for ReservationSystem {
    fn default() -> Self {
        Self::in_memory(ReservationEnvironment::default())
    }
}

impl std::fmt::Debug for ReservationSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReservationSystem")
            .field("trains", &self.catalog.len())
            .field("env", &self.env)
            .finish_non_exhaustive()
    }
}
