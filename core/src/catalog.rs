//! Train catalog: route, schedule, fare and status for every train.
//!
//! The catalog is the owner of static train data. Seat counts are not stored
//! here; they live in [`SeatInventory`](crate::inventory::SeatInventory) and
//! are joined in when a [`Train`] view is built.

use crate::error::{ReservationError, Result};
use crate::inventory::SeatSnapshot;
use crate::sync::{read, write};
use crate::types::{Money, Railway, RailwayId, Train, TrainDraft, TrainId, TrainStatus, TrainType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Catalog row for a train.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainRecord {
    /// Train id
    pub train_id: TrainId,
    /// Public train number
    pub train_number: String,
    /// Display name
    pub train_name: String,
    /// Operating railway
    pub railway_id: RailwayId,
    /// Origin station
    pub source_station: String,
    /// Terminal station
    pub destination_station: String,
    /// Scheduled departure
    pub departure_time: DateTime<Utc>,
    /// Scheduled arrival
    pub arrival_time: DateTime<Utc>,
    /// Fare per passenger
    pub base_fare: Money,
    /// Service class
    pub train_type: TrainType,
    /// Operational status
    pub train_status: TrainStatus,
    /// When the train was added
    pub created_at: DateTime<Utc>,
}

impl TrainRecord {
    /// Joins the catalog row with a seat snapshot.
    #[must_use]
    pub fn with_seats(self, seats: SeatSnapshot) -> Train {
        Train {
            train_id: self.train_id,
            train_number: self.train_number,
            train_name: self.train_name,
            railway_id: self.railway_id,
            source_station: self.source_station,
            destination_station: self.destination_station,
            departure_time: self.departure_time,
            arrival_time: self.arrival_time,
            total_seats: seats.total,
            available_seats: seats.available,
            base_fare: self.base_fare,
            train_type: self.train_type,
            train_status: self.train_status,
            created_at: self.created_at,
        }
    }

    fn apply(&mut self, draft: &TrainDraft) {
        self.train_number = draft.train_number.trim().to_string();
        self.train_name = draft.train_name.trim().to_string();
        self.railway_id = draft.railway_id;
        self.source_station = draft.source_station.trim().to_string();
        self.destination_station = draft.destination_station.trim().to_string();
        self.departure_time = draft.departure_time;
        self.arrival_time = draft.arrival_time;
        self.base_fare = draft.base_fare;
        self.train_type = draft.train_type;
        if let Some(status) = draft.train_status {
            self.train_status = status;
        }
    }
}

/// Distinct origin and terminal stations across the catalog.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stations {
    /// Origins, sorted
    pub sources: Vec<String>,
    /// Terminals, sorted
    pub destinations: Vec<String>,
}

#[derive(Debug, Default)]
struct CatalogState {
    trains: BTreeMap<TrainId, TrainRecord>,
    railways: BTreeMap<RailwayId, Railway>,
}

impl CatalogState {
    fn number_taken(&self, number: &str, except: Option<TrainId>) -> bool {
        self.trains.values().any(|record| {
            Some(record.train_id) != except
                && record.train_number.eq_ignore_ascii_case(number.trim())
        })
    }
}

/// Owner of train records and railway operators.
#[derive(Debug)]
pub struct TrainCatalog {
    state: RwLock<CatalogState>,
    next_train_id: AtomicU64,
}

impl Default for TrainCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl TrainCatalog {
    /// Creates an empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(CatalogState::default()),
            next_train_id: AtomicU64::new(1),
        }
    }

    /// Registers a railway operator, replacing any with the same id.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::Validation`] if the name or code is blank
    /// or the code belongs to a different operator.
    pub fn add_railway(&self, railway: Railway) -> Result<()> {
        if railway.railway_name.trim().is_empty() || railway.railway_code.trim().is_empty() {
            return Err(ReservationError::validation(
                "railway_name and railway_code must not be empty",
            ));
        }
        let mut state = write(&self.state);
        let code_clash = state.railways.values().any(|existing| {
            existing.railway_id != railway.railway_id
                && existing.railway_code.eq_ignore_ascii_case(&railway.railway_code)
        });
        if code_clash {
            return Err(ReservationError::validation(format!(
                "railway_code '{}' is already registered",
                railway.railway_code
            )));
        }
        state.railways.insert(railway.railway_id, railway);
        Ok(())
    }

    /// All railway operators, ordered by id
    #[must_use]
    pub fn railways(&self) -> Vec<Railway> {
        read(&self.state).railways.values().cloned().collect()
    }

    /// Adds a train. Capacity is not stored here; the caller registers it
    /// with the seat inventory.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::Validation`] if the draft is malformed,
    /// the railway is unknown or the train number is taken.
    pub fn insert(&self, draft: &TrainDraft, created_at: DateTime<Utc>) -> Result<TrainRecord> {
        draft.validate()?;
        let mut state = write(&self.state);
        Self::check_references(&state, draft, None)?;

        let train_id = TrainId::new(self.next_train_id.fetch_add(1, Ordering::Relaxed));
        let mut record = TrainRecord {
            train_id,
            train_number: String::new(),
            train_name: String::new(),
            railway_id: draft.railway_id,
            source_station: String::new(),
            destination_station: String::new(),
            departure_time: draft.departure_time,
            arrival_time: draft.arrival_time,
            base_fare: draft.base_fare,
            train_type: draft.train_type,
            train_status: TrainStatus::Scheduled,
            created_at,
        };
        record.apply(draft);
        state.trains.insert(train_id, record.clone());
        Ok(record)
    }

    /// Replaces route, schedule, fare, type and (if given) status of a train.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::TrainNotFound`] for an unknown id, or
    /// [`ReservationError::Validation`] as for [`TrainCatalog::insert`].
    pub fn update(&self, train_id: TrainId, draft: &TrainDraft) -> Result<TrainRecord> {
        draft.validate()?;
        let mut state = write(&self.state);
        if !state.trains.contains_key(&train_id) {
            return Err(ReservationError::TrainNotFound(train_id));
        }
        Self::check_references(&state, draft, Some(train_id))?;
        let record = state
            .trains
            .get_mut(&train_id)
            .ok_or(ReservationError::TrainNotFound(train_id))?;
        record.apply(draft);
        Ok(record.clone())
    }

    /// Changes the operational status of a train.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::TrainNotFound`] for an unknown id.
    pub fn set_status(&self, train_id: TrainId, status: TrainStatus) -> Result<TrainRecord> {
        let mut state = write(&self.state);
        let record = state
            .trains
            .get_mut(&train_id)
            .ok_or(ReservationError::TrainNotFound(train_id))?;
        record.train_status = status;
        Ok(record.clone())
    }

    /// Removes a train from the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::TrainNotFound`] for an unknown id.
    pub fn remove(&self, train_id: TrainId) -> Result<TrainRecord> {
        write(&self.state)
            .trains
            .remove(&train_id)
            .ok_or(ReservationError::TrainNotFound(train_id))
    }

    /// Looks a train up by id
    #[must_use]
    pub fn get(&self, train_id: TrainId) -> Option<TrainRecord> {
        read(&self.state).trains.get(&train_id).cloned()
    }

    /// All trains, ordered by id
    #[must_use]
    pub fn list(&self) -> Vec<TrainRecord> {
        read(&self.state).trains.values().cloned().collect()
    }

    /// Number of trains in the catalog
    #[must_use]
    pub fn len(&self) -> usize {
        read(&self.state).trains.len()
    }

    /// Whether the catalog has no trains
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `number` belongs to a train other than `except`
    #[must_use]
    pub fn contains_number(&self, number: &str, except: Option<TrainId>) -> bool {
        read(&self.state).number_taken(number, except)
    }

    /// Distinct origin and terminal stations
    #[must_use]
    pub fn stations(&self) -> Stations {
        let state = read(&self.state);
        let sources: BTreeSet<&str> = state
            .trains
            .values()
            .map(|t| t.source_station.as_str())
            .collect();
        let destinations: BTreeSet<&str> = state
            .trains
            .values()
            .map(|t| t.destination_station.as_str())
            .collect();
        Stations {
            sources: sources.into_iter().map(str::to_string).collect(),
            destinations: destinations.into_iter().map(str::to_string).collect(),
        }
    }

    /// Replaces the catalog contents wholesale. Used when loading a snapshot.
    pub(crate) fn restore(&self, railways: Vec<Railway>, trains: Vec<TrainRecord>) {
        let mut state = write(&self.state);
        let next = trains.iter().map(|t| t.train_id.get()).max().unwrap_or(0) + 1;
        state.railways = railways.into_iter().map(|r| (r.railway_id, r)).collect();
        state.trains = trains.into_iter().map(|t| (t.train_id, t)).collect();
        self.next_train_id.store(next, Ordering::Relaxed);
    }

    fn check_references(
        state: &CatalogState,
        draft: &TrainDraft,
        except: Option<TrainId>,
    ) -> Result<()> {
        if !state.railways.contains_key(&draft.railway_id) {
            return Err(ReservationError::validation(format!(
                "railway {} does not exist",
                draft.railway_id
            )));
        }
        if state.number_taken(&draft.train_number, except) {
            return Err(ReservationError::validation(format!(
                "train_number '{}' is already in use",
                draft.train_number.trim()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use chrono::Duration;

    fn catalog() -> TrainCatalog {
        let catalog = TrainCatalog::new();
        catalog
            .add_railway(Railway {
                railway_id: RailwayId::new(1),
                railway_name: "Indian Railways".to_string(),
                railway_code: "IR".to_string(),
            })
            .unwrap();
        catalog
    }

    fn draft(number: &str, from: &str, to: &str) -> TrainDraft {
        let departure = Utc::now() + Duration::days(1);
        TrainDraft {
            train_number: number.to_string(),
            train_name: format!("Train {number}"),
            railway_id: RailwayId::new(1),
            source_station: from.to_string(),
            destination_station: to.to_string(),
            departure_time: departure,
            arrival_time: departure + Duration::hours(6),
            total_seats: 100,
            base_fare: Money::from_minor(50_000),
            train_type: TrainType::Express,
            train_status: None,
        }
    }

    #[test]
    fn test_insert_assigns_sequential_ids() {
        let catalog = catalog();
        let a = catalog.insert(&draft("100", "A", "B"), Utc::now()).unwrap();
        let b = catalog.insert(&draft("200", "B", "C"), Utc::now()).unwrap();
        assert_eq!(a.train_id, TrainId::new(1));
        assert_eq!(b.train_id, TrainId::new(2));
        assert_eq!(a.train_status, TrainStatus::Scheduled);
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_duplicate_train_number_rejected() {
        let catalog = catalog();
        catalog.insert(&draft("12301", "A", "B"), Utc::now()).unwrap();
        let err = catalog.insert(&draft("12301", "C", "D"), Utc::now()).unwrap_err();
        assert!(matches!(err, ReservationError::Validation(_)));
    }

    #[test]
    fn test_unknown_railway_rejected() {
        let catalog = catalog();
        let mut orphan = draft("1", "A", "B");
        orphan.railway_id = RailwayId::new(42);
        assert!(catalog.insert(&orphan, Utc::now()).is_err());
    }

    #[test]
    fn test_update_keeps_own_number_and_status() {
        let catalog = catalog();
        let record = catalog.insert(&draft("100", "A", "B"), Utc::now()).unwrap();
        catalog.set_status(record.train_id, TrainStatus::Delayed).unwrap();

        let mut changed = draft("100", "A", "C");
        changed.base_fare = Money::from_minor(90_000);
        let updated = catalog.update(record.train_id, &changed).unwrap();

        assert_eq!(updated.destination_station, "C");
        assert_eq!(updated.base_fare, Money::from_minor(90_000));
        assert_eq!(updated.train_status, TrainStatus::Delayed);
        assert_eq!(updated.created_at, record.created_at);
    }

    #[test]
    fn test_contains_number_ignores_self() {
        let catalog = catalog();
        let record = catalog.insert(&draft("12301", "A", "B"), Utc::now()).unwrap();
        assert!(catalog.contains_number(" 12301 ", None));
        assert!(!catalog.contains_number("12301", Some(record.train_id)));
        assert!(!catalog.contains_number("99999", None));
    }

    #[test]
    fn test_update_unknown_train() {
        let catalog = catalog();
        let err = catalog.update(TrainId::new(7), &draft("1", "A", "B")).unwrap_err();
        assert_eq!(err, ReservationError::TrainNotFound(TrainId::new(7)));
    }

    #[test]
    fn test_stations_are_distinct_and_sorted() {
        let catalog = catalog();
        catalog.insert(&draft("1", "New Delhi", "Mumbai"), Utc::now()).unwrap();
        catalog.insert(&draft("2", "New Delhi", "Chennai"), Utc::now()).unwrap();
        catalog.insert(&draft("3", "Bangalore", "Chennai"), Utc::now()).unwrap();

        let stations = catalog.stations();
        assert_eq!(stations.sources, vec!["Bangalore", "New Delhi"]);
        assert_eq!(stations.destinations, vec!["Chennai", "Mumbai"]);
    }

    #[test]
    fn test_railway_code_clash() {
        let catalog = catalog();
        let err = catalog
            .add_railway(Railway {
                railway_id: RailwayId::new(2),
                railway_name: "Imposter".to_string(),
                railway_code: "ir".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, ReservationError::Validation(_)));
    }
}
