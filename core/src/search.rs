//! Read path: train search.
//!
//! Search never takes a seat lock. Seat counts come from each train's
//! lock-free mirror and may trail a booking that is committing right now.

use crate::catalog::{TrainCatalog, TrainRecord};
use crate::inventory::SeatInventory;
use crate::types::Train;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Search filters. Unset fields match everything.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainQuery {
    /// Origin station, matched case-insensitively
    pub source: Option<String>,
    /// Terminal station, matched case-insensitively
    pub destination: Option<String>,
    /// Keep trains departing on or after the start of this UTC day
    pub date: Option<NaiveDate>,
}

impl TrainQuery {
    fn matches(&self, record: &TrainRecord) -> bool {
        station_matches(self.source.as_deref(), &record.source_station)
            && station_matches(self.destination.as_deref(), &record.destination_station)
            && self.date.is_none_or(|date| {
                record.departure_time.naive_utc() >= date.and_time(NaiveTime::MIN)
            })
    }
}

fn station_matches(wanted: Option<&str>, station: &str) -> bool {
    match wanted.map(str::trim) {
        None | Some("") => true,
        Some(wanted) => station.eq_ignore_ascii_case(wanted),
    }
}

/// Trains matching `query` that still have unsold seats, earliest
/// departure first.
#[must_use]
pub fn search_trains(
    catalog: &TrainCatalog,
    inventory: &SeatInventory,
    query: &TrainQuery,
) -> Vec<Train> {
    let mut trains: Vec<Train> = catalog
        .list()
        .into_iter()
        .filter(|record| query.matches(record))
        .filter_map(|record| {
            let seats = inventory.snapshot(record.train_id)?;
            (seats.available > 0).then(|| record.with_seats(seats))
        })
        .collect();
    trains.sort_by(|a, b| {
        a.departure_time
            .cmp(&b.departure_time)
            .then(a.train_id.cmp(&b.train_id))
    });
    tracing::debug!(
        source = ?query.source,
        destination = ?query.destination,
        date = ?query.date,
        results = trains.len(),
        "Train search"
    );
    trains
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::types::{Money, Railway, RailwayId, TrainDraft, TrainType};
    use chrono::{Duration, TimeZone, Utc};

    fn setup() -> (TrainCatalog, SeatInventory) {
        let catalog = TrainCatalog::new();
        catalog
            .add_railway(Railway {
                railway_id: RailwayId::new(1),
                railway_name: "Indian Railways".to_string(),
                railway_code: "IR".to_string(),
            })
            .unwrap();
        let inventory = SeatInventory::new();
        let trains = [
            ("1", "New Delhi", "Mumbai Central", 3, 10),
            ("2", "New Delhi", "Chennai Central", 1, 5),
            ("3", "Bangalore", "Chennai Central", 2, 1),
        ];
        for (number, from, to, day, seats) in trains {
            let departure = Utc.with_ymd_and_hms(2025, 3, day, 16, 0, 0).unwrap();
            let draft = TrainDraft {
                train_number: number.to_string(),
                train_name: format!("Train {number}"),
                railway_id: RailwayId::new(1),
                source_station: from.to_string(),
                destination_station: to.to_string(),
                departure_time: departure,
                arrival_time: departure + Duration::hours(12),
                total_seats: seats,
                base_fare: Money::from_minor(100_000),
                train_type: TrainType::Express,
                train_status: None,
            };
            let record = catalog.insert(&draft, Utc::now()).unwrap();
            inventory.register(record.train_id, seats, true).unwrap();
        }
        (catalog, inventory)
    }

    fn numbers(trains: &[Train]) -> Vec<&str> {
        trains.iter().map(|t| t.train_number.as_str()).collect()
    }

    #[test]
    fn test_no_filters_sorted_by_departure() {
        let (catalog, inventory) = setup();
        let all = search_trains(&catalog, &inventory, &TrainQuery::default());
        assert_eq!(numbers(&all), vec!["2", "3", "1"]);
    }

    #[test]
    fn test_station_match_ignores_case_and_padding() {
        let (catalog, inventory) = setup();
        let query = TrainQuery {
            source: Some("  new delhi ".to_string()),
            destination: Some("CHENNAI CENTRAL".to_string()),
            date: None,
        };
        assert_eq!(numbers(&search_trains(&catalog, &inventory, &query)), vec!["2"]);
    }

    #[test]
    fn test_date_keeps_later_departures() {
        let (catalog, inventory) = setup();
        let query = TrainQuery {
            date: NaiveDate::from_ymd_opt(2025, 3, 2),
            ..TrainQuery::default()
        };
        assert_eq!(numbers(&search_trains(&catalog, &inventory, &query)), vec!["3", "1"]);
    }

    #[test]
    fn test_sold_out_trains_hidden() {
        let (catalog, inventory) = setup();
        let sold_out = catalog.list()[2].train_id;
        let _ = inventory.reserve(sold_out, 1).unwrap();
        let all = search_trains(&catalog, &inventory, &TrainQuery::default());
        assert_eq!(numbers(&all), vec!["2", "1"]);
    }
}
