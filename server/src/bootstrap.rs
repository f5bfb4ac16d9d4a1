//! Startup and shutdown of the reservation state.
//!
//! At startup the system is restored from `SNAPSHOT_PATH` when that file
//! exists, otherwise seeded with demo data when `SEED_DEMO_DATA` is set.
//! On graceful shutdown the state is written back to the same path.

use crate::config::Config;
use crate::metrics;
use railbook_core::{
    ReservationEnvironment, ReservationError, ReservationSystem, Snapshot, SnapshotError,
};
use thiserror::Error;
use tracing::info;

/// Failures while preparing or persisting the reservation state.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The snapshot could not be read, written or applied.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// Demo data clashed with existing rows.
    #[error("Seeding demo data failed: {0}")]
    Seed(#[from] ReservationError),
}

/// How the state was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateOrigin {
    /// Loaded from a snapshot file
    Restored,
    /// Filled with demo railways and trains
    Seeded,
    /// Nothing to load
    Empty,
}

/// Build the reservation system described by `config`.
///
/// # Errors
///
/// Returns [`BootstrapError`] for an unreadable or inconsistent snapshot,
/// or if seeding fails.
pub fn build_system(config: &Config) -> Result<(ReservationSystem, StateOrigin), BootstrapError> {
    let system = ReservationSystem::in_memory(ReservationEnvironment::production(config.policy()));

    if let Some(path) = &config.storage.snapshot_path {
        if let Some(snapshot) = Snapshot::read_from(path)? {
            let trains = snapshot.trains.len();
            let bookings = snapshot.bookings.len();
            system.restore(snapshot)?;
            info!(path = %path.display(), trains, bookings, "Restored reservation state");
            return Ok((system, StateOrigin::Restored));
        }
        info!(path = %path.display(), "No snapshot found");
    }

    if config.storage.seed_demo_data {
        let trains = system.seed_demo_data()?;
        info!(trains = trains.len(), "Seeded demo data");
        return Ok((system, StateOrigin::Seeded));
    }

    info!("Starting with an empty catalog");
    Ok((system, StateOrigin::Empty))
}

/// Publish the seat gauge for every train.
pub fn publish_seat_gauges(system: &ReservationSystem) {
    for train in system.admin().list_trains() {
        metrics::record_seats_available(&train);
    }
}

/// Write a snapshot if `SNAPSHOT_PATH` is configured. Returns whether one
/// was written.
///
/// # Errors
///
/// Returns [`BootstrapError::Snapshot`] if the file cannot be written.
pub fn persist(system: &ReservationSystem, config: &Config) -> Result<bool, BootstrapError> {
    let Some(path) = &config.storage.snapshot_path else {
        return Ok(false);
    };
    system.snapshot().write_to(path)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use railbook_core::{BookingRequest, PaymentMethod, UserId};
    use std::path::Path;

    fn config(snapshot: Option<&Path>, seed: bool) -> Config {
        let mut config = Config::default();
        config.storage.snapshot_path = snapshot.map(Path::to_path_buf);
        config.storage.seed_demo_data = seed;
        config
    }

    #[test]
    fn test_seeds_without_snapshot() {
        let (system, origin) = build_system(&config(None, true)).unwrap();
        assert_eq!(origin, StateOrigin::Seeded);
        assert_eq!(system.admin().list_trains().len(), 3);
        assert_eq!(system.railways().len(), 3);
    }

    #[test]
    fn test_empty_when_seeding_disabled() {
        let (system, origin) = build_system(&config(None, false)).unwrap();
        assert_eq!(origin, StateOrigin::Empty);
        assert!(system.admin().list_trains().is_empty());
    }

    #[test]
    fn test_persist_without_path_is_noop() {
        let (system, _) = build_system(&config(None, true)).unwrap();
        assert!(!persist(&system, &config(None, true)).unwrap());
    }

    #[test]
    fn test_snapshot_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("railbook.snapshot");
        let config = config(Some(&path), true);

        let (first, origin) = build_system(&config).unwrap();
        assert_eq!(origin, StateOrigin::Seeded);
        let train = first.admin().list_trains()[0].clone();
        let booking = first
            .engine()
            .create_booking(&BookingRequest {
                user_id: UserId::new(7),
                train_id: train.train_id,
                passengers_count: 3,
                payment_method: Some(PaymentMethod::DebitCard),
            })
            .unwrap();
        assert!(persist(&first, &config).unwrap());

        let (second, origin) = build_system(&config).unwrap();
        assert_eq!(origin, StateOrigin::Restored);
        assert_eq!(
            second.train(train.train_id).unwrap().available_seats,
            train.available_seats - 3
        );
        assert_eq!(second.engine().bookings_for(UserId::new(7)), vec![booking]);
        assert!(second.engine().audit().is_empty());
    }
}
