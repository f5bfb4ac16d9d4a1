//! Point-in-time export of the catalog and ledger.
//!
//! Seat counters are not stored: on restore, available seats are rebuilt
//! as `total − Σ confirmed`, so a restored system satisfies the seat
//! invariant by construction.

use crate::catalog::TrainRecord;
use crate::error::ReservationError;
use crate::types::{Booking, Railway};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// A train and its capacity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainEntry {
    /// Catalog row
    pub record: TrainRecord,
    /// Capacity at snapshot time
    pub total_seats: u32,
}

/// Everything needed to rebuild a reservation system.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Format version
    pub version: u32,
    /// When the snapshot was taken
    pub taken_at: DateTime<Utc>,
    /// Railway operators
    pub railways: Vec<Railway>,
    /// Trains with capacity
    pub trains: Vec<TrainEntry>,
    /// Every booking row, cancelled included
    pub bookings: Vec<Booking>,
}

/// Snapshot failures.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Reading or writing the file failed.
    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The bytes are not a snapshot.
    #[error("Snapshot encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    /// Written by an incompatible release.
    #[error("Unsupported snapshot version {found} (expected {SNAPSHOT_VERSION})")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
    },

    /// The contents contradict each other.
    #[error("Inconsistent snapshot: {0}")]
    Inconsistent(String),

    /// Rebuilding a component failed.
    #[error(transparent)]
    Reservation(#[from] ReservationError),
}

impl Snapshot {
    /// Serializes with bincode.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Encoding`] if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserializes and checks the version.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Encoding`] for garbage input or
    /// [`SnapshotError::UnsupportedVersion`] for another format.
    pub fn decode(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: Self = bincode::deserialize(bytes)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: snapshot.version,
            });
        }
        Ok(snapshot)
    }

    /// Writes the snapshot, replacing the file atomically.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Io`] or [`SnapshotError::Encoding`].
    pub fn write_to(&self, path: &Path) -> Result<(), SnapshotError> {
        let bytes = self.encode()?;
        let staging = path.with_extension("tmp");
        std::fs::write(&staging, bytes)?;
        std::fs::rename(&staging, path)?;
        tracing::info!(
            path = %path.display(),
            trains = self.trains.len(),
            bookings = self.bookings.len(),
            "Snapshot written"
        );
        Ok(())
    }

    /// Reads a snapshot. A missing file is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] for unreadable or invalid files.
    pub fn read_from(path: &Path) -> Result<Option<Self>, SnapshotError> {
        match std::fs::read(path) {
            Ok(bytes) => Self::decode(&bytes).map(Some),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn empty() -> Snapshot {
        Snapshot {
            version: SNAPSHOT_VERSION,
            taken_at: Utc::now(),
            railways: Vec::new(),
            trains: Vec::new(),
            bookings: Vec::new(),
        }
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let mut future = empty();
        future.version = 99;
        let bytes = future.encode().unwrap();
        assert!(matches!(
            Snapshot::decode(&bytes),
            Err(SnapshotError::UnsupportedVersion { found: 99 })
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            Snapshot::decode(&[0xff; 3]),
            Err(SnapshotError::Encoding(_))
        ));
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Snapshot::read_from(&dir.path().join("absent.bin")).unwrap().is_none());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("railbook.snapshot");
        let snapshot = empty();
        snapshot.write_to(&path).unwrap();
        assert_eq!(Snapshot::read_from(&path).unwrap(), Some(snapshot));
    }
}
