//! Error types for reservation operations.

use crate::types::{BookingId, Pnr, TrainId};
use std::fmt;
use thiserror::Error;

/// Result type alias for reservation operations.
pub type Result<T> = std::result::Result<T, ReservationError>;

/// Machine-readable error category, stable across releases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad input shape or range
    Validation,
    /// Train or booking missing
    NotFound,
    /// Not enough unsold seats
    InsufficientSeats,
    /// Capacity edit would drop below confirmed seats
    CapacityBelowBooked,
    /// Caller does not own the booking
    Forbidden,
    /// Booking was already cancelled
    AlreadyCancelled,
    /// Train still has confirmed bookings
    HasActiveBookings,
    /// Concurrent mutation detected
    Conflict,
    /// Storage fault
    Internal,
}

impl ErrorKind {
    /// Wire code for the kind
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::InsufficientSeats => "INSUFFICIENT_SEATS",
            Self::CapacityBelowBooked => "CAPACITY_BELOW_BOOKED",
            Self::Forbidden => "FORBIDDEN",
            Self::AlreadyCancelled => "ALREADY_CANCELLED",
            Self::HasActiveBookings => "HAS_ACTIVE_BOOKINGS",
            Self::Conflict => "CONFLICT",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures raised by a [`BookingLedger`](crate::ledger::BookingLedger).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The PNR was issued before (possibly to a cancelled booking).
    #[error("PNR {0} has already been issued")]
    DuplicatePnr(Pnr),

    /// Two rows share a booking id.
    #[error("Booking {0} appears more than once")]
    DuplicateBooking(BookingId),

    /// No row with this id.
    #[error("Booking {0} is not in the ledger")]
    UnknownBooking(BookingId),

    /// The row is not in the state the write expected.
    #[error("Booking {0} is not confirmed")]
    NotConfirmed(BookingId),

    /// The backing store refused the write.
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

/// Error taxonomy for the reservation core.
///
/// Every seat-mutating operation that returns one of these leaves seat
/// counts exactly as they were before the call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReservationError {
    /// Input failed shape or range checks.
    #[error("{0}")]
    Validation(String),

    /// Unknown train.
    #[error("Train {0} not found")]
    TrainNotFound(TrainId),

    /// Unknown booking.
    #[error("Booking {0} not found")]
    BookingNotFound(BookingId),

    /// No booking carries this PNR.
    #[error("No booking with PNR {0}")]
    PnrNotFound(Pnr),

    /// Not enough unsold seats for the request.
    #[error("Not enough seats available on train {train_id}: requested {requested}, available {available}")]
    InsufficientSeats {
        /// Train
        train_id: TrainId,
        /// Seats asked for
        requested: u32,
        /// Seats left at the time of the check
        available: u32,
    },

    /// Capacity change would strand confirmed passengers.
    #[error("Cannot set capacity of train {train_id} to {requested_total}: {booked} seat(s) already booked")]
    CapacityBelowBooked {
        /// Train
        train_id: TrainId,
        /// Proposed capacity
        requested_total: u32,
        /// Seats held by confirmed bookings
        booked: u32,
    },

    /// Caller may not act on the booking.
    #[error("Not authorized to access booking {0}")]
    Forbidden(BookingId),

    /// Booking is already in its terminal state.
    #[error("Booking {0} is already cancelled")]
    AlreadyCancelled(BookingId),

    /// Train cannot be removed while bookings hold seats on it.
    #[error("Cannot delete train {train_id} with {active} active booking(s). Cancel bookings first.")]
    HasActiveBookings {
        /// Train
        train_id: TrainId,
        /// Confirmed bookings referencing it
        active: usize,
    },

    /// A concurrent mutation won; the request was not applied.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The ledger failed underneath the operation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl ReservationError {
    /// Shorthand for a validation failure
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Machine-readable category of this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::TrainNotFound(_)
            | Self::BookingNotFound(_)
            | Self::PnrNotFound(_)
            | Self::Ledger(LedgerError::UnknownBooking(_)) => ErrorKind::NotFound,
            Self::InsufficientSeats { .. } => ErrorKind::InsufficientSeats,
            Self::CapacityBelowBooked { .. } => ErrorKind::CapacityBelowBooked,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::AlreadyCancelled(_) | Self::Ledger(LedgerError::NotConfirmed(_)) => {
                ErrorKind::AlreadyCancelled
            }
            Self::HasActiveBookings { .. } => ErrorKind::HasActiveBookings,
            Self::Conflict(_)
            | Self::Ledger(LedgerError::DuplicatePnr(_) | LedgerError::DuplicateBooking(_)) => {
                ErrorKind::Conflict
            }
            Self::Ledger(LedgerError::Unavailable(_)) => ErrorKind::Internal,
        }
    }

    /// Short label used for rejection metrics and logs
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InsufficientSeats => "insufficient_seats",
            ErrorKind::CapacityBelowBooked => "capacity_below_booked",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::AlreadyCancelled => "already_cancelled",
            ErrorKind::HasActiveBookings => "has_active_bookings",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err = ReservationError::InsufficientSeats {
            train_id: TrainId::new(1),
            requested: 3,
            available: 2,
        };
        assert_eq!(err.kind(), ErrorKind::InsufficientSeats);
        assert_eq!(err.kind().as_str(), "INSUFFICIENT_SEATS");

        let ledger: ReservationError = LedgerError::Unavailable("disk full".into()).into();
        assert_eq!(ledger.kind(), ErrorKind::Internal);

        let missing: ReservationError = LedgerError::UnknownBooking(BookingId::new(9)).into();
        assert_eq!(missing.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_display_is_human_readable() {
        let err = ReservationError::HasActiveBookings {
            train_id: TrainId::new(4),
            active: 2,
        };
        assert_eq!(
            err.to_string(),
            "Cannot delete train 4 with 2 active booking(s). Cancel bookings first."
        );
        assert_eq!(
            ReservationError::validation("passengers_count must be at least 1").to_string(),
            "passengers_count must be at least 1"
        );
    }
}
