//! Domain types for the Railbook reservation core.
//!
//! Value objects (identifiers, money, PNRs), the train and booking records,
//! and the request shapes the engine accepts. Everything here is plain data;
//! the components that mutate it live in their own modules.

use crate::error::{ReservationError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wraps a raw numeric identifier
            #[must_use]
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Returns the raw numeric identifier
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }
    };
}

numeric_id!(
    /// Unique identifier for a train
    TrainId
);
numeric_id!(
    /// Unique identifier for a booking
    BookingId
);
numeric_id!(
    /// Identifier of a traveler or administrator, issued by the identity provider
    UserId
);
numeric_id!(
    /// Identifier of the railway operator running a train
    RailwayId
);

// ============================================================================
// Money (minor units to avoid floating point drift)
// ============================================================================

/// An amount of money in minor units (paise).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    /// Zero
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from minor units
    #[must_use]
    pub const fn from_minor(minor: u64) -> Self {
        Self(minor)
    }

    /// Creates a `Money` value from whole major units (rupees)
    #[must_use]
    pub const fn checked_from_major(major: u64) -> Option<Self> {
        match major.checked_mul(100) {
            Some(minor) => Some(Self(minor)),
            None => None,
        }
    }

    /// Converts a decimal amount in major units, rounding to the nearest minor unit.
    ///
    /// Returns `None` for negative, non-finite or out-of-range input.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn from_major_decimal(amount: f64) -> Option<Self> {
        if !amount.is_finite() || amount < 0.0 {
            return None;
        }
        let minor = (amount * 100.0).round();
        if minor > u64::MAX as f64 {
            return None;
        }
        Some(Self(minor as u64))
    }

    /// Returns the amount in minor units
    #[must_use]
    pub const fn minor(self) -> u64 {
        self.0
    }

    /// Returns the amount as a decimal in major units
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_major_decimal(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Multiplies by a passenger count with overflow checking
    #[must_use]
    pub const fn checked_multiply(self, quantity: u32) -> Option<Self> {
        match self.0.checked_mul(quantity as u64) {
            Some(minor) => Some(Self(minor)),
            None => None,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "₹{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

// ============================================================================
// PNR
// ============================================================================

/// Number of characters in a PNR.
pub const PNR_LENGTH: usize = 10;

/// Passenger Name Record: the human-facing booking reference.
///
/// Always [`PNR_LENGTH`] uppercase hexadecimal characters.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pnr(String);

impl Pnr {
    /// Builds a PNR from five random bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; PNR_LENGTH / 2]) -> Self {
        use fmt::Write;

        let mut code = String::with_capacity(PNR_LENGTH);
        for byte in bytes {
            let _ = write!(code, "{byte:02X}");
        }
        Self(code)
    }

    /// Parses user input into a PNR, normalising to uppercase.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::Validation`] if the input is not
    /// [`PNR_LENGTH`] hexadecimal characters.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.len() != PNR_LENGTH || !trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ReservationError::validation(format!(
                "PNR must be {PNR_LENGTH} hexadecimal characters"
            )));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Returns the PNR as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Pnr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Enumerations
// ============================================================================

/// Service class of a train.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrainType {
    /// Long-distance express
    #[default]
    Express,
    /// Limited-stop superfast
    Superfast,
    /// Suburban local
    Local,
    /// All-stops passenger
    Passenger,
}

/// Operational status of a train.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainStatus {
    /// Running to timetable
    #[default]
    Scheduled,
    /// Running late, still bookable
    Delayed,
    /// Withdrawn from service
    Cancelled,
    /// Journey finished
    Completed,
}

impl TrainStatus {
    /// Whether new bookings may be taken in this status
    #[must_use]
    pub const fn is_bookable(self) -> bool {
        matches!(self, Self::Scheduled | Self::Delayed)
    }
}

impl fmt::Display for TrainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Scheduled => "scheduled",
            Self::Delayed => "delayed",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        };
        f.write_str(label)
    }
}

/// Booking lifecycle status. Cancelled is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Seats are held for the booking
    Confirmed,
    /// Seats were released
    Cancelled,
}

/// Payment state tracked alongside a booking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// No settlement recorded yet
    Pending,
    /// Settled
    Paid,
    /// Returned to the traveler after cancellation
    Refunded,
}

/// How the traveler paid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Credit card
    CreditCard,
    /// Debit card
    DebitCard,
    /// Unified Payments Interface
    Upi,
    /// Net banking
    NetBanking,
}

/// Role of the caller, as asserted by the identity provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Traveler
    User,
    /// Administrator
    Admin,
}

impl FromStr for Role {
    type Err = ReservationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(ReservationError::validation(format!("unknown role '{other}'"))),
        }
    }
}

// ============================================================================
// Railways
// ============================================================================

/// A railway operator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Railway {
    /// Operator id
    pub railway_id: RailwayId,
    /// Display name
    pub railway_name: String,
    /// Short code, unique
    pub railway_code: String,
}

// ============================================================================
// Trains
// ============================================================================

/// Train fields supplied by an administrator on create or update.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainDraft {
    /// Public train number, unique across the catalog
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
    /// Scheduled arrival, strictly after departure
    pub arrival_time: DateTime<Utc>,
    /// Seat capacity
    pub total_seats: u32,
    /// Fare per passenger
    pub base_fare: Money,
    /// Service class
    pub train_type: TrainType,
    /// Status; `None` keeps the current status (or `Scheduled` on create)
    pub train_status: Option<TrainStatus>,
}

impl TrainDraft {
    /// Checks field shapes and ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::Validation`] describing the first bad field.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("train_number", &self.train_number),
            ("train_name", &self.train_name),
            ("source_station", &self.source_station),
            ("destination_station", &self.destination_station),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ReservationError::validation(format!("{field} must not be empty")));
            }
        }
        if self
            .source_station
            .trim()
            .eq_ignore_ascii_case(self.destination_station.trim())
        {
            return Err(ReservationError::validation(
                "source_station and destination_station must differ",
            ));
        }
        if self.departure_time >= self.arrival_time {
            return Err(ReservationError::validation(
                "departure_time must be before arrival_time",
            ));
        }
        Ok(())
    }
}

/// A train as presented to callers: catalog fields plus the live seat counts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Train {
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
    /// Seat capacity
    pub total_seats: u32,
    /// Unsold seats at the time the view was taken
    pub available_seats: u32,
    /// Fare per passenger
    pub base_fare: Money,
    /// Service class
    pub train_type: TrainType,
    /// Operational status
    pub train_status: TrainStatus,
    /// When the train was added
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Bookings
// ============================================================================

/// A booking row in the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Booking id
    pub booking_id: BookingId,
    /// Human-facing reference, unique for the ledger's lifetime
    pub pnr_number: Pnr,
    /// Traveler who owns the booking
    pub user_id: UserId,
    /// Booked train
    pub train_id: TrainId,
    /// Seats held, at least one
    pub passengers_count: u32,
    /// `passengers_count × base_fare`, frozen at booking time
    pub total_amount: Money,
    /// Lifecycle status
    pub booking_status: BookingStatus,
    /// Payment state
    pub payment_status: PaymentStatus,
    /// Payment method, when one was supplied
    pub payment_method: Option<PaymentMethod>,
    /// Settlement reference, when paid
    pub transaction_id: Option<String>,
    /// When the booking was confirmed
    pub booking_date: DateTime<Utc>,
    /// When the booking was cancelled
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Booking {
    /// Whether the booking still holds seats
    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        self.booking_status == BookingStatus::Confirmed
    }
}

/// A validated request to book seats.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookingRequest {
    /// Traveler making the booking
    pub user_id: UserId,
    /// Train to book
    pub train_id: TrainId,
    /// Seats wanted
    pub passengers_count: u32,
    /// Payment method; `None` leaves the booking pending payment
    pub payment_method: Option<PaymentMethod>,
}

/// Identity of whoever is asking, used for ownership checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Requester {
    /// Caller id
    pub user_id: UserId,
    /// Caller role
    pub role: Role,
}

impl Requester {
    /// A traveler
    #[must_use]
    pub const fn user(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::User,
        }
    }

    /// An administrator
    #[must_use]
    pub const fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Admin,
        }
    }

    /// Whether the caller is an administrator
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Owners and administrators may see and cancel a booking
    #[must_use]
    pub fn can_access(&self, booking: &Booking) -> bool {
        self.is_admin() || booking.user_id == self.user_id
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use chrono::Duration;

    fn draft() -> TrainDraft {
        let departure = Utc::now();
        TrainDraft {
            train_number: "12301".to_string(),
            train_name: "Rajdhani Express".to_string(),
            railway_id: RailwayId::new(1),
            source_station: "New Delhi".to_string(),
            destination_station: "Mumbai Central".to_string(),
            departure_time: departure,
            arrival_time: departure + Duration::hours(16),
            total_seats: 400,
            base_fare: Money::from_minor(150_000),
            train_type: TrainType::Superfast,
            train_status: None,
        }
    }

    #[test]
    fn test_money_multiply() {
        let fare = Money::checked_from_major(500).unwrap();
        assert_eq!(fare.checked_multiply(2), Some(Money::from_minor(100_000)));
        assert_eq!(Money::from_minor(u64::MAX).checked_multiply(2), None);
    }

    #[test]
    fn test_money_from_decimal() {
        assert_eq!(Money::from_major_decimal(1500.0), Some(Money::from_minor(150_000)));
        assert_eq!(Money::from_major_decimal(12.34), Some(Money::from_minor(1234)));
        assert_eq!(Money::from_major_decimal(-1.0), None);
        assert_eq!(Money::from_major_decimal(f64::NAN), None);
        assert_eq!(Money::from_minor(80_050).to_string(), "₹800.50");
    }

    #[test]
    fn test_pnr_from_bytes_is_uppercase_hex() {
        let pnr = Pnr::from_bytes([0xab, 0x01, 0xff, 0x10, 0x9c]);
        assert_eq!(pnr.as_str(), "AB01FF109C");
        assert_eq!(pnr.as_str().len(), PNR_LENGTH);
    }

    #[test]
    fn test_pnr_parse_normalises() {
        assert_eq!(Pnr::parse(" ab01ff109c ").unwrap().as_str(), "AB01FF109C");
        assert!(Pnr::parse("AB01").is_err());
        assert!(Pnr::parse("ZZ01FF109C").is_err());
    }

    #[test]
    fn test_train_status_bookable() {
        assert!(TrainStatus::Scheduled.is_bookable());
        assert!(TrainStatus::Delayed.is_bookable());
        assert!(!TrainStatus::Cancelled.is_bookable());
        assert!(!TrainStatus::Completed.is_bookable());
    }

    #[test]
    fn test_draft_validation() {
        assert!(draft().validate().is_ok());

        let mut same_station = draft();
        same_station.destination_station = " new delhi".to_string();
        assert!(same_station.validate().is_err());

        let mut backwards = draft();
        backwards.arrival_time = backwards.departure_time;
        assert!(backwards.validate().is_err());

        let mut unnamed = draft();
        unnamed.train_name = "   ".to_string();
        assert!(unnamed.validate().is_err());
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
        assert!("root".parse::<Role>().is_err());
    }
}
