//! Booking ledger: the record of every booking ever confirmed.
//!
//! Rows are never deleted. Cancellation flips a row to its terminal state,
//! which keeps every issued PNR reserved for the ledger's lifetime.

use crate::error::LedgerError;
use crate::sync::{read, write};
use crate::types::{
    Booking, BookingId, BookingStatus, Money, PaymentMethod, PaymentStatus, Pnr, TrainId, UserId,
};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

/// A booking about to be written. The ledger assigns the id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewBooking {
    /// Human-facing reference
    pub pnr_number: Pnr,
    /// Owner
    pub user_id: UserId,
    /// Booked train
    pub train_id: TrainId,
    /// Seats held
    pub passengers_count: u32,
    /// Frozen fare total
    pub total_amount: Money,
    /// Payment state at creation
    pub payment_status: PaymentStatus,
    /// Payment method, if any
    pub payment_method: Option<PaymentMethod>,
    /// Settlement reference, if paid
    pub transaction_id: Option<String>,
    /// Confirmation time
    pub booking_date: DateTime<Utc>,
}

/// Storage for booking rows.
///
/// Implementations are called from inside a train's seat critical section,
/// so they must not block on anything that could call back into the
/// inventory.
pub trait BookingLedger: Send + Sync {
    /// Writes a new confirmed row.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::DuplicatePnr`] if the PNR was ever issued, or
    /// [`LedgerError::Unavailable`] if the store refuses the write.
    fn append(&self, booking: NewBooking) -> Result<Booking, LedgerError>;

    /// Moves a confirmed row to Cancelled; a Paid row becomes Refunded.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::UnknownBooking`], [`LedgerError::NotConfirmed`]
    /// or [`LedgerError::Unavailable`].
    fn cancel(&self, booking_id: BookingId, at: DateTime<Utc>) -> Result<Booking, LedgerError>;

    /// Looks a row up by id
    fn get(&self, booking_id: BookingId) -> Option<Booking>;

    /// Looks a row up by PNR
    fn find_by_pnr(&self, pnr: &Pnr) -> Option<Booking>;

    /// Whether the PNR was ever issued
    fn contains_pnr(&self, pnr: &Pnr) -> bool;

    /// Rows owned by a user, oldest first
    fn list_for_user(&self, user_id: UserId) -> Vec<Booking>;

    /// Every row, oldest first
    fn list_all(&self) -> Vec<Booking>;

    /// Seats held by confirmed rows on a train
    fn confirmed_seats(&self, train_id: TrainId) -> u32;

    /// Number of confirmed rows on a train
    fn active_count(&self, train_id: TrainId) -> usize;

    /// Replaces the ledger contents. Used when loading a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::DuplicatePnr`] if two rows share a PNR, or
    /// [`LedgerError::DuplicateBooking`] if two rows share an id.
    fn restore(&self, rows: Vec<Booking>) -> Result<(), LedgerError>;
}

#[derive(Debug, Default)]
struct LedgerState {
    rows: BTreeMap<BookingId, Booking>,
    by_pnr: HashMap<Pnr, BookingId>,
    by_user: HashMap<UserId, Vec<BookingId>>,
    by_train: HashMap<TrainId, Vec<BookingId>>,
    next_id: u64,
}

impl LedgerState {
    fn index(&mut self, booking: Booking) -> Booking {
        let id = booking.booking_id;
        self.by_pnr.insert(booking.pnr_number.clone(), id);
        self.by_user.entry(booking.user_id).or_default().push(id);
        self.by_train.entry(booking.train_id).or_default().push(id);
        self.next_id = self.next_id.max(id.get());
        self.rows.insert(id, booking.clone());
        booking
    }

    fn collect(&self, ids: Option<&Vec<BookingId>>) -> Vec<Booking> {
        ids.map(|ids| ids.iter().filter_map(|id| self.rows.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    fn confirmed_on(&self, train_id: TrainId) -> impl Iterator<Item = &Booking> {
        self.by_train
            .get(&train_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.rows.get(id))
            .filter(|booking| booking.is_confirmed())
    }
}

/// Ledger held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    state: RwLock<LedgerState>,
}

impl InMemoryLedger {
    /// Creates an empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows, cancelled included
    #[must_use]
    pub fn len(&self) -> usize {
        read(&self.state).rows.len()
    }

    /// Whether the ledger has no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BookingLedger for InMemoryLedger {
    fn append(&self, booking: NewBooking) -> Result<Booking, LedgerError> {
        let mut state = write(&self.state);
        if state.by_pnr.contains_key(&booking.pnr_number) {
            return Err(LedgerError::DuplicatePnr(booking.pnr_number));
        }
        let booking_id = BookingId::new(state.next_id + 1);
        let row = Booking {
            booking_id,
            pnr_number: booking.pnr_number,
            user_id: booking.user_id,
            train_id: booking.train_id,
            passengers_count: booking.passengers_count,
            total_amount: booking.total_amount,
            booking_status: BookingStatus::Confirmed,
            payment_status: booking.payment_status,
            payment_method: booking.payment_method,
            transaction_id: booking.transaction_id,
            booking_date: booking.booking_date,
            cancelled_at: None,
        };
        Ok(state.index(row))
    }

    fn cancel(&self, booking_id: BookingId, at: DateTime<Utc>) -> Result<Booking, LedgerError> {
        let mut state = write(&self.state);
        let row = state
            .rows
            .get_mut(&booking_id)
            .ok_or(LedgerError::UnknownBooking(booking_id))?;
        if !row.is_confirmed() {
            return Err(LedgerError::NotConfirmed(booking_id));
        }
        row.booking_status = BookingStatus::Cancelled;
        row.cancelled_at = Some(at);
        if row.payment_status == PaymentStatus::Paid {
            row.payment_status = PaymentStatus::Refunded;
        }
        Ok(row.clone())
    }

    fn get(&self, booking_id: BookingId) -> Option<Booking> {
        read(&self.state).rows.get(&booking_id).cloned()
    }

    fn find_by_pnr(&self, pnr: &Pnr) -> Option<Booking> {
        let state = read(&self.state);
        state
            .by_pnr
            .get(pnr)
            .and_then(|id| state.rows.get(id))
            .cloned()
    }

    fn contains_pnr(&self, pnr: &Pnr) -> bool {
        read(&self.state).by_pnr.contains_key(pnr)
    }

    fn list_for_user(&self, user_id: UserId) -> Vec<Booking> {
        let state = read(&self.state);
        state.collect(state.by_user.get(&user_id))
    }

    fn list_all(&self) -> Vec<Booking> {
        read(&self.state).rows.values().cloned().collect()
    }

    fn confirmed_seats(&self, train_id: TrainId) -> u32 {
        read(&self.state)
            .confirmed_on(train_id)
            .map(|booking| booking.passengers_count)
            .sum()
    }

    fn active_count(&self, train_id: TrainId) -> usize {
        read(&self.state).confirmed_on(train_id).count()
    }

    fn restore(&self, rows: Vec<Booking>) -> Result<(), LedgerError> {
        let mut fresh = LedgerState::default();
        for row in rows {
            if fresh.rows.contains_key(&row.booking_id) {
                return Err(LedgerError::DuplicateBooking(row.booking_id));
            }
            if fresh.by_pnr.contains_key(&row.pnr_number) {
                return Err(LedgerError::DuplicatePnr(row.pnr_number));
            }
            fresh.index(row);
        }
        *write(&self.state) = fresh;
        Ok(())
    }
}
