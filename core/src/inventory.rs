//! Seat inventory: the live count of unsold seats on every train.
//!
//! This component is CRITICAL for preventing overselling. It is the only code
//! that mutates seat counts, and every mutation happens inside a per-train
//! critical section.
//!
//! # Concurrency Strategy
//!
//! ```text
//! slots: RwLock<HashMap<TrainId, Arc<SeatSlot>>>     (write-locked only to add/remove trains)
//!                         │
//!                         ▼
//! SeatSlot { counter: Mutex<SeatCounter>, published: AtomicU64 }
//!            ─────────────────────────    ──────────────────────
//!            check-and-decrement under    lock-free mirror for
//!            the train's own mutex        search (may be stale)
//! ```
//!
//! Different trains never contend. [`SeatInventory::transact`] runs a closure
//! inside the train's critical section so callers can pair a seat change with
//! a ledger write; if the closure fails, every seat change it made is rolled
//! back before the lock is released.

use crate::error::{ReservationError, Result};
use crate::sync::{lock, read, write};
use crate::types::TrainId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

/// Point-in-time seat counts for one train.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatSnapshot {
    /// Capacity
    pub total: u32,
    /// Unsold seats
    pub available: u32,
    /// Whether reservations are currently accepted
    pub bookable: bool,
}

impl SeatSnapshot {
    /// Seats committed to confirmed bookings
    #[must_use]
    pub const fn booked(&self) -> u32 {
        self.total - self.available
    }
}

/// Proof that seats were taken. Returned by a successful reservation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use = "reserved seats must be paired with a ledger entry or released"]
pub struct ReservationToken {
    train_id: TrainId,
    seats: u32,
}

impl ReservationToken {
    /// Train the seats were taken on
    #[must_use]
    pub const fn train_id(&self) -> TrainId {
        self.train_id
    }

    /// Number of seats taken
    #[must_use]
    pub const fn seats(&self) -> u32 {
        self.seats
    }
}

#[derive(Clone, Copy, Debug)]
struct SeatCounter {
    total: u32,
    available: u32,
    bookable: bool,
    retired: bool,
}

impl SeatCounter {
    const fn snapshot(&self) -> SeatSnapshot {
        SeatSnapshot {
            total: self.total,
            available: self.available,
            bookable: self.bookable,
        }
    }
}

const BOOKABLE_BIT: u64 = 1 << 63;
const COUNT_MASK: u64 = u32::MAX as u64;

fn pack(counter: &SeatCounter) -> u64 {
    let flag = if counter.bookable { BOOKABLE_BIT } else { 0 };
    flag | (u64::from(counter.total & 0x7fff_ffff) << 32) | u64::from(counter.available)
}

#[allow(clippy::cast_possible_truncation)]
const fn unpack(bits: u64) -> SeatSnapshot {
    SeatSnapshot {
        total: ((bits >> 32) & 0x7fff_ffff) as u32,
        available: (bits & COUNT_MASK) as u32,
        bookable: bits & BOOKABLE_BIT != 0,
    }
}

#[derive(Debug)]
struct SeatSlot {
    counter: Mutex<SeatCounter>,
    published: AtomicU64,
}

impl SeatSlot {
    fn new(counter: SeatCounter) -> Self {
        Self {
            published: AtomicU64::new(pack(&counter)),
            counter: Mutex::new(counter),
        }
    }
}

/// Largest capacity a train may register; the lock-free mirror packs the
/// total into 31 bits.
pub const MAX_SEATS: u32 = 0x7fff_ffff;

/// Seat operations available inside a train's critical section.
pub struct SeatTxn<'a> {
    train_id: TrainId,
    counter: &'a mut SeatCounter,
}

impl SeatTxn<'_> {
    /// Train this transaction is scoped to
    #[must_use]
    pub const fn train_id(&self) -> TrainId {
        self.train_id
    }

    /// Current counts, as seen inside the critical section
    #[must_use]
    pub const fn snapshot(&self) -> SeatSnapshot {
        self.counter.snapshot()
    }

    /// Takes `seats` seats in one check-and-decrement step.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::Validation`] for a zero count or a train not
    ///   accepting bookings
    /// - [`ReservationError::InsufficientSeats`] if fewer than `seats` remain
    pub fn reserve(&mut self, seats: u32) -> Result<ReservationToken> {
        if seats == 0 {
            return Err(ReservationError::validation("must reserve at least one seat"));
        }
        if !self.counter.bookable {
            return Err(ReservationError::validation(format!(
                "train {} is not accepting bookings",
                self.train_id
            )));
        }
        if self.counter.available < seats {
            return Err(ReservationError::InsufficientSeats {
                train_id: self.train_id,
                requested: seats,
                available: self.counter.available,
            });
        }
        self.counter.available -= seats;
        Ok(ReservationToken {
            train_id: self.train_id,
            seats,
        })
    }

    /// Returns `seats` seats to the pool, never exceeding capacity.
    ///
    /// Returns the number of seats actually released; anything less than
    /// `seats` means a double release was absorbed.
    pub fn release(&mut self, seats: u32) -> u32 {
        let headroom = self.counter.total - self.counter.available;
        let released = seats.min(headroom);
        if released < seats {
            tracing::warn!(
                train_id = %self.train_id,
                requested = seats,
                released,
                "Seat release clamped at capacity"
            );
        }
        self.counter.available += released;
        released
    }

    /// Changes capacity, keeping the number of booked seats fixed.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::CapacityBelowBooked`] if `new_total` is smaller
    ///   than the seats already committed
    /// - [`ReservationError::Validation`] if `new_total` exceeds [`MAX_SEATS`]
    pub fn adjust_capacity(&mut self, new_total: u32) -> Result<()> {
        if new_total > MAX_SEATS {
            return Err(ReservationError::validation(format!(
                "total_seats must not exceed {MAX_SEATS}"
            )));
        }
        let booked = self.counter.total - self.counter.available;
        if new_total < booked {
            return Err(ReservationError::CapacityBelowBooked {
                train_id: self.train_id,
                requested_total: new_total,
                booked,
            });
        }
        self.counter.total = new_total;
        self.counter.available = new_total - booked;
        Ok(())
    }

    /// Opens or closes the train for new reservations
    pub const fn set_bookable(&mut self, bookable: bool) {
        self.counter.bookable = bookable;
    }

    /// Marks the train as gone. Once the transaction commits, the slot is
    /// removed and later calls fail with [`ReservationError::TrainNotFound`].
    pub const fn retire(&mut self) {
        self.counter.retired = true;
        self.counter.bookable = false;
    }
}

/// Owner of every train's available-seat counter.
#[derive(Debug, Default)]
pub struct SeatInventory {
    slots: RwLock<HashMap<TrainId, Arc<SeatSlot>>>,
}

impl SeatInventory {
    /// Creates an empty inventory
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking a new train with every seat available.
    ///
    /// # Errors
    ///
    /// - [`ReservationError::Conflict`] if the train is already tracked
    /// - [`ReservationError::Validation`] if `total` exceeds [`MAX_SEATS`]
    pub fn register(&self, train_id: TrainId, total: u32, bookable: bool) -> Result<SeatSnapshot> {
        self.restore(train_id, total, 0, bookable)
    }

    /// Starts tracking a train that already has `booked` seats committed.
    ///
    /// # Errors
    ///
    /// As [`SeatInventory::register`], plus
    /// [`ReservationError::CapacityBelowBooked`] if `booked > total`.
    pub fn restore(
        &self,
        train_id: TrainId,
        total: u32,
        booked: u32,
        bookable: bool,
    ) -> Result<SeatSnapshot> {
        if total > MAX_SEATS {
            return Err(ReservationError::validation(format!(
                "total_seats must not exceed {MAX_SEATS}"
            )));
        }
        if booked > total {
            return Err(ReservationError::CapacityBelowBooked {
                train_id,
                requested_total: total,
                booked,
            });
        }
        let counter = SeatCounter {
            total,
            available: total - booked,
            bookable,
            retired: false,
        };
        let mut slots = write(&self.slots);
        if slots.contains_key(&train_id) {
            return Err(ReservationError::Conflict(format!(
                "seat inventory for train {train_id} already exists"
            )));
        }
        slots.insert(train_id, Arc::new(SeatSlot::new(counter)));
        Ok(counter.snapshot())
    }

    /// Runs `f` inside the train's critical section.
    ///
    /// No other seat operation on the same train can interleave with `f`.
    /// If `f` returns an error, every seat change it made is undone before
    /// the lock is released, so failures leave counts exactly as they were.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::TrainNotFound`] if the train is not
    /// tracked (or was retired), otherwise whatever `f` returns.
    pub fn transact<T, F>(&self, train_id: TrainId, f: F) -> Result<T>
    where
        F: FnOnce(&mut SeatTxn<'_>) -> Result<T>,
    {
        let slot = self.slot(train_id)?;
        let mut counter = lock(&slot.counter);
        if counter.retired {
            return Err(ReservationError::TrainNotFound(train_id));
        }

        let before = *counter;
        let outcome = f(&mut SeatTxn {
            train_id,
            counter: &mut *counter,
        });
        if outcome.is_err() {
            *counter = before;
        }
        slot.published.store(pack(&counter), Ordering::Release);
        let retired = counter.retired;
        drop(counter);

        if retired {
            let mut slots = write(&self.slots);
            if slots
                .get(&train_id)
                .is_some_and(|current| Arc::ptr_eq(current, &slot))
            {
                slots.remove(&train_id);
            }
        }
        outcome
    }

    /// Takes `seats` seats on a train in one atomic step.
    ///
    /// # Errors
    ///
    /// See [`SeatTxn::reserve`]; also [`ReservationError::TrainNotFound`].
    pub fn reserve(&self, train_id: TrainId, seats: u32) -> Result<ReservationToken> {
        self.transact(train_id, |txn| txn.reserve(seats))
    }

    /// Returns seats to a train's pool, clamped at capacity.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::TrainNotFound`] for an untracked train.
    pub fn release(&self, train_id: TrainId, seats: u32) -> Result<u32> {
        self.transact(train_id, |txn| Ok(txn.release(seats)))
    }

    /// Changes a train's capacity without touching booked seats.
    ///
    /// # Errors
    ///
    /// See [`SeatTxn::adjust_capacity`]; also [`ReservationError::TrainNotFound`].
    pub fn adjust_capacity(&self, train_id: TrainId, new_total: u32) -> Result<SeatSnapshot> {
        self.transact(train_id, |txn| {
            txn.adjust_capacity(new_total)?;
            Ok(txn.snapshot())
        })
    }

    /// Opens or closes a train for reservations.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::TrainNotFound`] for an untracked train.
    pub fn set_bookable(&self, train_id: TrainId, bookable: bool) -> Result<()> {
        self.transact(train_id, |txn| {
            txn.set_bookable(bookable);
            Ok(())
        })
    }

    /// Stops tracking a train. Later calls fail with
    /// [`ReservationError::TrainNotFound`].
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::TrainNotFound`] for an untracked train.
    pub fn retire(&self, train_id: TrainId) -> Result<SeatSnapshot> {
        self.transact(train_id, |txn| {
            txn.retire();
            Ok(txn.snapshot())
        })
    }

    /// Lock-free read of a train's counts. May trail an in-flight
    /// reservation but is never torn.
    #[must_use]
    pub fn snapshot(&self, train_id: TrainId) -> Option<SeatSnapshot> {
        read(&self.slots)
            .get(&train_id)
            .map(|slot| unpack(slot.published.load(Ordering::Acquire)))
    }

    /// Ids of every tracked train
    #[must_use]
    pub fn train_ids(&self) -> Vec<TrainId> {
        let mut ids: Vec<TrainId> = read(&self.slots).keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn slot(&self, train_id: TrainId) -> Result<Arc<SeatSlot>> {
        read(&self.slots)
            .get(&train_id)
            .cloned()
            .ok_or(ReservationError::TrainNotFound(train_id))
    }
}
