//! Injected dependencies for the reservation core.
//!
//! Time and PNR issuance are abstracted behind traits so tests can pin
//! them down; tunables travel in [`ReservationPolicy`].

use crate::pnr::{PnrGenerator, RandomPnrGenerator};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Clock trait - abstracts time operations for testability
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Limits applied to booking requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationPolicy {
    /// Largest party a single booking may carry
    pub max_passengers_per_booking: u32,
    /// How many fresh PNRs to draw before giving up on a collision streak
    pub pnr_max_attempts: u32,
}

impl Default for ReservationPolicy {
    fn default() -> Self {
        Self {
            max_passengers_per_booking: 6,
            pnr_max_attempts: 8,
        }
    }
}

/// Environment dependencies shared by the engine and the admin manager.
#[derive(Clone)]
pub struct ReservationEnvironment {
    /// Clock for timestamps
    pub clock: Arc<dyn Clock>,
    /// Source of candidate PNRs
    pub pnr: Arc<dyn PnrGenerator>,
    /// Booking limits
    pub policy: ReservationPolicy,
}

impl ReservationEnvironment {
    /// Creates a new `ReservationEnvironment`
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        pnr: Arc<dyn PnrGenerator>,
        policy: ReservationPolicy,
    ) -> Self {
        Self { clock, pnr, policy }
    }

    /// System clock, random PNRs and the given policy
    #[must_use]
    pub fn production(policy: ReservationPolicy) -> Self {
        Self::new(Arc::new(SystemClock), Arc::new(RandomPnrGenerator), policy)
    }
}

impl Default for ReservationEnvironment {
    fn default() -> Self {
        Self::production(ReservationPolicy::default())
    }
}

impl std::fmt::Debug for ReservationEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReservationEnvironment")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
