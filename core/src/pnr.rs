//! PNR and settlement-reference issuance.

use crate::types::{PNR_LENGTH, Pnr};
use rand::RngCore;
use std::fmt::Write;

/// Produces candidate PNRs. Uniqueness is enforced by the caller against
/// the ledger, so implementations only need to spread their output.
pub trait PnrGenerator: Send + Sync {
    /// Draw the next candidate
    fn generate(&self) -> Pnr;
}

/// Draws PNRs from the thread-local CSPRNG: 40 bits, rendered as 10
/// uppercase hex characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomPnrGenerator;

impl PnrGenerator for RandomPnrGenerator {
    fn generate(&self) -> Pnr {
        let mut bytes = [0u8; PNR_LENGTH / 2];
        rand::thread_rng().fill_bytes(&mut bytes);
        Pnr::from_bytes(bytes)
    }
}

/// Settlement reference recorded when a booking is paid: `TXN` followed by
/// 16 uppercase hex characters.
#[must_use]
pub fn transaction_id() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);

    let mut id = String::with_capacity(19);
    id.push_str("TXN");
    for byte in bytes {
        let _ = write!(id, "{byte:02X}");
    }
    id
}
