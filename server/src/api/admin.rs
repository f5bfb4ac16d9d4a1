//! Admin listing endpoints. Every route requires `X-User-Role: admin`.
//!
//! - GET /admin/trains - Every train, bookable or not
//! - GET /admin/bookings - Every booking, newest first
//! - GET /admin/audit - Trains whose seat counter disagrees with the ledger

use crate::api::bookings::{BookingResponse, with_trains};
use crate::api::trains::TrainResponse;
use crate::server::state::AppState;
use axum::{Json, extract::State};
use railbook_core::SeatDiscrepancy;
use railbook_web::AdminCaller;
use serde::{Deserialize, Serialize};

/// One audit finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscrepancyResponse {
    /// Train ID
    pub train_id: u64,
    /// Seat capacity
    pub total_seats: u32,
    /// Counter value found
    pub available_seats: u32,
    /// Seats held by confirmed bookings
    pub confirmed_seats: u32,
    /// Counter value the ledger implies
    pub expected_available_seats: u32,
}

impl From<SeatDiscrepancy> for DiscrepancyResponse {
    fn from(found: SeatDiscrepancy) -> Self {
        Self {
            train_id: found.train_id.get(),
            total_seats: found.total_seats,
            available_seats: found.available_seats,
            confirmed_seats: found.confirmed_seats,
            expected_available_seats: found.expected_available(),
        }
    }
}

/// Every train with live seat counts.
pub async fn list_trains(
    State(state): State<AppState>,
    _admin: AdminCaller,
) -> Json<Vec<TrainResponse>> {
    let trains = state.system.admin().list_trains();
    Json(trains.into_iter().map(TrainResponse::from).collect())
}

/// Every booking in the ledger, newest first.
pub async fn list_bookings(
    State(state): State<AppState>,
    _admin: AdminCaller,
) -> Json<Vec<BookingResponse>> {
    let mut bookings = state.system.engine().all_bookings();
    bookings.sort_by(|a, b| {
        b.booking_date
            .cmp(&a.booking_date)
            .then(b.booking_id.cmp(&a.booking_id))
    });
    Json(with_trains(&state, bookings))
}

/// Recount confirmed seats per train and report mismatches. An empty list
/// means the seat invariant holds everywhere.
pub async fn audit(
    State(state): State<AppState>,
    AdminCaller(caller): AdminCaller,
) -> Json<Vec<DiscrepancyResponse>> {
    let findings = state.system.engine().audit();
    if findings.is_empty() {
        tracing::debug!(admin = %caller.user_id, "Seat audit clean");
    } else {
        tracing::error!(
            admin = %caller.user_id,
            discrepancies = findings.len(),
            "Seat audit found discrepancies"
        );
    }
    Json(findings.into_iter().map(DiscrepancyResponse::from).collect())
}
