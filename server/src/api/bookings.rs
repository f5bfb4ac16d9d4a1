//! Booking API endpoints.
//!
//! - POST /bookings - Book seats on a train
//! - GET /bookings - The caller's bookings, newest first, with the train embedded
//! - GET /bookings/:id - One booking (owner or admin)
//! - GET /bookings/pnr/:pnr - Look a booking up by PNR (owner or admin)
//! - POST /bookings/:id/cancel - Cancel a booking and release its seats

use crate::api::trains::TrainResponse;
use crate::metrics;
use crate::server::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use railbook_core::{
    Booking, BookingId, BookingRequest, BookingStatus, PaymentMethod, PaymentStatus, Train,
    TrainId,
};
use railbook_web::{ApiJson, ApiPath, AppError, Caller};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Body of `POST /bookings`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateBookingRequest {
    /// Train to book on
    pub train_id: u64,
    /// Party size
    pub passengers_count: u32,
    /// How the traveler pays; omitted leaves the booking pending payment
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
}

/// Booking as returned to clients. Amounts are decimal rupees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingResponse {
    /// Booking ID
    pub booking_id: u64,
    /// Passenger Name Record
    pub pnr_number: String,
    /// Owner
    pub user_id: u64,
    /// Train booked on
    pub train_id: u64,
    /// Party size
    pub passengers_count: u32,
    /// Fare total, frozen at booking time
    pub total_amount: f64,
    /// Lifecycle status
    pub booking_status: BookingStatus,
    /// Payment state
    pub payment_status: PaymentStatus,
    /// Payment method
    pub payment_method: Option<PaymentMethod>,
    /// Settlement reference
    pub transaction_id: Option<String>,
    /// When the booking was made
    pub booking_date: DateTime<Utc>,
    /// When the booking was cancelled
    pub cancelled_at: Option<DateTime<Utc>>,
    /// The train, if it still exists
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub train: Option<TrainResponse>,
}

impl BookingResponse {
    /// Attach train details.
    #[must_use]
    pub fn with_train(mut self, train: Option<Train>) -> Self {
        self.train = train.map(TrainResponse::from);
        self
    }
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            booking_id: booking.booking_id.get(),
            pnr_number: booking.pnr_number.as_str().to_string(),
            user_id: booking.user_id.get(),
            train_id: booking.train_id.get(),
            passengers_count: booking.passengers_count,
            total_amount: booking.total_amount.as_major_decimal(),
            booking_status: booking.booking_status,
            payment_status: booking.payment_status,
            payment_method: booking.payment_method,
            transaction_id: booking.transaction_id,
            booking_date: booking.booking_date,
            cancelled_at: booking.cancelled_at,
            train: None,
        }
    }
}

/// Embed the current train into each booking.
pub(crate) fn with_trains(state: &AppState, bookings: Vec<Booking>) -> Vec<BookingResponse> {
    let trains: HashMap<TrainId, Train> = state
        .system
        .admin()
        .list_trains()
        .into_iter()
        .map(|train| (train.train_id, train))
        .collect();
    bookings
        .into_iter()
        .map(|booking| {
            let train = trains.get(&booking.train_id).cloned();
            BookingResponse::from(booking).with_train(train)
        })
        .collect()
}

// ============================================================================
// Handlers
// ============================================================================

/// Book seats.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8000/bookings \
///   -H "X-User-Id: 7" \
///   -H "Content-Type: application/json" \
///   -d '{"train_id": 1, "passengers_count": 2, "payment_method": "upi"}'
/// ```
///
/// # Errors
///
/// - 400 for a bad party size or a train that no longer takes bookings
/// - 404 for an unknown train
/// - 409 when not enough seats remain
pub async fn create_booking(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(request): ApiJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let started = Instant::now();
    let outcome = state.system.engine().create_booking(&BookingRequest {
        user_id: caller.user_id,
        train_id: TrainId::new(request.train_id),
        passengers_count: request.passengers_count,
        payment_method: request.payment_method,
    });
    metrics::record_booking_duration(started.elapsed());

    let booking = outcome.inspect_err(|err| metrics::record_booking_rejected(err.reason()))?;
    metrics::record_booking_confirmed(&booking);

    let train = state.system.train(booking.train_id);
    if let Some(train) = &train {
        metrics::record_seats_available(train);
    }
    Ok((
        StatusCode::CREATED,
        Json(BookingResponse::from(booking).with_train(train)),
    ))
}

/// List the caller's bookings, newest first.
pub async fn list_my_bookings(
    State(state): State<AppState>,
    caller: Caller,
) -> Json<Vec<BookingResponse>> {
    let mut bookings = state.system.engine().bookings_for(caller.user_id);
    bookings.sort_by(|a, b| {
        b.booking_date
            .cmp(&a.booking_date)
            .then(b.booking_id.cmp(&a.booking_id))
    });
    Json(with_trains(&state, bookings))
}

/// Get one booking.
///
/// # Errors
///
/// 404 for an unknown booking, 403 if the caller does not own it.
pub async fn get_booking(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(booking_id): ApiPath<u64>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = state
        .system
        .engine()
        .booking(BookingId::new(booking_id), &caller.requester())?;
    let train = state.system.train(booking.train_id);
    Ok(Json(BookingResponse::from(booking).with_train(train)))
}

/// Look a booking up by PNR.
///
/// # Errors
///
/// 400 for a malformed PNR, 404 if none matches, 403 if the caller does
/// not own it.
pub async fn get_booking_by_pnr(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(pnr): ApiPath<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = state
        .system
        .engine()
        .booking_by_pnr(&pnr, &caller.requester())?;
    let train = state.system.train(booking.train_id);
    Ok(Json(BookingResponse::from(booking).with_train(train)))
}

/// Cancel a booking and release its seats.
///
/// # Errors
///
/// 404 for an unknown booking, 403 if the caller neither owns it nor is
/// an admin, 409 if it was already cancelled.
pub async fn cancel_booking(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(booking_id): ApiPath<u64>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = state
        .system
        .engine()
        .cancel_booking(BookingId::new(booking_id), &caller.requester())?;
    metrics::record_booking_cancelled();

    let train = state.system.train(booking.train_id);
    if let Some(train) = &train {
        metrics::record_seats_available(train);
    }
    Ok(Json(BookingResponse::from(booking).with_train(train)))
}
