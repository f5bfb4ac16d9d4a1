//! Train API endpoints.
//!
//! - GET /trains?source&destination&date - Search bookable trains
//! - GET /trains/:id - One train with live seat counts
//! - POST /trains - Create a train (admin)
//! - PUT /trains/:id - Replace a train's details, capacity or status (admin)
//! - DELETE /trains/:id - Remove a train with no active bookings (admin)

use crate::metrics;
use crate::server::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, NaiveDate, Utc};
use railbook_core::{
    Money, RailwayId, Train, TrainDraft, TrainId, TrainQuery, TrainStatus, TrainType,
};
use railbook_web::{AdminCaller, ApiJson, ApiPath, ApiQuery, AppError};
use serde::{Deserialize, Serialize};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Train as returned to clients. Fares are decimal rupees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainResponse {
    /// Train ID
    pub train_id: u64,
    /// Public train number
    pub train_number: String,
    /// Display name
    pub train_name: String,
    /// Operating railway
    pub railway_id: u64,
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
    /// Unsold seats
    pub available_seats: u32,
    /// Fare per passenger in rupees
    pub base_fare: f64,
    /// Service class
    pub train_type: TrainType,
    /// Operational status
    pub train_status: TrainStatus,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl From<Train> for TrainResponse {
    fn from(train: Train) -> Self {
        Self {
            train_id: train.train_id.get(),
            train_number: train.train_number,
            train_name: train.train_name,
            railway_id: train.railway_id.get(),
            source_station: train.source_station,
            destination_station: train.destination_station,
            departure_time: train.departure_time,
            arrival_time: train.arrival_time,
            total_seats: train.total_seats,
            available_seats: train.available_seats,
            base_fare: train.base_fare.as_major_decimal(),
            train_type: train.train_type,
            train_status: train.train_status,
            created_at: train.created_at,
        }
    }
}

/// Body of `POST /trains` and `PUT /trains/:id`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrainRequest {
    /// Public train number, unique
    pub train_number: String,
    /// Display name
    pub train_name: String,
    /// Operating railway
    pub railway_id: u64,
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
    /// Fare per passenger in rupees
    pub base_fare: f64,
    /// Service class
    #[serde(default)]
    pub train_type: TrainType,
    /// Status; omitted keeps the current one
    #[serde(default)]
    pub train_status: Option<TrainStatus>,
}

impl TrainRequest {
    /// Convert to the core draft, rejecting unrepresentable fares.
    ///
    /// # Errors
    ///
    /// Returns a 400 [`AppError`] for a negative or non-finite fare.
    pub fn into_draft(self) -> Result<TrainDraft, AppError> {
        let base_fare = Money::from_major_decimal(self.base_fare).ok_or_else(|| {
            AppError::bad_request("base_fare must be a non-negative amount")
        })?;
        Ok(TrainDraft {
            train_number: self.train_number.trim().to_string(),
            train_name: self.train_name.trim().to_string(),
            railway_id: RailwayId::new(self.railway_id),
            source_station: self.source_station.trim().to_string(),
            destination_station: self.destination_station.trim().to_string(),
            departure_time: self.departure_time,
            arrival_time: self.arrival_time,
            total_seats: self.total_seats,
            base_fare,
            train_type: self.train_type,
            train_status: self.train_status,
        })
    }
}

/// Query parameters for train search. Empty values are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    /// Origin station
    pub source: Option<String>,
    /// Terminal station
    pub destination: Option<String>,
    /// Travel date, `YYYY-MM-DD`
    pub date: Option<String>,
}

impl SearchQuery {
    fn into_query(self) -> Result<TrainQuery, AppError> {
        let date = match non_empty(self.date) {
            None => None,
            Some(raw) => Some(NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
                AppError::bad_request(format!("date '{raw}' is not a YYYY-MM-DD date"))
            })?),
        };
        Ok(TrainQuery {
            source: non_empty(self.source),
            destination: non_empty(self.destination),
            date,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ============================================================================
// Handlers
// ============================================================================

/// Search trains with unsold seats.
///
/// # Example
///
/// ```bash
/// curl 'http://localhost:8000/trains?source=New%20Delhi&destination=Mumbai%20Central&date=2025-03-01'
/// ```
///
/// # Errors
///
/// Returns 400 for an unparseable date.
pub async fn search_trains(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<SearchQuery>,
) -> Result<Json<Vec<TrainResponse>>, AppError> {
    let query = params.into_query()?;
    let trains = state.system.search_trains(&query);
    Ok(Json(trains.into_iter().map(TrainResponse::from).collect()))
}

/// Get one train.
///
/// # Errors
///
/// Returns 404 if the train does not exist.
pub async fn get_train(
    State(state): State<AppState>,
    ApiPath(train_id): ApiPath<u64>,
) -> Result<Json<TrainResponse>, AppError> {
    let train = state
        .system
        .train(TrainId::new(train_id))
        .ok_or_else(|| AppError::not_found("Train", train_id))?;
    Ok(Json(train.into()))
}

/// Create a train with every seat available.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8000/trains \
///   -H "X-User-Id: 1" -H "X-User-Role: admin" \
///   -H "Content-Type: application/json" \
///   -d '{
///     "train_number": "12951",
///     "train_name": "Mumbai Rajdhani",
///     "railway_id": 1,
///     "source_station": "Mumbai Central",
///     "destination_station": "New Delhi",
///     "departure_time": "2025-03-01T16:35:00Z",
///     "arrival_time": "2025-03-02T08:35:00Z",
///     "total_seats": 400,
///     "base_fare": 1450.0,
///     "train_type": "Superfast"
///   }'
/// ```
///
/// # Errors
///
/// 400 for invalid fields or a duplicate train number, 401/403 for
/// non-admin callers.
pub async fn create_train(
    State(state): State<AppState>,
    AdminCaller(caller): AdminCaller,
    ApiJson(request): ApiJson<TrainRequest>,
) -> Result<(StatusCode, Json<TrainResponse>), AppError> {
    let draft = request.into_draft()?;
    let train = state.system.admin().create_train(&draft)?;
    tracing::info!(admin = %caller.user_id, train_id = %train.train_id, "Admin created train");
    metrics::record_train_op("created");
    metrics::record_seats_available(&train);
    Ok((StatusCode::CREATED, Json(train.into())))
}

/// Replace a train's details. Capacity changes are checked against booked
/// seats; a status of `cancelled` or `completed` closes the train to new
/// bookings.
///
/// # Errors
///
/// 404 for an unknown train, 400 for invalid fields, 409 when the new
/// capacity is below the seats already booked.
pub async fn update_train(
    State(state): State<AppState>,
    AdminCaller(caller): AdminCaller,
    ApiPath(train_id): ApiPath<u64>,
    ApiJson(request): ApiJson<TrainRequest>,
) -> Result<Json<TrainResponse>, AppError> {
    let draft = request.into_draft()?;
    let train = state
        .system
        .admin()
        .update_train(TrainId::new(train_id), &draft)?;
    tracing::info!(admin = %caller.user_id, train_id, "Admin updated train");
    metrics::record_train_op("updated");
    metrics::record_seats_available(&train);
    Ok(Json(train.into()))
}

/// Delete a train.
///
/// # Errors
///
/// 404 for an unknown train, 409 while confirmed bookings reference it.
pub async fn delete_train(
    State(state): State<AppState>,
    AdminCaller(caller): AdminCaller,
    ApiPath(train_id): ApiPath<u64>,
) -> Result<StatusCode, AppError> {
    let train_id = TrainId::new(train_id);
    state.system.admin().delete_train(train_id)?;
    tracing::info!(admin = %caller.user_id, train_id = %train_id, "Admin deleted train");
    metrics::record_train_op("deleted");
    metrics::clear_seats_available(train_id);
    Ok(StatusCode::NO_CONTENT)
}
