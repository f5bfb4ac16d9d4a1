//! Reference data endpoints.
//!
//! - GET /stations - Distinct origin and terminal stations
//! - GET /railways - Railway operators

use crate::server::state::AppState;
use axum::{Json, extract::State};
use railbook_core::Stations;
use serde::{Deserialize, Serialize};

/// Railway operator as listed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RailwayResponse {
    /// Operator ID
    pub railway_id: u64,
    /// Display name
    pub railway_name: String,
}

/// Distinct stations, sorted.
pub async fn list_stations(State(state): State<AppState>) -> Json<Stations> {
    Json(state.system.stations())
}

/// Railway operators, ordered by id.
pub async fn list_railways(State(state): State<AppState>) -> Json<Vec<RailwayResponse>> {
    let railways = state
        .system
        .railways()
        .into_iter()
        .map(|railway| RailwayResponse {
            railway_id: railway.railway_id.get(),
            railway_name: railway.railway_name,
        })
        .collect();
    Json(railways)
}
