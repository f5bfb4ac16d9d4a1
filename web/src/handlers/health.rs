//! Health check endpoints.
//!
//! These endpoints are used by load balancers and monitoring systems
//! to verify service health.

use axum::{Json, extract::State, http::StatusCode};
use railbook_core::ReservationSystem;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Simple health check endpoint (for basic liveness).
///
/// Returns 200 OK to indicate the process is serving requests. Nothing
/// else is checked.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Readiness report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Readiness {
    /// `ready` or `degraded`
    pub status: String,
    /// Trains in the catalog
    pub trains: usize,
    /// Trains whose seat counter disagrees with the ledger
    pub seat_discrepancies: usize,
}

/// Readiness check backed by a seat audit.
///
/// Returns 503 if any train's seat counter disagrees with its confirmed
/// bookings, so a corrupted instance is taken out of rotation.
///
/// # Endpoint
///
/// ```text
/// GET /ready
/// ```
///
/// # Response
///
/// ```json
/// { "status": "ready", "trains": 3, "seat_discrepancies": 0 }
/// ```
#[allow(clippy::unused_async)]
pub async fn readiness(
    State(system): State<Arc<ReservationSystem>>,
) -> (StatusCode, Json<Readiness>) {
    let discrepancies = system.engine().audit();
    let trains = system.admin().list_trains().len();

    let (status, label) = if discrepancies.is_empty() {
        (StatusCode::OK, "ready")
    } else {
        tracing::error!(
            discrepancies = discrepancies.len(),
            "Seat audit failed; reporting not ready"
        );
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status,
        Json(Readiness {
            status: label.to_string(),
            trains,
            seat_discrepancies: discrepancies.len(),
        }),
    )
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use railbook_testing::helpers::system_with_train;

    #[tokio::test]
    async fn test_simple_health_check() {
        let (status, body) = health_check().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn test_readiness_reports_trains() {
        let (system, _train) = system_with_train(10, 500);
        let (status, Json(report)) = readiness(State(Arc::new(system))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(report.status, "ready");
        assert_eq!(report.trains, 1);
        assert_eq!(report.seat_discrepancies, 0);
    }
}
