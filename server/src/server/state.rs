//! Application state for the Railbook HTTP server.

use axum::extract::FromRef;
use metrics_exporter_prometheus::PrometheusHandle;
use railbook_core::ReservationSystem;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Cloned (cheaply via `Arc`) for each request.
#[derive(Clone)]
pub struct AppState {
    /// Catalog, seat inventory, ledger and the operations over them
    pub system: Arc<ReservationSystem>,

    /// Prometheus render handle; `None` when metrics are disabled
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub const fn new(system: Arc<ReservationSystem>, metrics: Option<PrometheusHandle>) -> Self {
        Self { system, metrics }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("system", &self.system)
            .field("metrics_enabled", &self.metrics.is_some())
            .finish()
    }
}

// Lets shared handlers such as `readiness` take the system directly.
impl FromRef<AppState> for Arc<ReservationSystem> {
    fn from_ref(app_state: &AppState) -> Self {
        Arc::clone(&app_state.system)
    }
}
