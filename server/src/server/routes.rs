//! Router configuration for the Railbook server.

use super::state::AppState;
use crate::api::{admin, bookings, stations, trains};
use axum::{
    Router,
    extract::State,
    http::{HeaderName, HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use railbook_web::handlers::{health_check, readiness};
use railbook_web::middleware::correlation_id_layer;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

/// Build the complete Axum router.
///
/// Routes:
/// - Health: `/health`, `/ready`
/// - Public: `/trains` search, `/trains/:id`, `/stations`, `/railways`
/// - Travelers: `/bookings` and below (needs `X-User-Id`)
/// - Admins: train writes and `/admin/*` (needs `X-User-Role: admin`)
/// - `/metrics` when a Prometheus handle is present
///
/// Every request gets a correlation id span, `tower-http` tracing and CORS
/// for `cors_origins`.
pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    let mut router = Router::new()
        // Health checks
        .route("/health", get(health_check))
        .route("/ready", get(readiness))
        // Trains
        .route(
            "/trains",
            get(trains::search_trains).post(trains::create_train),
        )
        .route(
            "/trains/:id",
            get(trains::get_train)
                .put(trains::update_train)
                .delete(trains::delete_train),
        )
        .route("/stations", get(stations::list_stations))
        .route("/railways", get(stations::list_railways))
        // Bookings
        .route(
            "/bookings",
            get(bookings::list_my_bookings).post(bookings::create_booking),
        )
        .route("/bookings/pnr/:pnr", get(bookings::get_booking_by_pnr))
        .route("/bookings/:id", get(bookings::get_booking))
        .route("/bookings/:id/cancel", post(bookings::cancel_booking))
        // Admin views
        .route("/admin/trains", get(admin::list_trains))
        .route("/admin/bookings", get(admin::list_bookings))
        .route("/admin/audit", get(admin::audit));

    if state.metrics.is_some() {
        router = router.route("/metrics", get(render_metrics));
    }

    router
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .with_state(state)
}

async fn render_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let correlation = HeaderName::from_static("x-correlation-id");
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-user-id"),
            HeaderName::from_static("x-user-role"),
            correlation.clone(),
        ])
        .expose_headers([correlation])
}
