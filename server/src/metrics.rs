//! Business metrics for the reservation platform.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `railbook_bookings_total{status}` - Bookings confirmed and cancelled
//! - `railbook_bookings_rejected_total{reason}` - Failed booking attempts by reason
//! - `railbook_seats_booked_total` - Passenger seats sold
//! - `railbook_trains_total{op}` - Admin train operations (created, updated, deleted)
//!
//! ## Gauges
//! - `railbook_seats_available{train}` - Unsold seats per train
//!
//! ## Histograms
//! - `railbook_booking_duration_seconds` - Time spent handling a booking request

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use railbook_core::{Booking, Train, TrainId};
use std::time::Duration;

/// Histogram buckets for request latencies, in seconds.
const LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Register all metric descriptions.
///
/// Call once at startup, before any metric is recorded.
pub fn register_business_metrics() {
    describe_counter!(
        "railbook_bookings_total",
        "Total bookings by status (confirmed, cancelled)"
    );
    describe_counter!(
        "railbook_bookings_rejected_total",
        "Booking attempts rejected, by reason"
    );
    describe_counter!(
        "railbook_seats_booked_total",
        "Total passenger seats sold"
    );
    describe_counter!(
        "railbook_trains_total",
        "Admin train operations by kind (created, updated, deleted)"
    );
    describe_gauge!(
        "railbook_seats_available",
        "Unsold seats per train"
    );
    describe_histogram!(
        "railbook_booking_duration_seconds",
        "Time taken to handle a booking request"
    );

    tracing::info!("Business metrics registered");
}

/// Install the Prometheus recorder and return its render handle.
///
/// # Errors
///
/// Fails if the bucket configuration is rejected or a global recorder is
/// already installed.
pub fn install_recorder() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            LATENCY_BUCKETS,
        )?
        .install_recorder()?;
    register_business_metrics();
    Ok(handle)
}

// ============================================================================
// Metric Recording Functions
// ============================================================================

/// Record a confirmed booking.
pub fn record_booking_confirmed(booking: &Booking) {
    metrics::counter!("railbook_bookings_total", "status" => "confirmed").increment(1);
    metrics::counter!("railbook_seats_booked_total")
        .increment(u64::from(booking.passengers_count));
    tracing::debug!(
        booking_id = %booking.booking_id,
        passengers = booking.passengers_count,
        "Recorded booking_confirmed metric"
    );
}

/// Record a cancelled booking.
pub fn record_booking_cancelled() {
    metrics::counter!("railbook_bookings_total", "status" => "cancelled").increment(1);
}

/// Record a rejected booking attempt.
///
/// # Arguments
///
/// * `reason` - Short label such as `insufficient_seats` or `validation`
pub fn record_booking_rejected(reason: &'static str) {
    metrics::counter!("railbook_bookings_rejected_total", "reason" => reason).increment(1);
    tracing::debug!(reason, "Recorded booking_rejected metric");
}

/// Record how long a booking request took, whatever its outcome.
pub fn record_booking_duration(elapsed: Duration) {
    metrics::histogram!("railbook_booking_duration_seconds").record(elapsed.as_secs_f64());
}

/// Record an admin train operation.
///
/// # Arguments
///
/// * `op` - `created`, `updated` or `deleted`
pub fn record_train_op(op: &'static str) {
    metrics::counter!("railbook_trains_total", "op" => op).increment(1);
}

/// Publish a train's unsold seat count.
pub fn record_seats_available(train: &Train) {
    metrics::gauge!("railbook_seats_available", "train" => train.train_id.to_string())
        .set(f64::from(train.available_seats));
}

/// Zero the gauge of a removed train.
pub fn clear_seats_available(train_id: TrainId) {
    metrics::gauge!("railbook_seats_available", "train" => train_id.to_string()).set(0.0);
}
