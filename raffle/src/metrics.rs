//! Business metrics for the raffle desk.
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! binary installs a recorder.
//!
//! ## Counters
//! - `raffle_reservations_total{status}` - Reservations by outcome (succeeded, failed)
//! - `raffle_tickets_sold_total` - Tickets sold through reservations
//! - `raffle_theme_requests_total{outcome}` - Themed copy requests (content, unavailable)
//!
//! ## Gauges
//! - `raffle_tickets_available` - Tickets still available

use metrics::{describe_counter, describe_gauge};

/// Registers all metric descriptions. Call once at startup.
pub fn register_raffle_metrics() {
    describe_counter!(
        "raffle_reservations_total",
        "Total number of reservations by status (succeeded, failed)"
    );
    describe_counter!("raffle_tickets_sold_total", "Total number of tickets sold");
    describe_counter!(
        "raffle_theme_requests_total",
        "Themed copy requests by outcome (content, unavailable)"
    );
    describe_gauge!(
        "raffle_tickets_available",
        "Current number of available tickets"
    );

    tracing::info!("Raffle metrics registered");
}

/// Records the outcome of a reservation and the tickets it sold
pub fn record_reservation(succeeded: bool, sold: usize) {
    let status = if succeeded { "succeeded" } else { "failed" };
    metrics::counter!("raffle_reservations_total", "status" => status).increment(1);
    if sold > 0 {
        metrics::counter!("raffle_tickets_sold_total")
            .increment(u64::try_from(sold).unwrap_or(u64::MAX));
    }
    tracing::debug!(status, sold, "Recorded reservation metric");
}

/// Records how many tickets are still available
#[allow(clippy::cast_precision_loss)]
pub fn record_available(available: usize) {
    metrics::gauge!("raffle_tickets_available").set(available as f64);
}

/// Records the outcome of a themed copy request
pub fn record_theme_request(outcome: &'static str) {
    metrics::counter!("raffle_theme_requests_total", "outcome" => outcome).increment(1);
    tracing::debug!(outcome, "Recorded theme request metric");
}
