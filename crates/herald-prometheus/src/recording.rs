// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.

use metrics::{describe_counter, describe_gauge, describe_histogram};

/// Register all Herald metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "herald_notifications_ingested_total",
        "Notifications accepted at ingress"
    );
    describe_counter!(
        "herald_notifications_published_total",
        "Payloads handed to a route publisher"
    );
    describe_counter!(
        "herald_dispatch_failures_total",
        "Terminal failure statuses written by pipeline step"
    );
    describe_counter!("herald_bus_events_total", "Events emitted on the bus");
    describe_counter!("herald_bus_retries_total", "Handler redeliveries");
    describe_counter!(
        "herald_bus_dropped_total",
        "Events abandoned after the final attempt"
    );
    describe_histogram!(
        "herald_handler_duration_seconds",
        "Handler execution time in seconds"
    );
    describe_gauge!("herald_bus_in_flight", "Events queued or running");
}

/// Record an accepted notification. `direction` is `out` or `in`.
pub fn record_ingested(direction: &'static str) {
    metrics::counter!("herald_notifications_ingested_total", "direction" => direction)
        .increment(1);
}

pub fn record_published() {
    metrics::counter!("herald_notifications_published_total").increment(1);
}

pub fn record_dispatch_failure(step: &str) {
    metrics::counter!("herald_dispatch_failures_total", "step" => step.to_string()).increment(1);
}

pub fn record_bus_event(event: &str) {
    metrics::counter!("herald_bus_events_total", "event" => event.to_string()).increment(1);
}

pub fn record_bus_retry(event: &str) {
    metrics::counter!("herald_bus_retries_total", "event" => event.to_string()).increment(1);
}

pub fn record_bus_dropped(event: &str) {
    metrics::counter!("herald_bus_dropped_total", "event" => event.to_string()).increment(1);
}

pub fn record_handler_duration(event: &str, seconds: f64) {
    metrics::histogram!("herald_handler_duration_seconds", "event" => event.to_string())
        .record(seconds);
}

pub fn set_bus_in_flight(count: f64) {
    metrics::gauge!("herald_bus_in_flight").set(count);
}
