// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus metrics adapter for the Herald notification service.
//!
//! Uses the metrics-rs facade with the Prometheus exporter. Pipeline crates
//! record through the helpers in [`recording`]; without an installed
//! recorder those calls are no-ops. Metrics are rendered as Prometheus text
//! via [`PrometheusAdapter::render`], exposed on the gateway's `/metrics`.

pub mod recording;

use async_trait::async_trait;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use herald_core::{AdapterType, HealthStatus, HeraldError, PluginAdapter};

pub use recording::{
    record_bus_dropped, record_bus_event, record_bus_retry, record_dispatch_failure,
    record_handler_duration, record_ingested, record_published, set_bus_in_flight,
};

/// Prometheus metrics adapter.
///
/// Installs the Prometheus recorder and exposes a handle for rendering.
pub struct PrometheusAdapter {
    handle: PrometheusHandle,
}

impl PrometheusAdapter {
    /// Install the Prometheus recorder globally.
    ///
    /// Only one recorder can be installed per process; a second call fails.
    pub fn new() -> Result<Self, HeraldError> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            HeraldError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;

        recording::register_metrics();
        tracing::info!("prometheus metrics recorder installed");

        Ok(Self { handle })
    }

    pub fn handle(&self) -> &PrometheusHandle {
        &self.handle
    }

    /// Render all collected metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

#[async_trait]
impl PluginAdapter for PrometheusAdapter {
    fn name(&self) -> &str {
        "prometheus"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Observability
    }

    async fn health_check(&self) -> Result<HealthStatus, HeraldError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), HeraldError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The global recorder can only be installed once per test binary, so a
    // single test covers install, record, and render.
    #[tokio::test]
    async fn installs_and_renders_recorded_metrics() {
        let adapter = PrometheusAdapter::new().unwrap();
        assert_eq!(adapter.name(), "prometheus");
        assert_eq!(adapter.adapter_type(), AdapterType::Observability);
        assert_eq!(adapter.health_check().await.unwrap(), HealthStatus::Healthy);

        record_ingested("out");
        record_published();
        record_dispatch_failure("out.route");
        record_bus_event("notification.save");
        record_handler_duration("notification.save", 0.25);
        set_bus_in_flight(2.0);

        let text = adapter.render();
        assert!(text.contains("herald_notifications_ingested_total"));
        assert!(text.contains("direction=\"out\""));
        assert!(text.contains("herald_dispatch_failures_total"));
        assert!(text.contains("herald_bus_in_flight"));

        assert!(PrometheusAdapter::new().is_err());
    }
}
