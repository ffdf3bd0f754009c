//! Usage Telemetry
//!
//! Anonymous provision/deprovision events. Emission never blocks a request
//! and never fails one: events are posted from detached tasks and any
//! delivery error is only logged.

use super::metrics::ControllerMetrics;
use crate::config::TelemetryConfig;
use crate::domain::ports::{TelemetrySink, UsageEvent};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::time::Duration;
use tracing::{debug, warn};

// =============================================================================
// HTTP Reporter
// =============================================================================

/// Posts usage events to a collector over HTTP
pub struct UsageReporter {
    enabled: bool,
    endpoint: String,
    client: reqwest::Client,
    metrics: Option<ControllerMetrics>,
}

impl UsageReporter {
    pub fn new(config: &TelemetryConfig, metrics: Option<ControllerMetrics>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Configuration(format!("telemetry client: {}", e)))?;

        Ok(Self {
            enabled: config.enabled,
            endpoint: config.endpoint.clone(),
            client,
            metrics,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl TelemetrySink for UsageReporter {
    fn emit(&self, event: UsageEvent) {
        if !self.enabled {
            return;
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_usage_event(&event.kind.to_string());
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!(kind = %event.kind, "No runtime, dropping usage event");
            return;
        };

        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        runtime.spawn(async move {
            let result = client
                .post(&endpoint)
                .json(&event)
                .send()
                .await
                .and_then(|resp| resp.error_for_status());

            match result {
                Ok(_) => debug!(kind = %event.kind, volume = %event.volume_name, "Sent usage event"),
                Err(e) => warn!(kind = %event.kind, error = %e, "Failed to send usage event"),
            }
        });
    }
}

// =============================================================================
// Other Sinks
// =============================================================================

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

impl TelemetrySink for NoopTelemetry {
    fn emit(&self, _event: UsageEvent) {}
}

/// Keeps events in memory for inspection
#[derive(Debug, Default)]
pub struct RecordingTelemetry {
    events: Mutex<Vec<UsageEvent>>,
}

impl RecordingTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<UsageEvent> {
        self.events.lock().clone()
    }
}

impl TelemetrySink for RecordingTelemetry {
    fn emit(&self, event: UsageEvent) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::UsageEventKind;

    fn event() -> UsageEvent {
        UsageEvent {
            kind: UsageEventKind::VolumeProvision,
            claim_name: None,
            volume_name: "pvc-1".into(),
            capacity_bytes: 1 << 30,
            storage_type: "zfs-localpv".into(),
        }
    }

    #[test]
    fn test_disabled_reporter_emits_nothing() {
        let metrics = ControllerMetrics::new().unwrap();
        let reporter =
            UsageReporter::new(&TelemetryConfig::default(), Some(metrics.clone())).unwrap();

        assert!(!reporter.is_enabled());
        reporter.emit(event());
        assert_eq!(metrics.usage_event_count("volume-provision"), 0);
    }

    #[tokio::test]
    async fn test_enabled_reporter_does_not_block_on_failure() {
        let metrics = ControllerMetrics::new().unwrap();
        let config = TelemetryConfig {
            enabled: true,
            endpoint: "http://127.0.0.1:9/unreachable".into(),
            timeout_secs: 1,
        };
        let reporter = UsageReporter::new(&config, Some(metrics.clone())).unwrap();

        reporter.emit(event());
        assert_eq!(metrics.usage_event_count("volume-provision"), 1);
    }

    #[test]
    fn test_emit_outside_runtime_is_dropped() {
        let config = TelemetryConfig {
            enabled: true,
            ..Default::default()
        };
        let reporter = UsageReporter::new(&config, None).unwrap();
        reporter.emit(event());
    }

    #[test]
    fn test_recording_sink() {
        let sink = RecordingTelemetry::new();
        sink.emit(event());
        NoopTelemetry.emit(event());
        assert_eq!(sink.events(), vec![event()]);
    }
}
