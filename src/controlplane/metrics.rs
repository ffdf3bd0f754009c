//! Controller Metrics
//!
//! Prometheus counters for lifecycle requests, their failures and emitted
//! usage events. Each `ControllerMetrics` owns its registry so tests and
//! embedded controllers do not collide on the process-global one.

use crate::error::{Error, Result};
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct ControllerMetrics {
    registry: Registry,
    requests: IntCounterVec,
    errors: IntCounterVec,
    usage_events: IntCounterVec,
}

impl ControllerMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new("zfs_localpv_requests_total", "Lifecycle API requests"),
            &["operation"],
        )
        .map_err(metrics_error)?;
        let errors = IntCounterVec::new(
            Opts::new("zfs_localpv_request_errors_total", "Failed lifecycle API requests"),
            &["operation", "code"],
        )
        .map_err(metrics_error)?;
        let usage_events = IntCounterVec::new(
            Opts::new("zfs_localpv_usage_events_total", "Usage events emitted"),
            &["event"],
        )
        .map_err(metrics_error)?;

        registry.register(Box::new(requests.clone())).map_err(metrics_error)?;
        registry.register(Box::new(errors.clone())).map_err(metrics_error)?;
        registry.register(Box::new(usage_events.clone())).map_err(metrics_error)?;

        Ok(Self {
            registry,
            requests,
            errors,
            usage_events,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Count a request and, when it failed, its error code
    pub fn observe<T>(&self, operation: &str, result: &Result<T>) {
        self.requests.with_label_values(&[operation]).inc();
        if let Err(e) = result {
            let code = e.code().to_string();
            self.errors.with_label_values(&[operation, &code]).inc();
        }
    }

    pub fn record_usage_event(&self, event: &str) {
        self.usage_events.with_label_values(&[event]).inc();
    }

    pub fn request_count(&self, operation: &str) -> u64 {
        self.requests.with_label_values(&[operation]).get()
    }

    pub fn error_count(&self, operation: &str, code: &str) -> u64 {
        self.errors.with_label_values(&[operation, code]).get()
    }

    pub fn usage_event_count(&self, event: &str) -> u64 {
        self.usage_events.with_label_values(&[event]).get()
    }

    /// Text exposition of every metric in the registry
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(metrics_error)?;
        Ok(buffer)
    }
}

fn metrics_error(e: prometheus::Error) -> Error {
    Error::Internal(format!("metrics: {}", e))
}
