//! Control Plane Module
//!
//! The lifecycle API and everything it talks to: the provisioning gateway
//! over a record store, usage telemetry, metrics and the REST server.

pub mod api;
pub mod controller;
pub mod gateway;
pub mod metrics;
pub mod stores;
pub mod telemetry;
pub mod types;

pub use api::{ApiServer, ApiServerConfig, RestRouter};
pub use controller::{default_capabilities, Controller};
pub use gateway::ProvisioningGateway;
pub use metrics::ControllerMetrics;
pub use stores::{InMemoryRecordStore, KubeRecordStore, StaticPoolInventory, ZfsNodeInventory};
pub use telemetry::{NoopTelemetry, RecordingTelemetry, UsageReporter};
pub use types::*;
