//! ZFS LocalPV Controller
//!
//! Controller plane for node-local ZFS volumes. It never touches a disk:
//! every request is turned into a declarative ZfsVolume or ZfsSnapshot
//! record that the agent on the owner node reconciles.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │                        Lifecycle API (REST)                           │
//! │     create / delete / expand volume, create / delete snapshot         │
//! ├───────────────────────────────────────────────────────────────────────┤
//! │  ┌───────────────────┐  ┌───────────────────┐  ┌──────────────────┐   │
//! │  │ Capacity + Policy │  │ Candidate Map +   │  │  Record Builder  │   │
//! │  │   Normalization   │  │    Scheduler      │  │                  │   │
//! │  └─────────┬─────────┘  └─────────┬─────────┘  └────────┬─────────┘   │
//! │            └──────────────────────┼─────────────────────┘             │
//! │                        ┌──────────┴──────────┐                        │
//! │                        │ Provisioning Gateway│──► usage telemetry     │
//! │                        └──────────┬──────────┘                        │
//! ├───────────────────────────────────┼───────────────────────────────────┤
//! │     Record Store (ZfsVolume / ZfsSnapshot)   Pool Inventory (ZfsNode) │
//! └───────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`allocation`]: Capacity normalization, candidates and scheduling
//! - [`builder`]: Volume, clone and snapshot record construction
//! - [`config`]: Controller configuration
//! - [`controlplane`]: Lifecycle API, gateway, stores and REST server
//! - [`crd`]: Custom Resource Definitions
//! - [`domain`]: Core records and ports
//! - [`error`]: Error types and handling

pub mod allocation;
pub mod builder;
pub mod config;
pub mod controlplane;
pub mod crd;
pub mod domain;
pub mod error;

// Re-export commonly used types
pub use allocation::{normalize_capacity, schedule, CandidateMapBuilder, SchedulerPolicy, GIB, MIB};

pub use config::{ControllerConfig, TelemetryConfig};

pub use controlplane::{
    ApiServer, ApiServerConfig, Controller, ControllerMetrics, InMemoryRecordStore,
    KubeRecordStore, NoopTelemetry, ProvisioningGateway, RecordingTelemetry, StaticPoolInventory,
    UsageReporter, ZfsNodeInventory,
};

pub use crd::{ZfsNode, ZfsSnapshot, ZfsVolume};

pub use domain::ports::{
    NodePools, PoolInfo, PoolInventory, RecordStore, TelemetrySink, UsageEvent, UsageEventKind,
};
pub use domain::records::{RecordStatus, SnapshotId, SnapshotRecord, VolumeRecord, VolumeSpec, VolumeType};

pub use error::{Code, Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
