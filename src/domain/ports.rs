//! Domain Ports - Core trait definitions for the controller
//!
//! These traits define the boundaries between the lifecycle logic and the
//! shared record store, the pool inventory feed and usage telemetry.
//! Adapters implement these traits to provide concrete functionality.

use super::records::{SnapshotRecord, VolumeRecord};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// =============================================================================
// Record Store Port
// =============================================================================

/// Name-keyed store shared with the per-node executor.
///
/// Creation must be atomic create-or-fail: implementations return
/// [`crate::error::Error::ResourceExists`] rather than overwrite.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create a volume record
    async fn create_volume(&self, record: VolumeRecord) -> Result<VolumeRecord>;

    /// Get a volume record
    async fn get_volume(&self, name: &str) -> Result<Option<VolumeRecord>>;

    /// List all volume records
    async fn list_volumes(&self) -> Result<Vec<VolumeRecord>>;

    /// Set the deletion marker on a volume record
    async fn mark_volume_deleted(&self, name: &str) -> Result<()>;

    /// Update the desired capacity of a volume record
    async fn update_volume_capacity(&self, name: &str, capacity_bytes: u64) -> Result<()>;

    /// Create a snapshot record
    async fn create_snapshot(&self, record: SnapshotRecord) -> Result<SnapshotRecord>;

    /// Get a snapshot record
    async fn get_snapshot(&self, name: &str) -> Result<Option<SnapshotRecord>>;

    /// Set the deletion marker on a snapshot record
    async fn mark_snapshot_deleted(&self, name: &str) -> Result<()>;

    /// Get store name
    fn store_name(&self) -> &str;
}

// =============================================================================
// Pool Inventory Port
// =============================================================================

/// A pool reported by a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolInfo {
    pub name: String,
    /// Pool GUID as reported by the node agent
    #[serde(default)]
    pub uuid: Option<String>,
    pub free_bytes: u64,
}

/// All pools reported by one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePools {
    pub node_id: String,
    pub pools: Vec<PoolInfo>,
}

/// Read-only feed of per-node pools and free capacity
#[async_trait]
pub trait PoolInventory: Send + Sync {
    /// Current pools of every known node
    async fn node_pools(&self) -> Result<Vec<NodePools>>;
}

// =============================================================================
// Telemetry Port
// =============================================================================

/// Usage event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UsageEventKind {
    VolumeProvision,
    VolumeDeprovision,
}

impl std::fmt::Display for UsageEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UsageEventKind::VolumeProvision => write!(f, "volume-provision"),
            UsageEventKind::VolumeDeprovision => write!(f, "volume-deprovision"),
        }
    }
}

/// Anonymous usage event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageEvent {
    pub kind: UsageEventKind,
    /// Claim name, when the request carried one
    pub claim_name: Option<String>,
    pub volume_name: String,
    pub capacity_bytes: u64,
    /// Opaque storage-type tag
    pub storage_type: String,
}

/// Fire-and-forget event sink.
///
/// `emit` must not block and must swallow its own failures.
pub trait TelemetrySink: Send + Sync {
    fn emit(&self, event: UsageEvent);
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type RecordStoreRef = Arc<dyn RecordStore>;
pub type PoolInventoryRef = Arc<dyn PoolInventory>;
pub type TelemetrySinkRef = Arc<dyn TelemetrySink>;
