//! Lifecycle API request and response types
//!
//! Serializable with serde so the REST binding can accept and return them
//! directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// =============================================================================
// Capabilities
// =============================================================================

/// Controller-level capabilities a caller may rely on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControllerCapability {
    CreateDeleteVolume,
    CreateDeleteSnapshot,
    CloneVolume,
    ExpandVolume,
}

impl std::fmt::Display for ControllerCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControllerCapability::CreateDeleteVolume => write!(f, "CREATE_DELETE_VOLUME"),
            ControllerCapability::CreateDeleteSnapshot => write!(f, "CREATE_DELETE_SNAPSHOT"),
            ControllerCapability::CloneVolume => write!(f, "CLONE_VOLUME"),
            ControllerCapability::ExpandVolume => write!(f, "EXPAND_VOLUME"),
        }
    }
}

/// Volume access modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessMode {
    SingleNodeWriter,
    SingleNodeReaderOnly,
    MultiNodeReaderOnly,
    MultiNodeSingleWriter,
    MultiNodeMultiWriter,
}

impl std::fmt::Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessMode::SingleNodeWriter => write!(f, "SINGLE_NODE_WRITER"),
            AccessMode::SingleNodeReaderOnly => write!(f, "SINGLE_NODE_READER_ONLY"),
            AccessMode::MultiNodeReaderOnly => write!(f, "MULTI_NODE_READER_ONLY"),
            AccessMode::MultiNodeSingleWriter => write!(f, "MULTI_NODE_SINGLE_WRITER"),
            AccessMode::MultiNodeMultiWriter => write!(f, "MULTI_NODE_MULTI_WRITER"),
        }
    }
}

/// Requested capability of a volume
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeCapability {
    pub access_mode: AccessMode,
    /// Raw block access rather than a mounted filesystem
    #[serde(default)]
    pub block: bool,
    #[serde(default)]
    pub fs_type: Option<String>,
}

impl VolumeCapability {
    pub fn single_node_writer() -> Self {
        Self {
            access_mode: AccessMode::SingleNodeWriter,
            block: false,
            fs_type: None,
        }
    }
}

// =============================================================================
// Volumes
// =============================================================================

/// Requested size bounds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityRange {
    #[serde(default)]
    pub required_bytes: u64,
    #[serde(default)]
    pub limit_bytes: u64,
}

/// What a new volume is populated from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum VolumeContentSource {
    #[serde(rename_all = "camelCase")]
    Volume { volume_id: String },
    #[serde(rename_all = "camelCase")]
    Snapshot { snapshot_id: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVolumeRequest {
    pub name: String,
    #[serde(default)]
    pub capacity_range: Option<CapacityRange>,
    #[serde(default)]
    pub volume_capabilities: Vec<VolumeCapability>,
    #[serde(default)]
    pub parameters: HashMap<String, String>,
    #[serde(default)]
    pub content_source: Option<VolumeContentSource>,
}

impl CreateVolumeRequest {
    /// Requested size, zero when absent
    pub fn required_bytes(&self) -> u64 {
        self.capacity_range.map_or(0, |r| r.required_bytes)
    }
}

/// A provisioned volume
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub volume_id: String,
    pub capacity_bytes: u64,
    /// `{pool context key: pool}`
    pub volume_context: BTreeMap<String, String>,
    /// One segment, `{topology key: node}`
    pub accessible_topology: Vec<BTreeMap<String, String>>,
    pub content_source: Option<VolumeContentSource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVolumeResponse {
    pub volume: Volume,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteVolumeRequest {
    pub volume_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerExpandVolumeRequest {
    pub volume_id: String,
    #[serde(default)]
    pub capacity_range: Option<CapacityRange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerExpandVolumeResponse {
    pub capacity_bytes: u64,
    pub node_expansion_required: bool,
}

// =============================================================================
// Snapshots
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSnapshotRequest {
    pub source_volume_id: String,
    pub name: String,
    #[serde(default)]
    pub parameters: HashMap<String, String>,
}

/// A snapshot as reported to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// `<volume>@<snapshot>`
    pub snapshot_id: String,
    pub source_volume_id: String,
    pub size_bytes: u64,
    pub creation_time: DateTime<Utc>,
    pub ready_to_use: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSnapshotResponse {
    pub snapshot: Snapshot,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSnapshotRequest {
    pub snapshot_id: String,
}
