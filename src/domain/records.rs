//! Declarative Records
//!
//! The volume and snapshot records this controller writes for the per-node
//! executor. The controller writes desired state (capacity, pool, owner,
//! lineage, Pending status) and only ever reads the executor's status back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Separator between the source and derived halves of a lineage string
pub const LINEAGE_SEPARATOR: char = '@';

// =============================================================================
// Record Status
// =============================================================================

/// Executor-driven status of a record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordStatus {
    /// Submitted, not yet acted on by the executor
    #[default]
    Pending,
    /// The executor created the underlying storage object
    Ready,
    /// The executor gave up on the record
    Failed,
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordStatus::Pending => write!(f, "Pending"),
            RecordStatus::Ready => write!(f, "Ready"),
            RecordStatus::Failed => write!(f, "Failed"),
        }
    }
}

// =============================================================================
// Volume Type
// =============================================================================

/// Kind of ZFS object backing a volume
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VolumeType {
    /// A ZFS dataset mounted directly
    Dataset,
    /// A zvol block device formatted with `fs_type`
    #[default]
    Zvol,
}

impl VolumeType {
    /// Derive the volume type from the requested filesystem type
    pub fn from_fs_type(fs_type: Option<&str>) -> Self {
        match fs_type {
            Some(fs) if fs.eq_ignore_ascii_case("zfs") => VolumeType::Dataset,
            _ => VolumeType::Zvol,
        }
    }
}

impl std::fmt::Display for VolumeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VolumeType::Dataset => write!(f, "DATASET"),
            VolumeType::Zvol => write!(f, "ZVOL"),
        }
    }
}

// =============================================================================
// Volume Spec
// =============================================================================

/// Desired-state attributes shared by volumes, clones and snapshots
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeSpec {
    /// Node hosting the volume; set once at creation
    pub owner_node: String,
    /// Pool on the owner node
    pub pool_name: String,
    /// Normalized capacity in bytes
    pub capacity_bytes: u64,
    pub record_size: Option<String>,
    pub vol_block_size: Option<String>,
    pub compression: Option<String>,
    pub dedup: Option<String>,
    pub encryption: Option<String>,
    pub key_format: Option<String>,
    pub key_location: Option<String>,
    pub thin_provision: Option<String>,
    pub volume_type: VolumeType,
    pub fs_type: Option<String>,
    pub shared: Option<String>,
    /// `<source>@<name>` lineage when this volume is a clone
    pub snapshot_lineage: Option<String>,
}

// =============================================================================
// Volume Record
// =============================================================================

/// Declarative description of a volume
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeRecord {
    pub name: String,
    pub spec: VolumeSpec,
    pub labels: BTreeMap<String, String>,
    pub status: RecordStatus,
    /// Deletion marker; teardown is in progress once set
    pub deletion_timestamp: Option<DateTime<Utc>>,
}

impl VolumeRecord {
    /// Check if a deletion marker has been set
    pub fn is_deleting(&self) -> bool {
        self.deletion_timestamp.is_some()
    }

    /// Check if the executor has created the volume
    pub fn is_ready(&self) -> bool {
        self.status == RecordStatus::Ready
    }

    /// Check whether this record satisfies a creation request.
    ///
    /// Owner node is not compared: a retried plain create may schedule
    /// elsewhere, but the first placement wins.
    pub fn matches_request(
        &self,
        pool_name: Option<&str>,
        capacity_bytes: u64,
        lineage: Option<&str>,
    ) -> bool {
        let pool_ok = pool_name.map_or(true, |p| p == self.spec.pool_name);
        pool_ok
            && self.spec.capacity_bytes == capacity_bytes
            && self.spec.snapshot_lineage.as_deref() == lineage
    }
}

// =============================================================================
// Snapshot Record
// =============================================================================

/// Declarative description of a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// Snapshot half of the `<volume>@<snapshot>` id
    pub name: String,
    /// Volume the snapshot was taken from
    pub source_volume: String,
    /// Copy of the source volume's spec at creation time
    pub spec: VolumeSpec,
    pub labels: BTreeMap<String, String>,
    pub status: RecordStatus,
    pub deletion_timestamp: Option<DateTime<Utc>>,
}

impl SnapshotRecord {
    /// Lineage id as exposed at the API boundary
    pub fn snapshot_id(&self) -> String {
        format!("{}{}{}", self.source_volume, LINEAGE_SEPARATOR, self.name)
    }

    pub fn is_deleting(&self) -> bool {
        self.deletion_timestamp.is_some()
    }

    pub fn is_ready(&self) -> bool {
        self.status == RecordStatus::Ready
    }
}

// =============================================================================
// Snapshot Id
// =============================================================================

/// Parsed `<volume>@<snapshot>` identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotId {
    pub volume: String,
    pub snapshot: String,
}

impl SnapshotId {
    /// Parse a two-part lineage id.
    ///
    /// Exactly one separator with non-empty halves is accepted.
    pub fn parse(id: &str) -> crate::error::Result<Self> {
        let mut parts = id.split(LINEAGE_SEPARATOR);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(volume), Some(snapshot), None) if !volume.is_empty() && !snapshot.is_empty() => {
                Ok(Self {
                    volume: volume.to_string(),
                    snapshot: snapshot.to_string(),
                })
            }
            _ => Err(crate::error::Error::InvalidSnapshotId { id: id.to_string() }),
        }
    }

    pub fn new(volume: impl Into<String>, snapshot: impl Into<String>) -> Self {
        Self {
            volume: volume.into(),
            snapshot: snapshot.into(),
        }
    }
}

impl std::fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.volume, LINEAGE_SEPARATOR, self.snapshot)
    }
}
