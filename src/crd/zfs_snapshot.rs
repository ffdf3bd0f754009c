//! ZfsSnapshot CRD
//!
//! Point-in-time snapshot of a ZfsVolume. Its properties are copied from the
//! source volume at creation time and the source volume name is kept in
//! `spec.sourceVolume`.

use super::zfs_volume::{ZfsVolumeSpec, ZfsVolumeStatus};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// ZfsSnapshot describes a snapshot of a volume on the volume's node.
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "zfs.localpv.io",
    version = "v1",
    kind = "ZfsSnapshot",
    plural = "zfssnapshots",
    shortname = "zs",
    status = "ZfsVolumeStatus",
    printcolumn = r#"{"name": "Volume", "type": "string", "jsonPath": ".spec.sourceVolume"}"#,
    printcolumn = r#"{"name": "Status", "type": "string", "jsonPath": ".status.state"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#,
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ZfsSnapshotSpec {
    /// Volume the snapshot was taken from
    pub source_volume: String,

    /// Copy of the source volume's spec
    #[serde(flatten)]
    pub volume: ZfsVolumeSpec,
}

impl ZfsSnapshot {
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or("")
    }
}
