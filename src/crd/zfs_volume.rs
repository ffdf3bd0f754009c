//! ZfsVolume CRD
//!
//! Declarative description of one node-local ZFS volume. Created by the
//! controller, which then sets status Pending through the status
//! subresource; the node agent on the owner node creates the dataset or zvol
//! and moves the status on.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// =============================================================================
// ZfsVolume CRD
// =============================================================================

/// ZfsVolume describes a dataset or zvol on a specific node and pool.
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "zfs.localpv.io",
    version = "v1",
    kind = "ZfsVolume",
    plural = "zfsvolumes",
    shortname = "zv",
    status = "ZfsVolumeStatus",
    printcolumn = r#"{"name": "Pool", "type": "string", "jsonPath": ".spec.poolName"}"#,
    printcolumn = r#"{"name": "Node", "type": "string", "jsonPath": ".spec.ownerNodeId"}"#,
    printcolumn = r#"{"name": "Size", "type": "string", "jsonPath": ".spec.capacity"}"#,
    printcolumn = r#"{"name": "Status", "type": "string", "jsonPath": ".status.state"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#,
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ZfsVolumeSpec {
    /// Node the volume lives on; immutable
    pub owner_node_id: String,

    /// Pool on the owner node
    pub pool_name: String,

    /// Capacity in bytes as a decimal string
    pub capacity: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recordsize: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volblocksize: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dedup: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyformat: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keylocation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thin_provision: Option<String>,

    /// `DATASET` or `ZVOL`
    #[serde(default)]
    pub volume_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fs_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared: Option<String>,

    /// `<source>@<name>` for clones
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapname: Option<String>,
}

// =============================================================================
// Status
// =============================================================================

/// Status of a ZfsVolume or ZfsSnapshot, owned by the node agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ZfsVolumeStatus {
    /// `Pending`, `Ready` or `Failed`
    #[serde(default)]
    pub state: Option<String>,
}

impl ZfsVolume {
    /// Get the volume name
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::CustomResourceExt;

    #[test]
    fn test_spec_serializes_camel_case() {
        let spec = ZfsVolumeSpec {
            owner_node_id: "node-1".into(),
            pool_name: "zfspv-pool".into(),
            capacity: "1073741824".into(),
            thin_provision: Some("yes".into()),
            volume_type: "ZVOL".into(),
            ..Default::default()
        };

        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["ownerNodeId"], "node-1");
        assert_eq!(json["poolName"], "zfspv-pool");
        assert_eq!(json["capacity"], "1073741824");
        assert_eq!(json["thinProvision"], "yes");
        assert!(json.get("compression").is_none());
    }

    #[test]
    fn test_new_volume_has_no_status() {
        let volume = ZfsVolume::new("pvc-1", ZfsVolumeSpec::default());
        assert_eq!(volume.name(), "pvc-1");
        assert!(volume.status.is_none());
    }

    #[test]
    fn test_status_is_a_subresource() {
        // Status is ignored on create and must be written through the
        // status subresource
        for crd in [ZfsVolume::crd(), crate::crd::ZfsSnapshot::crd()] {
            let version = &crd.spec.versions[0];
            let subresources = version.subresources.as_ref().unwrap();
            assert!(subresources.status.is_some(), "{}", crd.spec.names.kind);
        }
    }
}
