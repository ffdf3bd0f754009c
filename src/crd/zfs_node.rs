//! ZfsNode CRD
//!
//! Published by the node agent on every node: the ZFS pools it can see and
//! their free space. The controller only reads these.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// =============================================================================
// ZfsNode CRD
// =============================================================================

/// ZfsNode lists the pools of one cluster node.
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "zfs.localpv.io",
    version = "v1",
    kind = "ZfsNode",
    plural = "zfsnodes",
    shortname = "zn",
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#,
    namespaced = false
)]
#[serde(rename_all = "camelCase")]
pub struct ZfsNodeSpec {
    /// Pools imported on the node
    #[serde(default)]
    pub pools: Vec<ZfsPool>,
}

/// A single pool as reported by the node agent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ZfsPool {
    pub name: String,

    #[serde(default)]
    pub uuid: Option<String>,

    /// Free bytes in the pool
    #[serde(default)]
    pub free_bytes: u64,
}

impl ZfsNode {
    /// Node id, which is the object name
    pub fn node_id(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_node() {
        let node: ZfsNode = serde_json::from_value(serde_json::json!({
            "apiVersion": "zfs.localpv.io/v1",
            "kind": "ZfsNode",
            "metadata": { "name": "node-1" },
            "spec": {
                "pools": [
                    { "name": "zfspv-pool", "uuid": "123", "freeBytes": 1024 },
                    { "name": "fast", "freeBytes": 2048 }
                ]
            }
        }))
        .unwrap();

        assert_eq!(node.node_id(), "node-1");
        assert_eq!(node.spec.pools.len(), 2);
        assert_eq!(node.spec.pools[1].uuid, None);
        assert_eq!(node.spec.pools[0].free_bytes, 1024);
    }
}
