//! Kubernetes Record Store
//!
//! Persists records as `ZfsVolume` / `ZfsSnapshot` custom resources in one
//! namespace and reads the pool inventory from cluster-scoped `ZfsNode`
//! resources. Kubernetes `create` is the create-or-fail primitive (409 on
//! conflict) and `deletionTimestamp` is the deletion marker. Status lives in
//! the status subresource, so it is written with a second request right
//! after create.

use crate::crd::{ZfsNode, ZfsSnapshot, ZfsSnapshotSpec, ZfsVolume, ZfsVolumeSpec};
use crate::domain::ports::{NodePools, PoolInfo, PoolInventory, RecordStore};
use crate::domain::records::{RecordStatus, SnapshotRecord, VolumeRecord, VolumeSpec, VolumeType};
use crate::error::{Error, Result};
use async_trait::async_trait;
use kube::api::{Api, DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::Client;
use tracing::{debug, info, instrument};

// =============================================================================
// Kubernetes Record Store
// =============================================================================

/// Record store backed by ZFS custom resources
#[derive(Clone)]
pub struct KubeRecordStore {
    client: Client,
    namespace: String,
}

impl KubeRecordStore {
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    fn volumes(&self) -> Api<ZfsVolume> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    fn snapshots(&self) -> Api<ZfsSnapshot> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }
}

#[async_trait]
impl RecordStore for KubeRecordStore {
    #[instrument(skip(self, record), fields(volume = %record.name))]
    async fn create_volume(&self, record: VolumeRecord) -> Result<VolumeRecord> {
        let object = volume_to_crd(&record, &self.namespace);
        let api = self.volumes();
        api.create(&PostParams::default(), &object)
            .await
            .map_err(|e| map_create_error(e, "ZfsVolume", &record.name))?;

        let patched = api
            .patch_status(&record.name, &PatchParams::default(), &Patch::Merge(&status_patch(record.status)))
            .await
            .map_err(|e| map_status_error(e, "ZfsVolume", &record.name))?;

        info!(node = %record.spec.owner_node, pool = %record.spec.pool_name, "Created ZfsVolume");
        volume_from_crd(patched)
    }

    #[instrument(skip(self))]
    async fn get_volume(&self, name: &str) -> Result<Option<VolumeRecord>> {
        self.volumes()
            .get_opt(name)
            .await?
            .map(volume_from_crd)
            .transpose()
    }

    #[instrument(skip(self))]
    async fn list_volumes(&self) -> Result<Vec<VolumeRecord>> {
        let list = self.volumes().list(&ListParams::default()).await?;
        list.items.into_iter().map(volume_from_crd).collect()
    }

    #[instrument(skip(self))]
    async fn mark_volume_deleted(&self, name: &str) -> Result<()> {
        self.volumes()
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|e| match e {
                kube::Error::Api(ref resp) if resp.code == 404 => Error::VolumeNotFound {
                    name: name.to_string(),
                },
                e => Error::Kube(e),
            })?;

        debug!("Requested ZfsVolume deletion");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn update_volume_capacity(&self, name: &str, capacity_bytes: u64) -> Result<()> {
        let patch = serde_json::json!({ "spec": { "capacity": capacity_bytes.to_string() } });
        self.volumes()
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| match e {
                kube::Error::Api(ref resp) if resp.code == 404 => Error::VolumeNotFound {
                    name: name.to_string(),
                },
                e => Error::Kube(e),
            })?;

        info!(capacity_bytes, "Patched ZfsVolume capacity");
        Ok(())
    }

    #[instrument(skip(self, record), fields(snapshot = %record.name))]
    async fn create_snapshot(&self, record: SnapshotRecord) -> Result<SnapshotRecord> {
        let object = snapshot_to_crd(&record, &self.namespace);
        let api = self.snapshots();
        api.create(&PostParams::default(), &object)
            .await
            .map_err(|e| map_create_error(e, "ZfsSnapshot", &record.name))?;

        let patched = api
            .patch_status(&record.name, &PatchParams::default(), &Patch::Merge(&status_patch(record.status)))
            .await
            .map_err(|e| map_status_error(e, "ZfsSnapshot", &record.name))?;

        info!(volume = %record.source_volume, "Created ZfsSnapshot");
        snapshot_from_crd(patched)
    }

    #[instrument(skip(self))]
    async fn get_snapshot(&self, name: &str) -> Result<Option<SnapshotRecord>> {
        self.snapshots()
            .get_opt(name)
            .await?
            .map(snapshot_from_crd)
            .transpose()
    }

    #[instrument(skip(self))]
    async fn mark_snapshot_deleted(&self, name: &str) -> Result<()> {
        self.snapshots()
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|e| match e {
                kube::Error::Api(ref resp) if resp.code == 404 => Error::SnapshotNotFound {
                    name: name.to_string(),
                },
                e => Error::Kube(e),
            })?;

        debug!("Requested ZfsSnapshot deletion");
        Ok(())
    }

    fn store_name(&self) -> &str {
        "kubernetes"
    }
}

// =============================================================================
// ZfsNode Pool Inventory
// =============================================================================

/// Pool inventory read from `ZfsNode` resources
#[derive(Clone)]
pub struct ZfsNodeInventory {
    client: Client,
}

impl ZfsNodeInventory {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PoolInventory for ZfsNodeInventory {
    #[instrument(skip(self))]
    async fn node_pools(&self) -> Result<Vec<NodePools>> {
        let nodes: Api<ZfsNode> = Api::all(self.client.clone());
        let list = nodes
            .list(&ListParams::default())
            .await
            .map_err(|e| Error::Inventory(format!("listing ZfsNodes: {}", e)))?;

        Ok(list.items.iter().map(node_pools_from_crd).collect())
    }
}

// =============================================================================
// Conversions
// =============================================================================

fn map_create_error(err: kube::Error, kind: &str, name: &str) -> Error {
    match err {
        kube::Error::Api(ref resp) if resp.code == 409 => Error::ResourceExists {
            kind: kind.to_string(),
            name: name.to_string(),
        },
        e => Error::SubmissionFailed {
            kind: kind.to_string(),
            name: name.to_string(),
            reason: e.to_string(),
        },
    }
}

fn map_status_error(err: kube::Error, kind: &str, name: &str) -> Error {
    Error::SubmissionFailed {
        kind: kind.to_string(),
        name: name.to_string(),
        reason: format!("writing status: {}", err),
    }
}

/// Merge patch for the status subresource
fn status_patch(status: RecordStatus) -> serde_json::Value {
    serde_json::json!({ "status": { "state": status.to_string() } })
}

fn parse_state(state: Option<&str>) -> RecordStatus {
    match state {
        Some("Ready") => RecordStatus::Ready,
        Some("Failed") => RecordStatus::Failed,
        _ => RecordStatus::Pending,
    }
}

fn spec_to_crd(spec: &VolumeSpec) -> ZfsVolumeSpec {
    ZfsVolumeSpec {
        owner_node_id: spec.owner_node.clone(),
        pool_name: spec.pool_name.clone(),
        capacity: spec.capacity_bytes.to_string(),
        recordsize: spec.record_size.clone(),
        volblocksize: spec.vol_block_size.clone(),
        compression: spec.compression.clone(),
        dedup: spec.dedup.clone(),
        encryption: spec.encryption.clone(),
        keyformat: spec.key_format.clone(),
        keylocation: spec.key_location.clone(),
        thin_provision: spec.thin_provision.clone(),
        volume_type: spec.volume_type.to_string(),
        fs_type: spec.fs_type.clone(),
        shared: spec.shared.clone(),
        snapname: spec.snapshot_lineage.clone(),
    }
}

fn spec_from_crd(name: &str, spec: ZfsVolumeSpec) -> Result<VolumeSpec> {
    let capacity_bytes = spec.capacity.parse::<u64>().map_err(|_| Error::RecordParse {
        name: name.to_string(),
        field: "capacity".to_string(),
        value: spec.capacity.clone(),
    })?;

    let volume_type = if spec.volume_type.eq_ignore_ascii_case("DATASET") {
        VolumeType::Dataset
    } else {
        VolumeType::Zvol
    };

    Ok(VolumeSpec {
        owner_node: spec.owner_node_id,
        pool_name: spec.pool_name,
        capacity_bytes,
        record_size: spec.recordsize,
        vol_block_size: spec.volblocksize,
        compression: spec.compression,
        dedup: spec.dedup,
        encryption: spec.encryption,
        key_format: spec.keyformat,
        key_location: spec.keylocation,
        thin_provision: spec.thin_provision,
        volume_type,
        fs_type: spec.fs_type,
        shared: spec.shared,
        snapshot_lineage: spec.snapname,
    })
}

pub(crate) fn volume_to_crd(record: &VolumeRecord, namespace: &str) -> ZfsVolume {
    let mut object = ZfsVolume::new(&record.name, spec_to_crd(&record.spec));
    object.metadata.namespace = Some(namespace.to_string());
    object.metadata.labels = Some(record.labels.clone());
    object
}

pub(crate) fn volume_from_crd(object: ZfsVolume) -> Result<VolumeRecord> {
    let name = object.name().to_string();
    let status = parse_state(object.status.as_ref().and_then(|s| s.state.as_deref()));

    Ok(VolumeRecord {
        spec: spec_from_crd(&name, object.spec)?,
        labels: object.metadata.labels.unwrap_or_default(),
        status,
        deletion_timestamp: object.metadata.deletion_timestamp.map(|t| t.0),
        name,
    })
}

pub(crate) fn snapshot_to_crd(record: &SnapshotRecord, namespace: &str) -> ZfsSnapshot {
    let spec = ZfsSnapshotSpec {
        source_volume: record.source_volume.clone(),
        volume: spec_to_crd(&record.spec),
    };
    let mut object = ZfsSnapshot::new(&record.name, spec);
    object.metadata.namespace = Some(namespace.to_string());
    object.metadata.labels = Some(record.labels.clone());
    object
}

pub(crate) fn snapshot_from_crd(object: ZfsSnapshot) -> Result<SnapshotRecord> {
    let name = object.name().to_string();
    let status = parse_state(object.status.as_ref().and_then(|s| s.state.as_deref()));

    Ok(SnapshotRecord {
        source_volume: object.spec.source_volume,
        spec: spec_from_crd(&name, object.spec.volume)?,
        labels: object.metadata.labels.unwrap_or_default(),
        status,
        deletion_timestamp: object.metadata.deletion_timestamp.map(|t| t.0),
        name,
    })
}

fn node_pools_from_crd(node: &ZfsNode) -> NodePools {
    NodePools {
        node_id: node.node_id().to_string(),
        pools: node
            .spec
            .pools
            .iter()
            .map(|p| PoolInfo {
                name: p.name.clone(),
                uuid: p.uuid.clone(),
                free_bytes: p.free_bytes,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{ZfsNodeSpec, ZfsPool, ZfsVolumeStatus};
    use assert_matches::assert_matches;
    use chrono::Utc;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
    use std::collections::BTreeMap;

    fn record() -> VolumeRecord {
        VolumeRecord {
            name: "pvc-1".into(),
            spec: VolumeSpec {
                owner_node: "node-1".into(),
                pool_name: "zfspv-pool".into(),
                capacity_bytes: 500_170_752,
                compression: Some("lz4".into()),
                volume_type: VolumeType::Dataset,
                fs_type: Some("zfs".into()),
                snapshot_lineage: Some("pvc-0@pvc-1".into()),
                ..Default::default()
            },
            labels: BTreeMap::from([("app".to_string(), "db".to_string())]),
            status: RecordStatus::Pending,
            deletion_timestamp: None,
        }
    }

    #[test]
    fn test_volume_crd_conversion() {
        let object = volume_to_crd(&record(), "openebs");
        assert_eq!(object.metadata.namespace.as_deref(), Some("openebs"));
        assert_eq!(object.spec.capacity, "500170752");
        assert_eq!(object.spec.volume_type, "DATASET");
        assert_eq!(object.spec.snapname.as_deref(), Some("pvc-0@pvc-1"));

        assert_eq!(volume_from_crd(object).unwrap(), record());
    }

    #[test]
    fn test_status_written_through_patch() {
        // Create bodies carry no status; it is set by the follow-up patch
        assert!(volume_to_crd(&record(), "openebs").status.is_none());
        assert_eq!(
            status_patch(RecordStatus::Pending),
            serde_json::json!({ "status": { "state": "Pending" } })
        );

        let mut object = volume_to_crd(&record(), "openebs");
        let patch: ZfsVolume = serde_json::from_value(serde_json::json!({
            "apiVersion": "zfs.localpv.io/v1",
            "kind": "ZfsVolume",
            "metadata": { "name": "pvc-1" },
            "spec": serde_json::to_value(&object.spec).unwrap(),
            "status": status_patch(RecordStatus::Ready)["status"].clone(),
        }))
        .unwrap();
        object.status = patch.status;
        assert!(volume_from_crd(object).unwrap().is_ready());
    }

    #[test]
    fn test_missing_status_is_pending() {
        let mut object = volume_to_crd(&record(), "openebs");
        object.status = None;
        assert_eq!(volume_from_crd(object).unwrap().status, RecordStatus::Pending);
    }

    #[test]
    fn test_deletion_timestamp_is_marker() {
        let now = Utc::now();
        let mut object = volume_to_crd(&record(), "openebs");
        object.metadata.deletion_timestamp = Some(Time(now));
        object.status = Some(ZfsVolumeStatus { state: Some("Ready".into()) });

        let parsed = volume_from_crd(object).unwrap();
        assert!(parsed.is_deleting());
        assert!(parsed.is_ready());
    }

    #[test]
    fn test_bad_capacity_is_parse_error() {
        let mut object = volume_to_crd(&record(), "openebs");
        object.spec.capacity = "10Gi".into();
        assert_matches!(
            volume_from_crd(object),
            Err(Error::RecordParse { field, value, .. }) if field == "capacity" && value == "10Gi"
        );
    }

    #[test]
    fn test_snapshot_crd_conversion() {
        let source = record();
        let snap = SnapshotRecord {
            name: "snap-1".into(),
            source_volume: source.name.clone(),
            spec: source.spec.clone(),
            labels: BTreeMap::new(),
            status: RecordStatus::Ready,
            deletion_timestamp: None,
        };

        let mut object = snapshot_to_crd(&snap, "openebs");
        assert_eq!(object.spec.source_volume, "pvc-1");
        assert!(object.status.is_none());

        object.status = Some(ZfsVolumeStatus { state: Some("Ready".into()) });
        assert_eq!(snapshot_from_crd(object).unwrap(), snap);
    }

    #[test]
    fn test_node_pools_from_crd() {
        let node = ZfsNode::new(
            "node-1",
            ZfsNodeSpec {
                pools: vec![ZfsPool {
                    name: "zfspv-pool".into(),
                    uuid: Some("42".into()),
                    free_bytes: 1 << 30,
                }],
            },
        );

        let pools = node_pools_from_crd(&node);
        assert_eq!(pools.node_id, "node-1");
        assert_eq!(pools.pools[0].free_bytes, 1 << 30);
        assert_eq!(pools.pools[0].uuid.as_deref(), Some("42"));
    }

    #[test]
    fn test_conflict_maps_to_resource_exists() {
        let err = kube::Error::Api(kube::error::ErrorResponse {
            status: "Failure".into(),
            message: "already exists".into(),
            reason: "AlreadyExists".into(),
            code: 409,
        });
        assert_matches!(
            map_create_error(err, "ZfsVolume", "pvc-1"),
            Error::ResourceExists { kind, name } if kind == "ZfsVolume" && name == "pvc-1"
        );
    }
}
