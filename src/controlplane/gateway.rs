//! Provisioning Gateway
//!
//! Thin layer over the record store used by the lifecycle API. Submitting a
//! record hands it to the node agent; nothing here waits for the agent or
//! retries a failed call.

use crate::domain::ports::RecordStoreRef;
use crate::domain::records::{RecordStatus, SnapshotRecord, VolumeRecord};
use crate::error::{Error, Result};
use tracing::{debug, info, instrument};

/// Submits records and reads their current state
#[derive(Clone)]
pub struct ProvisioningGateway {
    store: RecordStoreRef,
}

impl ProvisioningGateway {
    pub fn new(store: RecordStoreRef) -> Self {
        Self { store }
    }

    /// Name of the backing store
    pub fn store_name(&self) -> &str {
        self.store.store_name()
    }

    // =========================================================================
    // Volumes
    // =========================================================================

    /// Create-or-fail a Pending volume record
    #[instrument(skip(self, record), fields(volume = %record.name))]
    pub async fn submit_volume(&self, record: VolumeRecord) -> Result<VolumeRecord> {
        let stored = self.store.create_volume(record).await?;
        info!(
            node = %stored.spec.owner_node,
            pool = %stored.spec.pool_name,
            capacity_bytes = stored.spec.capacity_bytes,
            "Submitted volume"
        );
        Ok(stored)
    }

    /// Fetch a volume, NotFound when absent
    #[instrument(skip(self))]
    pub async fn get_volume(&self, name: &str) -> Result<VolumeRecord> {
        self.find_volume(name)
            .await?
            .ok_or_else(|| Error::VolumeNotFound { name: name.to_string() })
    }

    /// Fetch a volume, `None` when absent
    pub async fn find_volume(&self, name: &str) -> Result<Option<VolumeRecord>> {
        self.store.get_volume(name).await
    }

    /// Set the deletion marker on a volume
    #[instrument(skip(self))]
    pub async fn delete_volume(&self, name: &str) -> Result<()> {
        self.store.mark_volume_deleted(name).await?;
        info!("Marked volume for deletion");
        Ok(())
    }

    /// Record a new capacity target for the node agent
    #[instrument(skip(self, record), fields(volume = %record.name))]
    pub async fn resize_volume(&self, record: &VolumeRecord, capacity_bytes: u64) -> Result<()> {
        self.store
            .update_volume_capacity(&record.name, capacity_bytes)
            .await?;
        info!(
            from = record.spec.capacity_bytes,
            to = capacity_bytes,
            "Resized volume"
        );
        Ok(())
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    /// Create-or-fail a Pending snapshot record
    #[instrument(skip(self, record), fields(snapshot = %record.snapshot_id()))]
    pub async fn submit_snapshot(&self, record: SnapshotRecord) -> Result<SnapshotRecord> {
        let stored = self.store.create_snapshot(record).await?;
        info!(node = %stored.spec.owner_node, "Submitted snapshot");
        Ok(stored)
    }

    /// Fetch a snapshot, NotFound when absent
    #[instrument(skip(self))]
    pub async fn get_snapshot(&self, name: &str) -> Result<SnapshotRecord> {
        self.find_snapshot(name)
            .await?
            .ok_or_else(|| Error::SnapshotNotFound { name: name.to_string() })
    }

    /// Fetch a snapshot, `None` when absent
    pub async fn find_snapshot(&self, name: &str) -> Result<Option<SnapshotRecord>> {
        self.store.get_snapshot(name).await
    }

    /// Current status of a snapshot
    pub async fn snapshot_status(&self, name: &str) -> Result<RecordStatus> {
        let status = self.get_snapshot(name).await?.status;
        debug!(snapshot = name, %status, "Read snapshot status");
        Ok(status)
    }

    /// Set the deletion marker on a snapshot
    #[instrument(skip(self))]
    pub async fn delete_snapshot(&self, name: &str) -> Result<()> {
        self.store.mark_snapshot_deleted(name).await?;
        info!("Marked snapshot for deletion");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controlplane::stores::InMemoryRecordStore;
    use crate::domain::records::VolumeSpec;
    use assert_matches::assert_matches;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn volume(name: &str) -> VolumeRecord {
        VolumeRecord {
            name: name.to_string(),
            spec: VolumeSpec {
                owner_node: "node-1".into(),
                pool_name: "zfspv-pool".into(),
                capacity_bytes: 1 << 30,
                ..Default::default()
            },
            labels: BTreeMap::new(),
            status: RecordStatus::Pending,
            deletion_timestamp: None,
        }
    }

    fn gateway() -> (ProvisioningGateway, Arc<InMemoryRecordStore>) {
        let store = Arc::new(InMemoryRecordStore::new());
        (ProvisioningGateway::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_submit_and_get() {
        let (gateway, _) = gateway();
        gateway.submit_volume(volume("pvc-1")).await.unwrap();

        let record = gateway.get_volume("pvc-1").await.unwrap();
        assert_eq!(record.status, RecordStatus::Pending);
        assert_eq!(gateway.store_name(), "memory");
    }

    #[tokio::test]
    async fn test_submit_twice_already_exists() {
        let (gateway, _) = gateway();
        gateway.submit_volume(volume("pvc-1")).await.unwrap();

        let err = gateway.submit_volume(volume("pvc-1")).await.unwrap_err();
        assert!(err.is_already_exists());
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let (gateway, _) = gateway();
        assert_matches!(gateway.get_volume("nope").await, Err(Error::VolumeNotFound { .. }));
        assert_matches!(gateway.get_snapshot("nope").await, Err(Error::SnapshotNotFound { .. }));
        assert!(gateway.find_volume("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resize_updates_capacity() {
        let (gateway, _) = gateway();
        let record = gateway.submit_volume(volume("pvc-1")).await.unwrap();

        gateway.resize_volume(&record, 2 << 30).await.unwrap();
        assert_eq!(gateway.get_volume("pvc-1").await.unwrap().spec.capacity_bytes, 2 << 30);
    }

    #[tokio::test]
    async fn test_snapshot_status_follows_executor() {
        let (gateway, store) = gateway();
        let source = volume("pvc-1");
        gateway
            .submit_snapshot(SnapshotRecord {
                name: "snap-1".into(),
                source_volume: source.name.clone(),
                spec: source.spec.clone(),
                labels: BTreeMap::new(),
                status: RecordStatus::Pending,
                deletion_timestamp: None,
            })
            .await
            .unwrap();

        assert_eq!(gateway.snapshot_status("snap-1").await.unwrap(), RecordStatus::Pending);
        store.set_snapshot_status("snap-1", RecordStatus::Ready).unwrap();
        assert_eq!(gateway.snapshot_status("snap-1").await.unwrap(), RecordStatus::Ready);

        gateway.delete_snapshot("snap-1").await.unwrap();
        assert!(gateway.get_snapshot("snap-1").await.unwrap().is_deleting());
    }
}
