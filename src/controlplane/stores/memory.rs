//! In-Memory Record Store and Pool Inventory
//!
//! Used in standalone mode and by tests. The `DashMap` entry API gives the
//! same per-name create-or-fail atomicity Kubernetes gives the CRD store.
//! The `set_*_status` and `remove_*` helpers stand in for the node agent.

use crate::domain::ports::{NodePools, PoolInfo, PoolInventory, RecordStore};
use crate::domain::records::{RecordStatus, SnapshotRecord, VolumeRecord};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

// =============================================================================
// In-Memory Record Store
// =============================================================================

/// Record store backed by concurrent maps
#[derive(Default)]
pub struct InMemoryRecordStore {
    volumes: DashMap<String, VolumeRecord>,
    snapshots: DashMap<String, SnapshotRecord>,
    /// Number of store calls served
    calls: AtomicU64,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of store calls served so far
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn volume_count(&self) -> usize {
        self.volumes.len()
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    /// Read a volume without counting it as a store call
    pub fn volume(&self, name: &str) -> Option<VolumeRecord> {
        self.volumes.get(name).map(|v| v.clone())
    }

    /// Read a snapshot without counting it as a store call
    pub fn snapshot(&self, name: &str) -> Option<SnapshotRecord> {
        self.snapshots.get(name).map(|s| s.clone())
    }

    /// Set a volume's status as the node agent would
    pub fn set_volume_status(&self, name: &str, status: RecordStatus) -> Result<()> {
        let mut record = self
            .volumes
            .get_mut(name)
            .ok_or_else(|| Error::VolumeNotFound { name: name.to_string() })?;
        record.status = status;
        Ok(())
    }

    /// Set a snapshot's status as the node agent would
    pub fn set_snapshot_status(&self, name: &str, status: RecordStatus) -> Result<()> {
        let mut record = self
            .snapshots
            .get_mut(name)
            .ok_or_else(|| Error::SnapshotNotFound { name: name.to_string() })?;
        record.status = status;
        Ok(())
    }

    /// Drop a volume record, as the node agent does once teardown finishes
    pub fn remove_volume(&self, name: &str) -> Option<VolumeRecord> {
        self.volumes.remove(name).map(|(_, v)| v)
    }

    /// Drop a snapshot record
    pub fn remove_snapshot(&self, name: &str) -> Option<SnapshotRecord> {
        self.snapshots.remove(name).map(|(_, s)| s)
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn create_volume(&self, record: VolumeRecord) -> Result<VolumeRecord> {
        self.touch();
        match self.volumes.entry(record.name.clone()) {
            Entry::Occupied(_) => Err(Error::ResourceExists {
                kind: "ZfsVolume".to_string(),
                name: record.name,
            }),
            Entry::Vacant(slot) => {
                debug!(volume = %record.name, node = %record.spec.owner_node, "Stored volume record");
                slot.insert(record.clone());
                Ok(record)
            }
        }
    }

    async fn get_volume(&self, name: &str) -> Result<Option<VolumeRecord>> {
        self.touch();
        Ok(self.volumes.get(name).map(|v| v.clone()))
    }

    async fn list_volumes(&self) -> Result<Vec<VolumeRecord>> {
        self.touch();
        Ok(self.volumes.iter().map(|v| v.value().clone()).collect())
    }

    async fn mark_volume_deleted(&self, name: &str) -> Result<()> {
        self.touch();
        let mut record = self
            .volumes
            .get_mut(name)
            .ok_or_else(|| Error::VolumeNotFound { name: name.to_string() })?;
        record.deletion_timestamp.get_or_insert_with(Utc::now);
        Ok(())
    }

    async fn update_volume_capacity(&self, name: &str, capacity_bytes: u64) -> Result<()> {
        self.touch();
        let mut record = self
            .volumes
            .get_mut(name)
            .ok_or_else(|| Error::VolumeNotFound { name: name.to_string() })?;
        record.spec.capacity_bytes = capacity_bytes;
        Ok(())
    }

    async fn create_snapshot(&self, record: SnapshotRecord) -> Result<SnapshotRecord> {
        self.touch();
        match self.snapshots.entry(record.name.clone()) {
            Entry::Occupied(_) => Err(Error::ResourceExists {
                kind: "ZfsSnapshot".to_string(),
                name: record.name,
            }),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(record)
            }
        }
    }

    async fn get_snapshot(&self, name: &str) -> Result<Option<SnapshotRecord>> {
        self.touch();
        Ok(self.snapshots.get(name).map(|s| s.clone()))
    }

    async fn mark_snapshot_deleted(&self, name: &str) -> Result<()> {
        self.touch();
        let mut record = self
            .snapshots
            .get_mut(name)
            .ok_or_else(|| Error::SnapshotNotFound { name: name.to_string() })?;
        record.deletion_timestamp.get_or_insert_with(Utc::now);
        Ok(())
    }

    fn store_name(&self) -> &str {
        "memory"
    }
}

// =============================================================================
// Static Pool Inventory
// =============================================================================

/// Pool inventory held in memory, keyed by node id
#[derive(Default)]
pub struct StaticPoolInventory {
    nodes: RwLock<BTreeMap<String, Vec<PoolInfo>>>,
}

impl StaticPoolInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from a list of nodes
    pub fn from_nodes(nodes: Vec<NodePools>) -> Self {
        let inventory = Self::new();
        for node in nodes {
            inventory.set_node_pools(&node.node_id, node.pools);
        }
        inventory
    }

    /// Replace the pools reported for a node
    pub fn set_node_pools(&self, node_id: &str, pools: Vec<PoolInfo>) {
        self.nodes.write().insert(node_id.to_string(), pools);
    }

    pub fn remove_node(&self, node_id: &str) {
        self.nodes.write().remove(node_id);
    }
}

#[async_trait]
impl PoolInventory for StaticPoolInventory {
    async fn node_pools(&self) -> Result<Vec<NodePools>> {
        Ok(self
            .nodes
            .read()
            .iter()
            .map(|(node_id, pools)| NodePools {
                node_id: node_id.clone(),
                pools: pools.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::records::VolumeSpec;
    use assert_matches::assert_matches;

    fn volume(name: &str) -> VolumeRecord {
        VolumeRecord {
            name: name.to_string(),
            spec: VolumeSpec {
                owner_node: "node-1".into(),
                pool_name: "zfspv-pool".into(),
                capacity_bytes: 1 << 20,
                ..Default::default()
            },
            labels: BTreeMap::new(),
            status: RecordStatus::Pending,
            deletion_timestamp: None,
        }
    }

    #[tokio::test]
    async fn test_create_is_create_or_fail() {
        let store = InMemoryRecordStore::new();
        store.create_volume(volume("pvc-1")).await.unwrap();

        assert_matches!(
            store.create_volume(volume("pvc-1")).await,
            Err(Error::ResourceExists { name, .. }) if name == "pvc-1"
        );
        assert_eq!(store.volume_count(), 1);
    }

    #[tokio::test]
    async fn test_mark_deleted_keeps_first_timestamp() {
        let store = InMemoryRecordStore::new();
        store.create_volume(volume("pvc-1")).await.unwrap();

        store.mark_volume_deleted("pvc-1").await.unwrap();
        let first = store.get_volume("pvc-1").await.unwrap().unwrap().deletion_timestamp;
        store.mark_volume_deleted("pvc-1").await.unwrap();
        let second = store.get_volume("pvc-1").await.unwrap().unwrap().deletion_timestamp;

        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_missing_records() {
        let store = InMemoryRecordStore::new();
        assert!(store.get_volume("nope").await.unwrap().is_none());
        assert_matches!(
            store.update_volume_capacity("nope", 1).await,
            Err(Error::VolumeNotFound { .. })
        );
        assert_matches!(
            store.mark_snapshot_deleted("nope").await,
            Err(Error::SnapshotNotFound { .. })
        );
        assert_eq!(store.call_count(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_creates_single_winner() {
        let store = std::sync::Arc::new(InMemoryRecordStore::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.create_volume(volume("pvc-1")).await.is_ok()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_static_inventory() {
        let inventory = StaticPoolInventory::new();
        inventory.set_node_pools(
            "node-2",
            vec![PoolInfo { name: "zfspv-pool".into(), uuid: None, free_bytes: 10 }],
        );
        inventory.set_node_pools("node-1", vec![]);

        let nodes = inventory.node_pools().await.unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].node_id, "node-1");

        inventory.remove_node("node-1");
        assert_eq!(inventory.node_pools().await.unwrap().len(), 1);
    }
}
