//! Candidate Map Builder
//!
//! Gathers one eligible pool per node from the inventory feed. The map is
//! rebuilt for every scheduling decision and never cached, so placement
//! always sees the latest reported free space.

use super::placement::{Candidate, CandidateMap};
use super::policy::SchedulerPolicy;
use crate::domain::ports::{NodePools, PoolInfo, PoolInventoryRef, RecordStoreRef};
use crate::error::{Error, Result};
use std::collections::HashMap;
use tracing::debug;

// =============================================================================
// Candidate Map Builder
// =============================================================================

/// Builds candidate maps from the inventory and record store
#[derive(Clone)]
pub struct CandidateMapBuilder {
    inventory: PoolInventoryRef,
    store: RecordStoreRef,
}

impl CandidateMapBuilder {
    pub fn new(inventory: PoolInventoryRef, store: RecordStoreRef) -> Self {
        Self { inventory, store }
    }

    /// Build the candidate map for a policy and optional pool filter.
    ///
    /// An empty map is a valid result; callers treat it as a scheduling
    /// failure.
    pub async fn build(
        &self,
        policy: SchedulerPolicy,
        pool_filter: Option<&str>,
    ) -> Result<CandidateMap> {
        let nodes = self.inventory.node_pools();

        let (nodes, counts) = if policy.needs_volume_counts() {
            futures::try_join!(nodes, self.volume_counts())?
        } else {
            (nodes.await?, HashMap::new())
        };

        let map = gather_candidates(&nodes, pool_filter, &counts);

        debug!(
            policy = %policy,
            pool = ?pool_filter,
            nodes = nodes.len(),
            candidates = map.len(),
            "Built candidate map"
        );

        Ok(map)
    }

    /// Count live volumes per (node, pool)
    async fn volume_counts(&self) -> Result<HashMap<(String, String), u64>> {
        let volumes = self
            .store
            .list_volumes()
            .await
            .map_err(|e| Error::Inventory(format!("listing volumes: {}", e)))?;

        let mut counts = HashMap::new();
        for volume in volumes.iter().filter(|v| !v.is_deleting()) {
            *counts
                .entry((volume.spec.owner_node.clone(), volume.spec.pool_name.clone()))
                .or_insert(0) += 1;
        }
        Ok(counts)
    }
}

/// Pick one pool per node.
///
/// With a filter the node's pool of that name is used; without one, the
/// node's pool with the most free bytes (ties by pool name).
fn gather_candidates(
    nodes: &[NodePools],
    pool_filter: Option<&str>,
    counts: &HashMap<(String, String), u64>,
) -> CandidateMap {
    let mut map = CandidateMap::new();

    for node in nodes {
        let pool = match pool_filter {
            Some(name) => node.pools.iter().find(|p| p.name == name),
            None => node.pools.iter().min_by(|a, b| most_free_first(a, b)),
        };

        let Some(pool) = pool else {
            continue;
        };

        let volume_count = counts
            .get(&(node.node_id.clone(), pool.name.clone()))
            .copied()
            .unwrap_or(0);

        map.insert(
            node.node_id.clone(),
            Candidate {
                node_id: node.node_id.clone(),
                pool_name: pool.name.clone(),
                free_bytes: pool.free_bytes,
                volume_count,
            },
        );
    }

    map
}

fn most_free_first(a: &PoolInfo, b: &PoolInfo) -> std::cmp::Ordering {
    b.free_bytes
        .cmp(&a.free_bytes)
        .then_with(|| a.name.cmp(&b.name))
}
