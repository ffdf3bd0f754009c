//! Snapshot Record Builder

use super::require;
use super::volume::with_managed_by;
use super::SNAPSHOT_VOLUME_LABEL;
use crate::domain::records::{RecordStatus, SnapshotRecord, VolumeRecord};
use crate::error::Result;
use std::collections::BTreeMap;

const KIND: &str = "ZfsSnapshot";

/// Everything needed to describe a snapshot of a volume
#[derive(Debug, Clone)]
pub struct SnapshotRecordConfig<'a> {
    /// Snapshot half of the lineage id
    pub name: String,
    pub source: &'a VolumeRecord,
    pub labels: BTreeMap<String, String>,
}

/// Build a Pending snapshot record mirroring its source volume.
///
/// Pool, capacity and owner node are copied from the source and never
/// change afterwards.
pub fn build_snapshot_record(config: SnapshotRecordConfig<'_>) -> Result<SnapshotRecord> {
    require(KIND, &config.name, "name", &config.name)?;
    require(KIND, &config.name, "source volume", &config.source.name)?;
    require(KIND, &config.name, "owner node", &config.source.spec.owner_node)?;

    let mut labels = with_managed_by(config.labels);
    labels.insert(SNAPSHOT_VOLUME_LABEL.to_string(), config.source.name.clone());

    Ok(SnapshotRecord {
        name: config.name,
        source_volume: config.source.name.clone(),
        spec: config.source.spec.clone(),
        labels,
        status: RecordStatus::Pending,
        deletion_timestamp: None,
    })
}
