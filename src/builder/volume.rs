//! Volume Record Builder
//!
//! Plain volumes are built from request parameters plus the scheduler's
//! choice; clones are built from their source's spec so they inherit every
//! property along with the owner node.

use super::params::VolumeParams;
use super::{require, MANAGED_BY, MANAGED_BY_LABEL};
use crate::domain::records::{RecordStatus, VolumeRecord, VolumeSpec, VolumeType};
use crate::error::Result;
use std::collections::BTreeMap;

const KIND: &str = "ZfsVolume";

// =============================================================================
// Plain Volume
// =============================================================================

/// Everything needed to describe a freshly scheduled volume
#[derive(Debug, Clone, Default)]
pub struct VolumeRecordConfig {
    pub name: String,
    /// Node chosen by the scheduler
    pub owner_node: String,
    /// Pool chosen by the scheduler
    pub pool_name: String,
    /// Normalized capacity
    pub capacity_bytes: u64,
    pub params: VolumeParams,
    pub labels: BTreeMap<String, String>,
}

/// Build a Pending volume record
pub fn build_volume_record(config: VolumeRecordConfig) -> Result<VolumeRecord> {
    require(KIND, &config.name, "name", &config.name)?;
    require(KIND, &config.name, "owner node", &config.owner_node)?;
    require(KIND, &config.name, "pool name", &config.pool_name)?;

    let params = config.params;
    let spec = VolumeSpec {
        owner_node: config.owner_node,
        pool_name: config.pool_name,
        capacity_bytes: config.capacity_bytes,
        record_size: params.record_size,
        vol_block_size: params.vol_block_size,
        compression: params.compression,
        dedup: params.dedup,
        encryption: params.encryption,
        key_format: params.key_format,
        key_location: params.key_location,
        thin_provision: params.thin_provision,
        volume_type: VolumeType::from_fs_type(params.fs_type.as_deref()),
        fs_type: params.fs_type,
        shared: params.shared,
        snapshot_lineage: None,
    };

    Ok(VolumeRecord {
        name: config.name,
        spec,
        labels: with_managed_by(config.labels),
        status: RecordStatus::Pending,
        deletion_timestamp: None,
    })
}

// =============================================================================
// Clone
// =============================================================================

/// Everything needed to describe a clone of a volume or snapshot
#[derive(Debug, Clone)]
pub struct CloneRecordConfig {
    pub name: String,
    /// Spec of the source volume or snapshot
    pub source_spec: VolumeSpec,
    /// `<source>@<name>` lineage
    pub lineage: String,
    pub labels: BTreeMap<String, String>,
}

/// Build a Pending clone record that lives where its source lives
pub fn build_clone_record(config: CloneRecordConfig) -> Result<VolumeRecord> {
    require(KIND, &config.name, "name", &config.name)?;
    require(KIND, &config.name, "lineage", &config.lineage)?;
    require(KIND, &config.name, "owner node", &config.source_spec.owner_node)?;
    require(KIND, &config.name, "pool name", &config.source_spec.pool_name)?;

    let spec = VolumeSpec {
        snapshot_lineage: Some(config.lineage),
        ..config.source_spec
    };

    Ok(VolumeRecord {
        name: config.name,
        spec,
        labels: with_managed_by(config.labels),
        status: RecordStatus::Pending,
        deletion_timestamp: None,
    })
}

pub(crate) fn with_managed_by(mut labels: BTreeMap<String, String>) -> BTreeMap<String, String> {
    labels.insert(MANAGED_BY_LABEL.to_string(), MANAGED_BY.to_string());
    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SOURCE_VOLUME_LABEL;
    use crate::error::Error;
    use assert_matches::assert_matches;

    fn config() -> VolumeRecordConfig {
        VolumeRecordConfig {
            name: "pvc-1".into(),
            owner_node: "node-1".into(),
            pool_name: "zfspv-pool".into(),
            capacity_bytes: 1 << 30,
            params: VolumeParams {
                compression: Some("lz4".into()),
                fs_type: Some("zfs".into()),
                ..Default::default()
            },
            labels: BTreeMap::new(),
        }
    }

    #[test]
    fn test_build_volume_record() {
        let record = build_volume_record(config()).unwrap();

        assert_eq!(record.name, "pvc-1");
        assert_eq!(record.status, RecordStatus::Pending);
        assert_eq!(record.spec.owner_node, "node-1");
        assert_eq!(record.spec.pool_name, "zfspv-pool");
        assert_eq!(record.spec.capacity_bytes, 1 << 30);
        assert_eq!(record.spec.compression.as_deref(), Some("lz4"));
        assert_eq!(record.spec.volume_type, VolumeType::Dataset);
        assert_eq!(record.spec.snapshot_lineage, None);
        assert_eq!(record.labels[MANAGED_BY_LABEL], MANAGED_BY);
        assert!(record.deletion_timestamp.is_none());
    }

    #[test]
    fn test_build_rejects_missing_fields() {
        let mut missing_name = config();
        missing_name.name = String::new();
        assert_matches!(
            build_volume_record(missing_name),
            Err(Error::RecordBuild { reason, .. }) if reason == "missing name"
        );

        let mut missing_node = config();
        missing_node.owner_node = "  ".into();
        assert_matches!(
            build_volume_record(missing_node),
            Err(Error::RecordBuild { reason, .. }) if reason == "missing owner node"
        );

        let mut missing_pool = config();
        missing_pool.pool_name = String::new();
        assert_matches!(build_volume_record(missing_pool), Err(Error::RecordBuild { .. }));
    }

    #[test]
    fn test_build_clone_inherits_source_spec() {
        let source = build_volume_record(config()).unwrap();
        let labels = BTreeMap::from([(SOURCE_VOLUME_LABEL.to_string(), "pvc-1".to_string())]);

        let clone = build_clone_record(CloneRecordConfig {
            name: "pvc-2".into(),
            source_spec: source.spec.clone(),
            lineage: "pvc-1@pvc-2".into(),
            labels,
        })
        .unwrap();

        assert_eq!(clone.name, "pvc-2");
        assert_eq!(clone.status, RecordStatus::Pending);
        assert_eq!(clone.spec.owner_node, source.spec.owner_node);
        assert_eq!(clone.spec.pool_name, source.spec.pool_name);
        assert_eq!(clone.spec.capacity_bytes, source.spec.capacity_bytes);
        assert_eq!(clone.spec.compression, source.spec.compression);
        assert_eq!(clone.spec.snapshot_lineage.as_deref(), Some("pvc-1@pvc-2"));
        assert_eq!(clone.labels[SOURCE_VOLUME_LABEL], "pvc-1");
    }
}
