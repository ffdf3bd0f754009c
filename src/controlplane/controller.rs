//! Lifecycle Controller
//!
//! Request-handling surface for volumes and snapshots. Every operation is
//! safe to retry: creation compares against an existing record before doing
//! anything, deletion treats an absent record or a set deletion marker as
//! done, and expansion is a no-op when the volume is already large enough.
//! Nothing here waits for the node agent.

use super::gateway::ProvisioningGateway;
use super::metrics::ControllerMetrics;
use super::types::*;
use crate::allocation::{
    normalize_capacity, schedule, CandidateMapBuilder, ScheduleRequest, SchedulerPolicy,
};
use crate::builder::{
    build_clone_record, build_snapshot_record, build_volume_record, CloneRecordConfig,
    SnapshotRecordConfig, VolumeParams, VolumeRecordConfig, SOURCE_VOLUME_LABEL,
};
use crate::config::ControllerConfig;
use crate::domain::ports::{
    PoolInventoryRef, RecordStoreRef, TelemetrySinkRef, UsageEvent, UsageEventKind,
};
use crate::domain::records::{
    RecordStatus, SnapshotId, SnapshotRecord, VolumeRecord, VolumeSpec, LINEAGE_SEPARATOR,
};
use crate::error::{Error, Result};
use chrono::Utc;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

/// Capabilities this controller offers
pub fn default_capabilities() -> Vec<ControllerCapability> {
    vec![
        ControllerCapability::CreateDeleteVolume,
        ControllerCapability::CreateDeleteSnapshot,
        ControllerCapability::CloneVolume,
        ControllerCapability::ExpandVolume,
    ]
}

/// Access modes a volume may be requested with
const SUPPORTED_ACCESS_MODES: &[AccessMode] = &[AccessMode::SingleNodeWriter];

// =============================================================================
// Controller
// =============================================================================

pub struct Controller {
    config: ControllerConfig,
    capabilities: Vec<ControllerCapability>,
    candidates: CandidateMapBuilder,
    gateway: ProvisioningGateway,
    telemetry: TelemetrySinkRef,
    metrics: Option<ControllerMetrics>,
}

impl Controller {
    pub fn new(
        config: ControllerConfig,
        store: RecordStoreRef,
        inventory: PoolInventoryRef,
        telemetry: TelemetrySinkRef,
    ) -> Self {
        Self {
            config,
            capabilities: default_capabilities(),
            candidates: CandidateMapBuilder::new(inventory, store.clone()),
            gateway: ProvisioningGateway::new(store),
            telemetry,
            metrics: None,
        }
    }

    /// Count requests and errors in `metrics`
    pub fn with_metrics(mut self, metrics: ControllerMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Restrict the advertised capability set
    pub fn with_capabilities(mut self, capabilities: Vec<ControllerCapability>) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn gateway(&self) -> &ProvisioningGateway {
        &self.gateway
    }

    fn observe<T>(&self, operation: &str, result: Result<T>) -> Result<T> {
        if let Some(metrics) = &self.metrics {
            metrics.observe(operation, &result);
        }
        if let Err(e) = &result {
            warn!(operation, code = %e.code(), error = %e, "Request failed");
        }
        result
    }

    fn require_capability(&self, capability: ControllerCapability) -> Result<()> {
        if self.capabilities.contains(&capability) {
            Ok(())
        } else {
            Err(Error::UnsupportedCapability {
                capability: capability.to_string(),
            })
        }
    }

    // =========================================================================
    // CreateVolume
    // =========================================================================

    #[instrument(skip(self, request), fields(volume = %request.name))]
    pub async fn create_volume(&self, request: CreateVolumeRequest) -> Result<CreateVolumeResponse> {
        let result = self.create_volume_inner(&request).await;
        self.observe("create_volume", result)
    }

    async fn create_volume_inner(&self, request: &CreateVolumeRequest) -> Result<CreateVolumeResponse> {
        self.validate_create_request(request)?;

        let params = VolumeParams::from_parameters(&request.parameters);
        let capacity_bytes = normalize_capacity(request.required_bytes());
        let lineage = match &request.content_source {
            None => None,
            Some(VolumeContentSource::Volume { volume_id }) => {
                Some(format!("{}{}{}", volume_id, LINEAGE_SEPARATOR, request.name))
            }
            Some(VolumeContentSource::Snapshot { snapshot_id }) => {
                SnapshotId::parse(snapshot_id)?;
                Some(snapshot_id.clone())
            }
        };
        let wanted = Wanted {
            pool_name: params.pool_name.as_deref(),
            capacity_bytes,
            lineage: lineage.as_deref(),
        };

        if let Some(existing) = self.gateway.find_volume(&request.name).await? {
            debug!("Volume record already exists");
            let record = wanted.accept(existing)?;
            return Ok(self.volume_response(&record, request));
        }

        let record = match &request.content_source {
            None => self.scheduled_record(request, &params, capacity_bytes).await?,
            Some(VolumeContentSource::Volume { volume_id }) => {
                let source = self.gateway.get_volume(volume_id).await?;
                check_clone_source(&request.name, &source.name, &source.spec, &wanted)?;

                let labels = BTreeMap::from([(SOURCE_VOLUME_LABEL.to_string(), source.name.clone())]);
                build_clone_record(CloneRecordConfig {
                    name: request.name.clone(),
                    source_spec: source.spec,
                    lineage: lineage.clone().unwrap_or_default(),
                    labels,
                })?
            }
            Some(VolumeContentSource::Snapshot { snapshot_id }) => {
                let id = SnapshotId::parse(snapshot_id)?;
                let snapshot = self.gateway.get_snapshot(&id.snapshot).await?;
                if snapshot.source_volume != id.volume {
                    return Err(Error::SnapshotNotFound {
                        name: snapshot_id.clone(),
                    });
                }
                check_clone_source(&request.name, snapshot_id, &snapshot.spec, &wanted)?;

                build_clone_record(CloneRecordConfig {
                    name: request.name.clone(),
                    source_spec: snapshot.spec,
                    lineage: snapshot_id.clone(),
                    labels: BTreeMap::new(),
                })?
            }
        };

        let record = match self.gateway.submit_volume(record).await {
            Ok(record) => record,
            Err(e) if e.is_already_exists() => {
                // Lost a race with a concurrent create of the same name
                let existing = self.gateway.find_volume(&request.name).await?.ok_or(e)?;
                return Ok(self.volume_response(&wanted.accept(existing)?, request));
            }
            Err(e) => return Err(e),
        };

        info!(
            node = %record.spec.owner_node,
            pool = %record.spec.pool_name,
            capacity_bytes = record.spec.capacity_bytes,
            lineage = ?record.spec.snapshot_lineage,
            "Provisioned volume"
        );

        self.telemetry.emit(UsageEvent {
            kind: UsageEventKind::VolumeProvision,
            claim_name: params.claim_name.clone(),
            volume_name: record.name.clone(),
            capacity_bytes: record.spec.capacity_bytes,
            storage_type: self.config.storage_type.clone(),
        });

        Ok(self.volume_response(&record, request))
    }

    fn validate_create_request(&self, request: &CreateVolumeRequest) -> Result<()> {
        self.require_capability(ControllerCapability::CreateDeleteVolume)?;
        match &request.content_source {
            Some(VolumeContentSource::Volume { .. }) => {
                self.require_capability(ControllerCapability::CloneVolume)?
            }
            Some(VolumeContentSource::Snapshot { .. }) => {
                self.require_capability(ControllerCapability::CreateDeleteSnapshot)?
            }
            None => {}
        }

        if request.name.trim().is_empty() {
            return Err(Error::InvalidArgument("missing volume name".to_string()));
        }
        if request.volume_capabilities.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "missing volume capabilities for {}",
                request.name
            )));
        }
        if let Some(cap) = request
            .volume_capabilities
            .iter()
            .find(|c| !SUPPORTED_ACCESS_MODES.contains(&c.access_mode))
        {
            return Err(Error::InvalidArgument(format!(
                "unsupported access mode {} for {}",
                cap.access_mode, request.name
            )));
        }
        Ok(())
    }

    /// Pick a node and build a plain volume record
    async fn scheduled_record(
        &self,
        request: &CreateVolumeRequest,
        params: &VolumeParams,
        capacity_bytes: u64,
    ) -> Result<VolumeRecord> {
        let policy = SchedulerPolicy::resolve(params.scheduler.as_deref(), self.config.default_scheduler);
        let pool = params.pool_name.as_deref();

        let candidates = self.candidates.build(policy, pool).await?;
        let scheduling_failed = |reason: String| Error::SchedulingFailed {
            volume: request.name.clone(),
            pool: pool.map(str::to_string),
            reason,
        };

        if candidates.is_empty() {
            return Err(scheduling_failed("no node reports a matching pool".to_string()));
        }

        let selection = schedule(
            &ScheduleRequest {
                capacity_bytes,
                pool_name: pool,
                policy,
            },
            &candidates,
        )
        .ok_or_else(|| {
            scheduling_failed(format!(
                "none of {} candidate nodes has {} bytes free",
                candidates.len(),
                capacity_bytes
            ))
        })?;

        info!(node = selection.node_id, pool = selection.pool_name, %policy, "Scheduled volume");

        build_volume_record(VolumeRecordConfig {
            name: request.name.clone(),
            owner_node: selection.node_id.to_string(),
            pool_name: selection.pool_name.to_string(),
            capacity_bytes,
            params: params.clone(),
            labels: BTreeMap::new(),
        })
    }

    fn volume_response(&self, record: &VolumeRecord, request: &CreateVolumeRequest) -> CreateVolumeResponse {
        let topology = BTreeMap::from([(
            self.config.topology_key.clone(),
            record.spec.owner_node.clone(),
        )]);
        let context = BTreeMap::from([(
            self.config.pool_context_key.clone(),
            record.spec.pool_name.clone(),
        )]);

        CreateVolumeResponse {
            volume: Volume {
                volume_id: record.name.clone(),
                capacity_bytes: record.spec.capacity_bytes,
                volume_context: context,
                accessible_topology: vec![topology],
                content_source: request.content_source.clone(),
            },
        }
    }

    // =========================================================================
    // DeleteVolume
    // =========================================================================

    #[instrument(skip(self, request), fields(volume = %request.volume_id))]
    pub async fn delete_volume(&self, request: DeleteVolumeRequest) -> Result<()> {
        let result = self.delete_volume_inner(&request).await;
        self.observe("delete_volume", result)
    }

    async fn delete_volume_inner(&self, request: &DeleteVolumeRequest) -> Result<()> {
        if request.volume_id.trim().is_empty() {
            return Err(Error::InvalidArgument("missing volume id".to_string()));
        }
        self.require_capability(ControllerCapability::CreateDeleteVolume)?;

        let record = match self.gateway.find_volume(&request.volume_id).await? {
            Some(record) if !record.is_deleting() => record,
            _ => {
                debug!("Volume already gone or being deleted");
                return Ok(());
            }
        };

        match self.gateway.delete_volume(&record.name).await {
            Ok(()) => {}
            // Removed between the read and the delete
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e),
        }

        self.telemetry.emit(UsageEvent {
            kind: UsageEventKind::VolumeDeprovision,
            claim_name: None,
            volume_name: record.name.clone(),
            capacity_bytes: record.spec.capacity_bytes,
            storage_type: self.config.storage_type.clone(),
        });
        Ok(())
    }

    // =========================================================================
    // ControllerExpandVolume
    // =========================================================================

    #[instrument(skip(self, request), fields(volume = %request.volume_id))]
    pub async fn expand_volume(
        &self,
        request: ControllerExpandVolumeRequest,
    ) -> Result<ControllerExpandVolumeResponse> {
        let result = self.expand_volume_inner(&request).await;
        self.observe("expand_volume", result)
    }

    async fn expand_volume_inner(
        &self,
        request: &ControllerExpandVolumeRequest,
    ) -> Result<ControllerExpandVolumeResponse> {
        if request.volume_id.trim().is_empty() {
            return Err(Error::InvalidArgument("missing volume id".to_string()));
        }
        self.require_capability(ControllerCapability::ExpandVolume)?;

        let target = normalize_capacity(request.capacity_range.map_or(0, |r| r.required_bytes));
        let record = self.gateway.get_volume(&request.volume_id).await?;

        if record.spec.capacity_bytes >= target {
            debug!(current = record.spec.capacity_bytes, target, "Volume already large enough");
            return Ok(ControllerExpandVolumeResponse {
                capacity_bytes: record.spec.capacity_bytes,
                node_expansion_required: false,
            });
        }

        self.gateway.resize_volume(&record, target).await?;
        Ok(ControllerExpandVolumeResponse {
            capacity_bytes: target,
            node_expansion_required: true,
        })
    }

    // =========================================================================
    // CreateSnapshot
    // =========================================================================

    #[instrument(skip(self, request), fields(snapshot = %request.name, volume = %request.source_volume_id))]
    pub async fn create_snapshot(&self, request: CreateSnapshotRequest) -> Result<CreateSnapshotResponse> {
        let result = self.create_snapshot_inner(&request).await;
        self.observe("create_snapshot", result)
    }

    async fn create_snapshot_inner(&self, request: &CreateSnapshotRequest) -> Result<CreateSnapshotResponse> {
        self.require_capability(ControllerCapability::CreateDeleteSnapshot)?;
        if request.name.trim().is_empty() {
            return Err(Error::InvalidArgument("missing snapshot name".to_string()));
        }
        if request.source_volume_id.trim().is_empty() {
            return Err(Error::InvalidArgument(format!(
                "missing source volume id for snapshot {}",
                request.name
            )));
        }

        if let Some(existing) = self.gateway.find_snapshot(&request.name).await? {
            debug!(status = %existing.status, "Snapshot record already exists");
            return existing_snapshot_response(request, existing);
        }

        let source = self.gateway.get_volume(&request.source_volume_id).await?;
        let record = build_snapshot_record(SnapshotRecordConfig {
            name: request.name.clone(),
            source: &source,
            labels: BTreeMap::new(),
        })?;

        match self.gateway.submit_snapshot(record).await {
            Ok(_) => {}
            Err(e) if e.is_already_exists() => {
                debug!("Snapshot created concurrently");
                let existing = self.gateway.find_snapshot(&request.name).await?.ok_or(e)?;
                return existing_snapshot_response(request, existing);
            }
            Err(e) => return Err(e),
        }

        let status = self.gateway.snapshot_status(&request.name).await?;
        Ok(snapshot_response(
            request,
            source.spec.capacity_bytes,
            status == RecordStatus::Ready,
        ))
    }

    // =========================================================================
    // DeleteSnapshot
    // =========================================================================

    #[instrument(skip(self, request), fields(snapshot = %request.snapshot_id))]
    pub async fn delete_snapshot(&self, request: DeleteSnapshotRequest) -> Result<()> {
        let result = self.delete_snapshot_inner(&request).await;
        self.observe("delete_snapshot", result)
    }

    async fn delete_snapshot_inner(&self, request: &DeleteSnapshotRequest) -> Result<()> {
        self.require_capability(ControllerCapability::CreateDeleteSnapshot)?;
        let id = SnapshotId::parse(&request.snapshot_id)?;

        // A snapshot of another volume under the same name is not this one
        match self.gateway.find_snapshot(&id.snapshot).await? {
            Some(snapshot) if !snapshot.is_deleting() && snapshot.source_volume == id.volume => {}
            _ => {
                debug!("Snapshot already gone or being deleted");
                return Ok(());
            }
        }

        match self.gateway.delete_snapshot(&id.snapshot).await {
            Err(e) if e.is_not_found() => Ok(()),
            other => other,
        }
    }

    // =========================================================================
    // Capabilities / Unimplemented
    // =========================================================================

    pub fn get_capabilities(&self) -> Vec<ControllerCapability> {
        self.capabilities.clone()
    }

    pub fn list_volumes(&self) -> Result<()> {
        self.observe("list_volumes", unimplemented("ListVolumes"))
    }

    pub fn list_snapshots(&self) -> Result<()> {
        self.observe("list_snapshots", unimplemented("ListSnapshots"))
    }

    pub fn get_capacity(&self) -> Result<()> {
        self.observe("get_capacity", unimplemented("GetCapacity"))
    }

    pub fn publish_volume(&self, _volume_id: &str) -> Result<()> {
        self.observe("publish_volume", unimplemented("ControllerPublishVolume"))
    }

    pub fn unpublish_volume(&self, _volume_id: &str) -> Result<()> {
        self.observe("unpublish_volume", unimplemented("ControllerUnpublishVolume"))
    }

    pub fn validate_volume_capabilities(&self, _volume_id: &str) -> Result<()> {
        self.observe(
            "validate_volume_capabilities",
            unimplemented("ValidateVolumeCapabilities"),
        )
    }
}

fn unimplemented(operation: &'static str) -> Result<()> {
    Err(Error::Unimplemented { operation })
}

// =============================================================================
// Helpers
// =============================================================================

/// Defining attributes of a creation request
struct Wanted<'a> {
    pool_name: Option<&'a str>,
    capacity_bytes: u64,
    lineage: Option<&'a str>,
}

impl Wanted<'_> {
    /// Accept an existing record as the result of this request, or report
    /// the name as taken
    fn accept(&self, existing: VolumeRecord) -> Result<VolumeRecord> {
        if !existing.is_deleting()
            && existing.matches_request(self.pool_name, self.capacity_bytes, self.lineage)
        {
            return Ok(existing);
        }
        Err(Error::ResourceExists {
            kind: "ZfsVolume".to_string(),
            name: existing.name,
        })
    }
}

/// A clone must live on its source's pool with its source's capacity
fn check_clone_source(clone: &str, source_name: &str, source: &VolumeSpec, wanted: &Wanted<'_>) -> Result<()> {
    let requested_pool = wanted.pool_name.unwrap_or("");
    if source.pool_name != requested_pool {
        return Err(Error::ClonePoolMismatch {
            clone: clone.to_string(),
            source_name: source_name.to_string(),
            source_pool: source.pool_name.clone(),
            requested_pool: requested_pool.to_string(),
        });
    }
    if source.capacity_bytes != wanted.capacity_bytes {
        return Err(Error::CloneCapacityMismatch {
            clone: clone.to_string(),
            source_name: source_name.to_string(),
            source_bytes: source.capacity_bytes,
            requested_bytes: wanted.capacity_bytes,
        });
    }
    Ok(())
}

/// Answer a CreateSnapshot from a record that already exists under the name
fn existing_snapshot_response(
    request: &CreateSnapshotRequest,
    existing: SnapshotRecord,
) -> Result<CreateSnapshotResponse> {
    if existing.source_volume != request.source_volume_id {
        return Err(Error::ResourceExists {
            kind: "ZfsSnapshot".to_string(),
            name: existing.snapshot_id(),
        });
    }
    Ok(snapshot_response(request, existing.spec.capacity_bytes, existing.is_ready()))
}

fn snapshot_response(request: &CreateSnapshotRequest, size_bytes: u64, ready_to_use: bool) -> CreateSnapshotResponse {
    CreateSnapshotResponse {
        snapshot: Snapshot {
            snapshot_id: SnapshotId::new(&request.source_volume_id, &request.name).to_string(),
            source_volume_id: request.source_volume_id.clone(),
            size_bytes,
            creation_time: Utc::now(),
            ready_to_use,
        },
    }
}
