//! Placement Scheduler
//!
//! Pure selection of the owner node for a new volume. Nothing is reserved:
//! if the subsequent record submission fails, the selection is simply
//! discarded.

use super::policy::SchedulerPolicy;
use std::cmp::{Ordering, Reverse};
use std::collections::BTreeMap;

// =============================================================================
// Candidate
// =============================================================================

/// A node's eligible pool for one scheduling decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Node ID
    pub node_id: String,
    /// Pool on that node
    pub pool_name: String,
    /// Free bytes reported for the pool
    pub free_bytes: u64,
    /// Live volumes already placed on the pool
    pub volume_count: u64,
}

/// Node ID to candidate, iterated in node ID order
pub type CandidateMap = BTreeMap<String, Candidate>;

// =============================================================================
// Schedule Request / Selection
// =============================================================================

/// Inputs to a scheduling decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleRequest<'a> {
    /// Normalized capacity of the volume
    pub capacity_bytes: u64,
    /// Requested pool, if any
    pub pool_name: Option<&'a str>,
    /// Placement strategy
    pub policy: SchedulerPolicy,
}

/// The chosen node and pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection<'a> {
    pub node_id: &'a str,
    pub pool_name: &'a str,
}

// =============================================================================
// Scheduler
// =============================================================================

/// Select exactly one node, or none.
///
/// Candidates must match the requested pool (when given) and have at least
/// `capacity_bytes` free. Among those the policy decides; ties go to the
/// lexicographically smallest node ID.
pub fn schedule<'a>(
    request: &ScheduleRequest<'_>,
    candidates: &'a CandidateMap,
) -> Option<Selection<'a>> {
    candidates
        .values()
        .filter(|c| is_eligible(request, c))
        .min_by(|a, b| compare(request.policy, a, b))
        .map(|c| Selection {
            node_id: &c.node_id,
            pool_name: &c.pool_name,
        })
}

fn is_eligible(request: &ScheduleRequest<'_>, candidate: &Candidate) -> bool {
    if let Some(pool) = request.pool_name {
        if candidate.pool_name != pool {
            return false;
        }
    }
    candidate.free_bytes >= request.capacity_bytes
}

/// Order candidates best-first
fn compare(policy: SchedulerPolicy, a: &Candidate, b: &Candidate) -> Ordering {
    let by_policy = match policy {
        SchedulerPolicy::VolumeWeighted => a.volume_count.cmp(&b.volume_count),
        SchedulerPolicy::CapacityWeighted => Reverse(a.free_bytes).cmp(&Reverse(b.free_bytes)),
    };
    by_policy.then_with(|| a.node_id.cmp(&b.node_id))
}
