//! Scheduling Policies
//!
//! Named placement strategies selectable through the `scheduler` volume
//! parameter.

use serde::{Deserialize, Serialize};

// =============================================================================
// Scheduler Policy
// =============================================================================

/// Strategy for choosing among capacity-eligible nodes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchedulerPolicy {
    /// Fewest volumes already placed on the pool
    #[default]
    VolumeWeighted,
    /// Most free bytes in the pool
    CapacityWeighted,
}

impl SchedulerPolicy {
    /// Parse a policy token, case-insensitively
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_lowercase().as_str() {
            "volumeweighted" | "volume-weighted" => Some(SchedulerPolicy::VolumeWeighted),
            "capacityweighted" | "capacity-weighted" => Some(SchedulerPolicy::CapacityWeighted),
            _ => None,
        }
    }

    /// Resolve the request's token, falling back to `default` when the token
    /// is absent or unknown
    pub fn resolve(token: Option<&str>, default: SchedulerPolicy) -> Self {
        token.and_then(Self::parse).unwrap_or(default)
    }

    /// Whether candidates need per-pool volume counts
    pub fn needs_volume_counts(&self) -> bool {
        matches!(self, SchedulerPolicy::VolumeWeighted)
    }
}

impl std::fmt::Display for SchedulerPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulerPolicy::VolumeWeighted => write!(f, "VolumeWeighted"),
            SchedulerPolicy::CapacityWeighted => write!(f, "CapacityWeighted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(
            SchedulerPolicy::parse("CapacityWeighted"),
            Some(SchedulerPolicy::CapacityWeighted)
        );
        assert_eq!(
            SchedulerPolicy::parse("capacityweighted"),
            Some(SchedulerPolicy::CapacityWeighted)
        );
        assert_eq!(
            SchedulerPolicy::parse(" VOLUMEWEIGHTED "),
            Some(SchedulerPolicy::VolumeWeighted)
        );
        assert_eq!(SchedulerPolicy::parse("binpack"), None);
    }

    #[test]
    fn test_resolve_falls_back_to_default() {
        let default = SchedulerPolicy::CapacityWeighted;
        assert_eq!(SchedulerPolicy::resolve(None, default), default);
        assert_eq!(SchedulerPolicy::resolve(Some("nope"), default), default);
        assert_eq!(
            SchedulerPolicy::resolve(Some("VolumeWeighted"), default),
            SchedulerPolicy::VolumeWeighted
        );
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for policy in [SchedulerPolicy::VolumeWeighted, SchedulerPolicy::CapacityWeighted] {
            assert_eq!(SchedulerPolicy::parse(&policy.to_string()), Some(policy));
        }
    }
}
