//! Custom Resource Definitions for node-local ZFS volumes
//!
//! This module contains all CRD types:
//! - ZfsVolume: A dataset or zvol on a specific node
//! - ZfsSnapshot: A snapshot of a ZfsVolume
//! - ZfsNode: Pools and free space reported by a node

pub mod zfs_node;
pub mod zfs_snapshot;
pub mod zfs_volume;

pub use zfs_node::*;
pub use zfs_snapshot::*;
pub use zfs_volume::*;
