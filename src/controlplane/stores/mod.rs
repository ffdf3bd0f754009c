//! Record store and pool inventory adapters
//!
//! - `kubernetes`: ZfsVolume / ZfsSnapshot / ZfsNode custom resources
//! - `memory`: in-process maps for standalone mode and tests

pub mod kubernetes;
pub mod memory;

pub use kubernetes::{KubeRecordStore, ZfsNodeInventory};
pub use memory::{InMemoryRecordStore, StaticPoolInventory};
