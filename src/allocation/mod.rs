//! Allocation Module
//!
//! Capacity normalization, candidate gathering and the placement scheduler
//! that picks the owner node of a new volume.

pub mod candidates;
pub mod capacity;
pub mod placement;
pub mod policy;

pub use candidates::*;
pub use capacity::*;
pub use placement::*;
pub use policy::*;
