//! Domain layer - Core records and port definitions
//!
//! This module defines the declarative records handed to the node executor
//! and the traits (ports) that store and inventory adapters implement,
//! following hexagonal architecture principles.

pub mod ports;
pub mod records;

pub use ports::*;
pub use records::*;
