//! Resource Record Builders
//!
//! Turn request parameters into complete, Pending records. Only presence is
//! validated here; pool and device level constraints are checked by the
//! node executor.

pub mod params;
pub mod snapshot;
pub mod volume;

pub use params::*;
pub use snapshot::*;
pub use volume::*;

/// Label carrying the source volume of a clone
pub const SOURCE_VOLUME_LABEL: &str = "zfs.localpv.io/source-volume";

/// Label carrying the volume a snapshot was taken from
pub const SNAPSHOT_VOLUME_LABEL: &str = "zfs.localpv.io/volume";

/// Label identifying records written by this controller
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

/// Value of [`MANAGED_BY_LABEL`]
pub const MANAGED_BY: &str = "zfs-localpv-controller";

/// Reject an empty required field
pub(crate) fn require(kind: &str, name: &str, field: &str, value: &str) -> crate::error::Result<()> {
    if value.trim().is_empty() {
        return Err(crate::error::Error::RecordBuild {
            kind: kind.to_string(),
            name: name.to_string(),
            reason: format!("missing {}", field),
        });
    }
    Ok(())
}
