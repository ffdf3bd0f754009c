//! Volume Parameters
//!
//! Storage-class parameters as they arrive with a create request. Keys may
//! be mistyped in case upstream (nothing validates them there), and every
//! ZFS property key is lowercase, so keys are lowercased before lookup.
//! Values are passed through untouched.

use std::collections::HashMap;

pub const PARAM_RECORD_SIZE: &str = "recordsize";
pub const PARAM_VOL_BLOCK_SIZE: &str = "volblocksize";
pub const PARAM_COMPRESSION: &str = "compression";
pub const PARAM_DEDUP: &str = "dedup";
pub const PARAM_ENCRYPTION: &str = "encryption";
pub const PARAM_KEY_FORMAT: &str = "keyformat";
pub const PARAM_KEY_LOCATION: &str = "keylocation";
pub const PARAM_POOL_NAME: &str = "poolname";
pub const PARAM_THIN_PROVISION: &str = "thinprovision";
pub const PARAM_SCHEDULER: &str = "scheduler";
pub const PARAM_FS_TYPE: &str = "fstype";
pub const PARAM_SHARED: &str = "shared";

/// Claim name injected by the external provisioner
pub const PARAM_PVC_NAME: &str = "csi.storage.k8s.io/pvc/name";

/// Lowercase every key of a parameter map.
///
/// When two keys collide after lowercasing, the lexicographically greatest
/// original key wins so the result does not depend on map iteration order.
pub fn lowercase_keys(params: &HashMap<String, String>) -> HashMap<String, String> {
    let mut keys: Vec<&String> = params.keys().collect();
    keys.sort();

    keys.into_iter()
        .map(|k| (k.to_lowercase(), params[k].clone()))
        .collect()
}

/// Parsed volume parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumeParams {
    pub record_size: Option<String>,
    pub vol_block_size: Option<String>,
    pub compression: Option<String>,
    pub dedup: Option<String>,
    pub encryption: Option<String>,
    pub key_format: Option<String>,
    pub key_location: Option<String>,
    pub pool_name: Option<String>,
    pub thin_provision: Option<String>,
    pub scheduler: Option<String>,
    pub fs_type: Option<String>,
    pub shared: Option<String>,
    pub claim_name: Option<String>,
}

impl VolumeParams {
    /// Extract the known parameters; unknown keys are ignored
    pub fn from_parameters(params: &HashMap<String, String>) -> Self {
        let params = lowercase_keys(params);
        let get = |key: &str| params.get(key).filter(|v| !v.is_empty()).cloned();

        Self {
            record_size: get(PARAM_RECORD_SIZE),
            vol_block_size: get(PARAM_VOL_BLOCK_SIZE),
            compression: get(PARAM_COMPRESSION),
            dedup: get(PARAM_DEDUP),
            encryption: get(PARAM_ENCRYPTION),
            key_format: get(PARAM_KEY_FORMAT),
            key_location: get(PARAM_KEY_LOCATION),
            pool_name: get(PARAM_POOL_NAME),
            thin_provision: get(PARAM_THIN_PROVISION),
            scheduler: get(PARAM_SCHEDULER),
            fs_type: get(PARAM_FS_TYPE),
            shared: get(PARAM_SHARED),
            claim_name: get(PARAM_PVC_NAME),
        }
    }
}
