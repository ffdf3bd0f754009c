//! Error types for the ZFS LocalPV controller
//!
//! Every failure the lifecycle API can report is a variant of [`Error`].
//! [`Error::code`] folds the variants onto the small status-code taxonomy
//! callers of the lifecycle API understand.

use thiserror::Error;

/// Unified error type for the controller
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Request Validation Errors
    // =========================================================================
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unsupported controller capability: {capability}")]
    UnsupportedCapability { capability: String },

    #[error("Invalid snapshot id {id}: expected <volume>@<snapshot>")]
    InvalidSnapshotId { id: String },

    #[error("Operation not implemented: {operation}")]
    Unimplemented { operation: &'static str },

    // =========================================================================
    // Record Store Errors
    // =========================================================================
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Volume not found: {name}")]
    VolumeNotFound { name: String },

    #[error("Snapshot not found: {name}")]
    SnapshotNotFound { name: String },

    #[error("Resource already exists: {kind}/{name}")]
    ResourceExists { kind: String, name: String },

    #[error("Failed to submit {kind}/{name}: {reason}")]
    SubmissionFailed {
        kind: String,
        name: String,
        reason: String,
    },

    #[error("Failed to parse {field} of {name}: {value:?}")]
    RecordParse {
        name: String,
        field: String,
        value: String,
    },

    // =========================================================================
    // Scheduling Errors
    // =========================================================================
    #[error("Inventory read failed: {0}")]
    Inventory(String),

    #[error("Scheduling failed for volume {volume} (pool {pool:?}): {reason}")]
    SchedulingFailed {
        volume: String,
        pool: Option<String>,
        reason: String,
    },

    // =========================================================================
    // Record Builder Errors
    // =========================================================================
    #[error("Failed to build {kind} record {name:?}: {reason}")]
    RecordBuild {
        kind: String,
        name: String,
        reason: String,
    },

    // =========================================================================
    // Clone Errors
    // =========================================================================
    #[error("Clone {clone}: source {source_name} is on pool {source_pool}, requested pool {requested_pool}")]
    ClonePoolMismatch {
        clone: String,
        source_name: String,
        source_pool: String,
        requested_pool: String,
    },

    #[error("Clone {clone}: source {source_name} has capacity {source_bytes}, requested {requested_bytes}")]
    CloneCapacityMismatch {
        clone: String,
        source_name: String,
        source_bytes: u64,
        requested_bytes: u64,
    },

    // =========================================================================
    // Configuration Parse Errors
    // =========================================================================
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
}

/// Status code reported to lifecycle API callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    /// The request is malformed; retrying it unchanged cannot succeed
    InvalidArgument,
    /// A referenced volume or snapshot does not exist
    NotFound,
    /// A record with the requested name exists with different attributes
    AlreadyExists,
    /// Anything else; retry or fix parameters
    Internal,
    /// Operation is not offered by this controller
    Unimplemented,
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Code::InvalidArgument => write!(f, "invalid_argument"),
            Code::NotFound => write!(f, "not_found"),
            Code::AlreadyExists => write!(f, "already_exists"),
            Code::Internal => write!(f, "internal"),
            Code::Unimplemented => write!(f, "unimplemented"),
        }
    }
}

impl Error {
    /// Map this error onto the lifecycle API status code
    pub fn code(&self) -> Code {
        match self {
            Error::InvalidArgument(_)
            | Error::UnsupportedCapability { .. }
            | Error::InvalidSnapshotId { .. } => Code::InvalidArgument,

            Error::VolumeNotFound { .. } | Error::SnapshotNotFound { .. } => Code::NotFound,

            Error::ResourceExists { .. } => Code::AlreadyExists,

            Error::Unimplemented { .. } => Code::Unimplemented,

            // Scheduling, builder, clone mismatch, submission and parse
            // failures are all opaque to the caller
            _ => Code::Internal,
        }
    }

    /// Check if the caller may succeed by retrying the same request
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self.code(),
            Code::InvalidArgument | Code::Unimplemented
        ) && !matches!(self, Error::RecordBuild { .. })
    }

    /// Check if this error is a store-level AlreadyExists
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Error::ResourceExists { .. })
    }

    /// Check if this error reports a missing volume or snapshot
    pub fn is_not_found(&self) -> bool {
        self.code() == Code::NotFound
    }
}

/// Result type alias for the controller
pub type Result<T> = std::result::Result<T, Error>;
