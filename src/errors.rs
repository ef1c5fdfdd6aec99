//! Error types for the waybill core
//!
//! Each error type has a corresponding error code for programmatic handling.

use thiserror::Error;

/// Result type alias for waybill operations
pub type Result<T> = std::result::Result<T, WaybillError>;

/// A father chain in the permission forest that loops back on itself.
///
/// `chain` lists the group names in walk order, ending with the first group
/// that was visited twice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("permission group cycle detected: {}", chain.join(" -> "))]
pub struct CyclicGroupError {
    pub chain: Vec<String>,
}

/// Main error type for all waybill operations
#[derive(Debug, Error)]
pub enum WaybillError {
    /// Actor lacks the capability required by the requested transition
    #[error("Permission denied: {actor} lacks {permission}{}", waybill_suffix(.waybill))]
    PermissionDenied {
        actor: String,
        permission: String,
        waybill: Option<String>,
    },

    /// Permission was granted but the edge or its precondition does not hold
    #[error("Invalid transition for waybill {waybill}: {reason}")]
    InvalidTransition { waybill: String, reason: String },

    /// Lost a race against another writer of the same waybill.
    ///
    /// `expected` is the version the caller observed, when it supplied one.
    #[error(
        "Waybill {waybill} was modified concurrently ({}); refresh and retry",
        version_detail(.expected, .found)
    )]
    ConcurrentModification {
        waybill: String,
        expected: Option<u64>,
        found: u64,
    },

    /// Malformed permission forest
    #[error(transparent)]
    CyclicGroup(#[from] CyclicGroupError),

    /// Referenced waybill, group, user or permission is absent
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Input rejected before it reached the state machine
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Invalid JSON format
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// No .waybill directory above the working directory
    #[error("Workspace not found: {0}")]
    WorkspaceNotFound(String),

    /// Another invocation held the workspace lock for too long
    #[error("Workspace busy: {0}")]
    WorkspaceBusy(String),

    /// IO error wrapper
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error with context
    #[error("{context}: {message}")]
    Wrapped { context: String, message: String },
}

fn version_detail(expected: &Option<u64>, found: &u64) -> String {
    match expected {
        Some(expected) => format!("expected version {}, found {}", expected, found),
        None => format!("now at version {}", found),
    }
}

fn waybill_suffix(waybill: &Option<String>) -> String {
    match waybill {
        Some(id) => format!(" on waybill {}", id),
        None => String::new(),
    }
}

impl WaybillError {
    /// Get the error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            WaybillError::PermissionDenied { .. } => "PERMISSION_DENIED",
            WaybillError::InvalidTransition { .. } => "INVALID_TRANSITION",
            WaybillError::ConcurrentModification { .. } => "CONCURRENT_MODIFICATION",
            WaybillError::CyclicGroup(_) => "CYCLIC_GROUP",
            WaybillError::NotFound { .. } => "NOT_FOUND",
            WaybillError::Validation(_) => "VALIDATION",
            WaybillError::ConfigError(_) => "CONFIG_ERROR",
            WaybillError::InvalidJson(_) => "INVALID_JSON",
            WaybillError::FileNotFound(_) => "FILE_NOT_FOUND",
            WaybillError::WorkspaceNotFound(_) => "WORKSPACE_NOT_FOUND",
            WaybillError::WorkspaceBusy(_) => "WORKSPACE_BUSY",
            WaybillError::Io(_) => "IO_ERROR",
            WaybillError::Wrapped { .. } => "WRAPPED_ERROR",
        }
    }

    /// Whether the caller should refresh and try again
    pub fn is_retryable(&self) -> bool {
        matches!(self, WaybillError::ConcurrentModification { .. })
    }

    /// Shorthand for a `NotFound` error
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        WaybillError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Wrap an error with additional context
    pub fn wrap<E: std::fmt::Display>(error: E, context: impl Into<String>) -> Self {
        WaybillError::Wrapped {
            context: context.into(),
            message: error.to_string(),
        }
    }
}

/// Convert an error to an appropriate exit code
pub fn to_exit_code(error: &WaybillError) -> i32 {
    match error {
        WaybillError::ConcurrentModification { .. } | WaybillError::WorkspaceBusy(_) => 75, // EX_TEMPFAIL
        WaybillError::PermissionDenied { .. } => 77,       // EX_NOPERM
        WaybillError::CyclicGroup(_) | WaybillError::ConfigError(_) => 78, // EX_CONFIG
        _ => 1,
    }
}
