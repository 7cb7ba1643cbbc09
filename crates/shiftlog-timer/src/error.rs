use shiftlog_store::StoreError;
use thiserror::Error;

pub const NO_ACTIVE_LOG: &str = "No active log";
pub const NO_ACTIVE_WORK_LOG: &str = "No active work log";
pub const ALREADY_PAUSED: &str = "Already paused";
pub const NOT_PAUSED: &str = "Not paused";
pub const ALREADY_ACTIVE: &str = "Work log already active";
pub const DESCRIPTION_REQUIRED: &str = "Description required";
pub const MISSING_LOG_ID: &str = "Missing log ID";
pub const MISSING_DATE: &str = "Missing date";
pub const INVALID_DATE: &str = "Invalid date";
pub const INVALID_INPUT: &str = "Invalid input";
pub const INVALID_SETTINGS: &str = "Invalid settings";
pub const INVALID_RANGE: &str = "Invalid range";

/// Every way a timer operation can fail. Each variant maps to one HTTP status
/// in the gateway; the `Display` text is what the client sees.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// No identity could be resolved for the request.
    #[error("Unauthorized")]
    Unauthenticated,

    /// Missing or malformed input.
    #[error("{0}")]
    Validation(String),

    /// The operation does not apply to the timer's current state.
    #[error("{0}")]
    Conflict(String),

    /// The store reported an error; its message is passed through unchanged.
    #[error("{0}")]
    Store(StoreError),
}

impl TrackerError {
    pub fn validation(msg: &str) -> Self {
        TrackerError::Validation(msg.to_string())
    }

    pub fn conflict(msg: &str) -> Self {
        TrackerError::Conflict(msg.to_string())
    }

    /// Short error code for logs.
    pub fn code(&self) -> &'static str {
        match self {
            TrackerError::Unauthenticated => "UNAUTHENTICATED",
            TrackerError::Validation(_) => "VALIDATION",
            TrackerError::Conflict(_) => "DOMAIN_CONFLICT",
            TrackerError::Store(_) => "STORE_FAILURE",
        }
    }
}

impl From<StoreError> for TrackerError {
    fn from(e: StoreError) -> Self {
        match e {
            // the partial unique index caught a racing start
            StoreError::ActiveLogExists { .. } => TrackerError::conflict(ALREADY_ACTIVE),
            other => TrackerError::Store(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;
