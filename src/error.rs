use axum::http::StatusCode;
use thiserror::Error;

/// Failures reported by a slot, booking or rule store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Unavailable(format!("I/O error: {}", e))
    }
}

impl From<csv::Error> for StoreError {
    fn from(e: csv::Error) -> Self {
        StoreError::Unavailable(format!("CSV error: {}", e))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Unavailable(format!("JSON error: {}", e))
    }
}

/// Errors surfaced by the booking and reconciliation services.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Slot {date} {time} is not available")]
    SlotUnavailable { date: String, time: String },
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unavailable(msg) => ServiceError::StoreUnavailable(msg),
            StoreError::Conflict(msg) => ServiceError::Conflict(msg),
        }
    }
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) | ServiceError::SlotUnavailable { .. } => {
                StatusCode::CONFLICT
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Reasons a recurrence rule cannot produce slots for a day.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("Malformed time '{0}', expected HH:MM")]
    MalformedTime(String),
    #[error("End time {end} is not after start time {start}")]
    InvertedInterval { start: String, end: String },
    #[error("Rule of type '{0}' has no duration value")]
    MissingDuration(&'static str),
    #[error("Day of week {0} is outside 0-6")]
    InvalidWeekday(u8),
}
