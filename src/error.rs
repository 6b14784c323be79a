use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::dialect::Engine;

/// Errors raised while rendering dialect SQL, talking to an external source,
/// or constructing value types.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Unsupported duration '{duration}' in {engine} dialect")]
    UnsupportedDuration { engine: Engine, duration: String },

    #[error("Unsupported part {part} in {engine} dialect")]
    UnsupportedTimePart { engine: Engine, part: String },

    #[error("Unknown time part {0}")]
    UnknownTimePart(String),

    #[error("{0} does not expose its version")]
    UnsupportedVersion(Engine),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("External must have engine {expected} (got {actual})")]
    EngineMismatch { expected: Engine, actual: Engine },

    #[error("Invalid time range: {0}")]
    InvalidTimeRange(String),

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Unknown engine: {0}")]
    UnknownEngine(String),

    #[error("Transport error: {0}")]
    Transport(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, QueryError>;

impl QueryError {
    /// Stable error code, one per error category.
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::UnsupportedDuration { .. }
            | QueryError::UnsupportedTimePart { .. }
            | QueryError::UnknownTimePart(_)
            | QueryError::UnsupportedVersion(_) => "UNSUPPORTED_CAPABILITY",
            QueryError::InvalidResponse(_) => "INVALID_RESPONSE",
            QueryError::EngineMismatch { .. }
            | QueryError::InvalidTimeRange(_)
            | QueryError::InvalidDuration(_)
            | QueryError::InvalidTimezone(_)
            | QueryError::UnknownEngine(_) => "CONSTRUCTION_ERROR",
            QueryError::Transport(_) => "TRANSPORT_ERROR",
        }
    }

    /// True when the requested capability is missing on this engine, so the
    /// caller may fall back or report "not supported on this data source".
    pub fn is_unsupported(&self) -> bool {
        self.code() == "UNSUPPORTED_CAPABILITY"
    }
}

/// Serializable error body for callers that surface errors to end users
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorDetail {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl From<&QueryError> for ErrorDetail {
    fn from(err: &QueryError) -> Self {
        let detail = ErrorDetail::new(err.code(), err.to_string());
        if err.is_unsupported() {
            detail.with_details("This operation is not supported on this data source.")
        } else {
            detail
        }
    }
}
