//! Error types for SceneCut.

use crate::cancel::CancelReason;
use thiserror::Error;

/// Main error type for SceneCut operations.
#[derive(Error, Debug)]
pub enum SceneCutError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Decoder error: {0}")]
    Decode(String),

    #[error("Capability unavailable: {0}")]
    CapabilityUnavailable(String),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Invalid parameter: {0}")]
    Validation(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Operation cancelled: {0}")]
    Cancelled(CancelReason),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for SceneCutError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type alias for SceneCut operations.
pub type Result<T> = std::result::Result<T, SceneCutError>;
