//! Protocol-level errors

use thiserror::Error;

/// Errors raised while building requests or draining responses
#[derive(Error, Debug)]
pub enum ProtoError {
    #[error("Invalid dataset name {0:?}: must be a non-empty path segment without '/', '?', '#', whitespace or control characters")]
    InvalidDatasetName(String),

    #[error("Failed to serialize request body: {0}")]
    Body(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for protocol operations
pub type ProtoResult<T> = Result<T, ProtoError>;
