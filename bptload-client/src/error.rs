//! Client error type

use std::path::PathBuf;
use std::time::Duration;

use bptload_proto::ProtoError;
use thiserror::Error;

/// Errors surfaced by the transport and the workflow
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Connection to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Write failed: {0}")]
    Write(#[source] std::io::Error),

    #[error("Read failed: {0}")]
    Read(#[source] std::io::Error),

    #[error("No response within {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Proto(#[from] ProtoError),

    #[error("Failed to read input {}: {source}", path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
