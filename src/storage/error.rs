//! Storage layer error types.

use thiserror::Error;

/// Errors that can occur in the storage layer.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Buffer pool is full: every frame is pinned")]
    BufferPoolFull,

    #[error("Invalid buffer size: expected {expected} bytes, got {actual}")]
    InvalidBufferSize { expected: usize, actual: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Page id space exhausted")]
    PageIdsExhausted,
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
