//! Chain index error types

use thiserror::Error;

/// Chain index result type
pub type Result<T> = std::result::Result<T, IndexError>;

/// Chain index errors
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Invalid node capacity: {0} (must be at least 2)")]
    InvalidCapacity(usize),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Invalid time range: start {start} is after end {end}")]
    InvalidTimeRange { start: f64, end: f64 },

    #[error("Corrupt tree: {0}")]
    CorruptTree(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
