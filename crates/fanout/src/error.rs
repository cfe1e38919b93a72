//! Fan-out error types.

use thiserror::Error;

/// A bus or dead-letter call failed as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Errors that can occur while fanning out changes.
#[derive(Debug, Error)]
pub enum FanOutError {
    /// Failed to serialize a lifecycle event into a batch entry.
    #[error("Event serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Entries that exhausted their attempts could not be dead-lettered either.
    #[error("Failed to dead-letter {count} entries: {source}")]
    DeadLetter {
        count: usize,
        source: TransportError,
    },
}

/// Result type for fan-out operations.
pub type Result<T> = std::result::Result<T, FanOutError>;
