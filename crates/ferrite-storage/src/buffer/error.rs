//! Buffer pool errors.

use thiserror::Error;

use crate::file::IoError;

/// Result type for buffer pool operations.
pub type BufferResult<T> = Result<T, BufferError>;

/// Errors that can occur during buffer pool operations.
///
/// Pool exhaustion is not an error: `pin` and `pin_new` signal it with
/// `Ok(None)` so callers can retry once pins drain.
#[derive(Debug, Error)]
pub enum BufferError {
    /// Configuration error at pool construction.
    #[error("configuration error: {message}")]
    Config {
        /// What was wrong with the configuration.
        message: String,
    },

    /// The block storage layer failed while loading or writing back a page.
    #[error("block storage failed: {0}")]
    Storage(#[from] IoError),

    /// The log manager failed to make the WAL durable before a write-back.
    #[error("log flush failed: {0}")]
    Log(IoError),
}

impl BufferError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
