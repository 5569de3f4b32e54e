//! File layer errors.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type for file layer operations.
pub type IoResult<T> = Result<T, IoError>;

/// Errors that can occur in the block file layer.
#[derive(Debug, Error)]
pub enum IoError {
    /// I/O error with an associated file path.
    #[error("I/O error on {path}: {source}")]
    File {
        /// Path of the file the operation targeted.
        path: PathBuf,
        /// Underlying OS error.
        source: io::Error,
    },

    /// I/O error without path context.
    #[error("I/O error: {source}")]
    Io {
        /// Underlying OS error.
        #[from]
        source: io::Error,
    },

    /// A page buffer did not match the storage page size.
    #[error("page buffer is {actual} bytes, storage expects {expected}")]
    PageSizeMismatch {
        /// Page size the storage was created with.
        expected: usize,
        /// Length of the buffer the caller supplied.
        actual: usize,
    },
}

impl IoError {
    /// Attaches a file path to an OS error.
    pub fn from_io_with_path(source: io::Error, path: impl AsRef<Path>) -> Self {
        Self::File {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}
