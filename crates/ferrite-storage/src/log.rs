//! Write-ahead-log collaborator interface.
//!
//! The buffer pool does not own a log manager; it only needs one promise
//! from it: before a dirty page is written back to storage, every log
//! record up to the page's last LSN must be durable. [`LogManager`] is
//! that seam.

use ferrite_common::types::Lsn;

use crate::file::IoResult;

/// The log-manager operations the storage layer depends on.
pub trait LogManager: Send + Sync {
    /// Forces the log durable through `lsn`.
    ///
    /// Called before a page whose last modification carries `lsn` is
    /// written back to storage.
    fn flush_through(&self, lsn: Lsn) -> IoResult<()>;
}

/// A log manager that performs no logging.
///
/// For deployments that run without a WAL (bulk loads, throwaway
/// databases) and for tests that do not exercise recovery.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLog;

impl LogManager for NullLog {
    fn flush_through(&self, _lsn: Lsn) -> IoResult<()> {
        Ok(())
    }
}
