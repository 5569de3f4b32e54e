//! Synchronous block-addressed file I/O.
//!
//! A FerriteDB database is a directory of files, each file a sequence of
//! fixed-size blocks. This module provides the narrow interface the
//! buffer pool consumes ([`BlockStorage`]) and the production
//! implementation over ordinary files ([`FileStorage`]).
//!
//! All operations are synchronous: callers block in the kernel for the
//! duration of a read, write, or append. Concurrency is the caller's
//! concern; the buffer pool serializes conflicting appends with its
//! striped file latches.

mod error;
mod storage;

pub use error::{IoError, IoResult};
pub use storage::FileStorage;

use ferrite_common::types::BlockId;

/// Block-level storage operations.
///
/// Implementations must be safe for concurrent use: the buffer pool
/// issues reads and writes for independent blocks from many threads at
/// once.
pub trait BlockStorage: Send + Sync {
    /// Reads block `block` into `page`.
    ///
    /// A block that was never written reads as zeros.
    fn read(&self, block: &BlockId, page: &mut [u8]) -> IoResult<()>;

    /// Writes `page` to block `block`, extending the file if needed.
    fn write(&self, block: &BlockId, page: &[u8]) -> IoResult<()>;

    /// Appends a zeroed block to `file_name` and returns its identity.
    fn append(&self, file_name: &str) -> IoResult<BlockId>;
}
