//! Block identity type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a fixed-size block of persistent storage.
///
/// A block is addressed by the name of the file it lives in and its
/// position within that file. `BlockId` has value equality and a stable
/// hash, which makes it usable as a key in the buffer pool's resident
/// index and as a striping key for latch tables.
///
/// # Example
///
/// ```rust
/// use ferrite_common::types::BlockId;
///
/// let blk = BlockId::new("accounts.tbl", 7);
/// assert_eq!(blk.file_name(), "accounts.tbl");
/// assert_eq!(blk.number(), 7);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockId {
    file_name: String,
    number: u64,
}

impl BlockId {
    /// Creates a block identity for block `number` of file `file_name`.
    #[must_use]
    pub fn new(file_name: impl Into<String>, number: u64) -> Self {
        Self {
            file_name: file_name.into(),
            number,
        }
    }

    /// Returns the name of the file the block belongs to.
    #[inline]
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Returns the block's position within its file.
    #[inline]
    #[must_use]
    pub const fn number(&self) -> u64 {
        self.number
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file_name, self.number)
    }
}
