//! RAII pin handle.

use std::ops::Deref;
use std::sync::Arc;

use super::frame::Frame;
use super::pool::BufferPool;

/// A pinned frame that unpins itself when dropped.
///
/// The guard keeps the frame's contents resident for its lifetime and
/// dereferences to the frame for data access:
///
/// ```rust,no_run
/// # use ferrite_common::types::BlockId;
/// # use ferrite_storage::buffer::{BufferPool, BufferResult};
/// # fn example(pool: &BufferPool) -> BufferResult<()> {
/// if let Some(page) = pool.pin_guard(&BlockId::new("accounts.tbl", 0))? {
///     let data = page.read_data();
///     // ... use data ...
/// } // unpinned here
/// # Ok(())
/// # }
/// ```
///
/// For callers that manage pin lifetimes explicitly (transactions holding
/// pins across calls), [`BufferPool::pin`] and [`BufferPool::unpin`] are
/// the underlying surface.
pub struct PinGuard<'pool> {
    pool: &'pool BufferPool,
    frame: Arc<Frame>,
}

impl<'pool> PinGuard<'pool> {
    pub(crate) fn new(pool: &'pool BufferPool, frame: Arc<Frame>) -> Self {
        Self { pool, frame }
    }

    /// Returns the pinned frame.
    #[inline]
    pub fn frame(&self) -> &Arc<Frame> {
        &self.frame
    }
}

impl Deref for PinGuard<'_> {
    type Target = Frame;

    fn deref(&self) -> &Frame {
        &self.frame
    }
}

impl Drop for PinGuard<'_> {
    fn drop(&mut self) {
        self.pool.unpin(&self.frame);
    }
}

impl std::fmt::Debug for PinGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinGuard")
            .field("frame", &self.frame)
            .finish()
    }
}
