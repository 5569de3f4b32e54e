//! Buffer pool manager for FerriteDB.
//!
//! The buffer pool is a fixed-size cache of disk blocks that sits between
//! the database's higher layers (transactions, recovery, access methods)
//! and block storage:
//!
//! - **Pinning**: callers pin a block to get a frame whose contents stay
//!   resident until the matching unpin
//! - **On-demand loading**: a missing block is read from storage exactly
//!   once, however many threads ask for it at the same moment
//! - **Replacement**: unpinned frames are recycled with a second-chance
//!   clock sweep when the pool is full
//! - **Durability**: dirty frames are written back under the write-ahead
//!   discipline (log first, then page)
//!
//! # Architecture
//!
//! ```text
//!  pin(block) / pin_new(file) / unpin / flush_all
//!        │
//!        ▼
//!  ┌──────────────────────────────────────────────────┐
//!  │                   BufferPool                      │
//!  │  striped block latches      striped file latches  │
//!  │  resident index (block -> frame)                  │
//!  │  clock scanner                                    │
//!  │  ┌───────┐ ┌───────┐ ┌───────┐      ┌───────┐    │
//!  │  │Frame 0│ │Frame 1│ │Frame 2│  ... │Frame N│    │
//!  │  └───────┘ └───────┘ └───────┘      └───────┘    │
//!  └──────────────────────────────────────────────────┘
//!        │                                   │
//!        ▼                                   ▼
//!   BlockStorage (read/write/append)    LogManager (flush_through)
//! ```
//!
//! There is no pool-wide mutex. Each frame carries its own swap lock,
//! the resident index is a sharded map, and the latch tables serialize
//! only the requests that collide on one block or one file.

mod config;
mod error;
mod eviction;
mod frame;
mod guard;
mod latch;
mod pool;

#[cfg(test)]
pub(crate) mod testing;

pub use config::BufferPoolConfig;
pub use error::{BufferError, BufferResult};
pub use frame::{Frame, FrameId, PageFormatter};
pub use guard::PinGuard;
pub use pool::BufferPool;

/// Point-in-time snapshot of buffer pool state.
///
/// Produced by [`BufferPool::stats`]; reading it never resets the pool's
/// counters.
#[derive(Debug, Clone, Default)]
pub struct BufferPoolStats {
    /// Total number of frames in the pool.
    pub num_buffers: usize,
    /// Frames with pin count zero.
    pub available: usize,
    /// Frames currently pinned.
    pub pinned_frames: usize,
    /// Frames modified since their last flush.
    pub dirty_frames: usize,
    /// Pin requests since the last [`BufferPool::hit_rate`] drain.
    pub pins: u64,
    /// Requests that needed a disk load since the last drain.
    pub misses: u64,
}
