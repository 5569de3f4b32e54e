//! Buffer pool implementation.
//!
//! The pool orchestrates the pin/unpin protocol over its frame array: the
//! resident index maps block identities to frames, striped block latches
//! keep the load of any one block single-flighted, striped file latches
//! serialize appends per file, and the clock scanner picks eviction
//! victims. There is no pool-wide mutex; lock order is always
//! `striped latch -> frame swap lock`, and a frame lock is never held
//! while a striped latch is acquired.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use ferrite_common::types::BlockId;

use super::config::BufferPoolConfig;
use super::error::{BufferError, BufferResult};
use super::eviction::ClockScanner;
use super::frame::{Frame, FrameId, PageFormatter};
use super::guard::PinGuard;
use super::latch::LatchTable;
use super::BufferPoolStats;
use crate::file::BlockStorage;
use crate::log::LogManager;

/// A fixed-size cache of disk blocks.
///
/// The pool hands out pinned references to resident blocks, loads missing
/// blocks on demand, evicts unpinned frames under memory pressure, and
/// preserves the write-ahead discipline when dirty frames are written
/// back. Construction allocates every frame eagerly; the pool never
/// resizes.
///
/// All operations are safe to call from many threads at once.
pub struct BufferPool {
    config: BufferPoolConfig,
    frames: Vec<Arc<Frame>>,
    /// Resident index: which frame holds which block. Mutated only by a
    /// thread holding the affected frame's swap lock; readers re-validate
    /// under that lock before trusting an entry.
    resident: DashMap<BlockId, Arc<Frame>>,
    /// Serializes pinners that collide on the same block, so at most one
    /// thread performs the I/O for a missing block.
    block_latches: LatchTable,
    /// Serializes appends that collide on the same file.
    file_latches: LatchTable,
    scanner: ClockScanner,
    /// Count of frames with pin count zero.
    available: AtomicUsize,
    pins: AtomicU64,
    misses: AtomicU64,
}

impl BufferPool {
    /// Creates a buffer pool with `config.num_buffers` frames backed by
    /// `storage`, flushing through `log` on write-back.
    pub fn new(
        config: BufferPoolConfig,
        storage: Arc<dyn BlockStorage>,
        log: Arc<dyn LogManager>,
    ) -> BufferResult<Self> {
        config.validate().map_err(BufferError::config)?;

        let frames: Vec<Arc<Frame>> = (0..config.num_buffers)
            .map(|i| {
                Arc::new(Frame::new(
                    FrameId::new(i),
                    config.page_size,
                    Arc::clone(&storage),
                    Arc::clone(&log),
                ))
            })
            .collect();

        tracing::debug!(
            "buffer pool ready: {} frames of {} bytes",
            config.num_buffers,
            config.page_size
        );

        Ok(Self {
            available: AtomicUsize::new(frames.len()),
            resident: DashMap::with_capacity(frames.len()),
            block_latches: LatchTable::new(),
            file_latches: LatchTable::new(),
            scanner: ClockScanner::new(),
            pins: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            frames,
            config,
        })
    }

    /// Pins a frame to `block`, loading it from storage if it is not
    /// resident.
    ///
    /// Returns `Ok(None)` when every frame is pinned or was pinned too
    /// recently to evict; the caller may retry once pins drain. The
    /// returned frame stays resident until the matching [`unpin`].
    ///
    /// [`unpin`]: BufferPool::unpin
    pub fn pin(&self, block: &BlockId) -> BufferResult<Option<Arc<Frame>>> {
        self.pins.fetch_add(1, Ordering::Relaxed);

        let serial = self.block_latches.stripe(block).lock();

        // The map ref must drop before any frame lock is taken: swapping
        // threads hold a frame lock while they update the index.
        let cached = self.resident.get(block).map(|entry| Arc::clone(entry.value()));

        let Some(frame) = cached else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            // The whole miss path runs under the block latch; `serial`
            // drops when this call returns.
            return self.load_into_victim(block);
        };

        let ident = frame.lock_ident();
        // Release the stripe early: later pinners of this block will find
        // the same frame in the index and only need the frame lock.
        drop(serial);

        if ident.as_ref() == Some(block) {
            if !frame.is_pinned() {
                self.available.fetch_sub(1, Ordering::AcqRel);
            }
            frame.pin();
            drop(ident);
            Ok(Some(frame))
        } else {
            // The frame was swapped to another block between the index
            // lookup and the lock. Start over; the stripe is reentrant,
            // so re-entry is safe even while this call unwinds.
            drop(ident);
            self.pin(block)
        }
    }

    /// Miss path: evict a victim and load `block` into it. Caller holds
    /// the block latch.
    fn load_into_victim(&self, block: &BlockId) -> BufferResult<Option<Arc<Frame>>> {
        let Some((frame, mut ident)) = self.scanner.next_victim(&self.frames) else {
            return Ok(None);
        };

        // Write back before the index entry goes away: if the flush
        // fails, the old block stays resident and discoverable.
        frame.flush(&ident)?;
        if let Some(old) = ident.take() {
            self.resident.remove(&old);
            tracing::trace!("frame {} evicts {} for {}", frame.id().index(), old, block);
        }

        frame.assign_to_block(&mut ident, block.clone())?;
        self.resident.insert(block.clone(), Arc::clone(frame));

        if !frame.is_pinned() {
            self.available.fetch_sub(1, Ordering::AcqRel);
        }
        frame.pin();
        Ok(Some(Arc::clone(frame)))
    }

    /// Appends a new block to `file_name`, formats it with `formatter`,
    /// and returns a pinned frame holding it.
    ///
    /// Returns `Ok(None)` without allocating anything when no frame is
    /// evictable. Only appends to the same file serialize; appends to
    /// independent files proceed in parallel.
    pub fn pin_new(
        &self,
        file_name: &str,
        formatter: &dyn PageFormatter,
    ) -> BufferResult<Option<Arc<Frame>>> {
        let _serial = self.file_latches.stripe(file_name).lock();

        let Some((frame, mut ident)) = self.scanner.next_victim(&self.frames) else {
            return Ok(None);
        };

        frame.flush(&ident)?;
        if let Some(old) = ident.take() {
            self.resident.remove(&old);
        }

        let block = frame.assign_to_new(&mut ident, file_name, formatter)?;
        tracing::trace!("frame {} pins new block {}", frame.id().index(), block);
        self.resident.insert(block, Arc::clone(frame));

        if !frame.is_pinned() {
            self.available.fetch_sub(1, Ordering::AcqRel);
        }
        frame.pin();
        Ok(Some(Arc::clone(frame)))
    }

    /// Releases one pin on `frame`.
    ///
    /// # Panics
    ///
    /// Panics if the frame is not pinned.
    pub fn unpin(&self, frame: &Frame) {
        let _ident = frame.lock_ident();
        frame.unpin();
        if !frame.is_pinned() {
            self.available.fetch_add(1, Ordering::AcqRel);
        }
    }

    /// Releases one pin on each of `frames`.
    pub fn unpin_all(&self, frames: &[Arc<Frame>]) {
        for frame in frames {
            self.unpin(frame);
        }
    }

    /// Pins `block` and wraps the frame in a guard that unpins on drop.
    pub fn pin_guard(&self, block: &BlockId) -> BufferResult<Option<PinGuard<'_>>> {
        Ok(self.pin(block)?.map(|frame| PinGuard::new(self, frame)))
    }

    /// [`pin_new`](BufferPool::pin_new) with a guard that unpins on drop.
    pub fn pin_new_guard(
        &self,
        file_name: &str,
        formatter: &dyn PageFormatter,
    ) -> BufferResult<Option<PinGuard<'_>>> {
        Ok(self
            .pin_new(file_name, formatter)?
            .map(|frame| PinGuard::new(self, frame)))
    }

    /// Writes every dirty frame back to storage.
    ///
    /// Not a barrier: a concurrent writer may re-dirty a frame after its
    /// flush. Callers that need a quiescent snapshot must stop writers
    /// first.
    pub fn flush_all(&self) -> BufferResult<()> {
        tracing::debug!("flushing all dirty frames");
        for frame in &self.frames {
            let ident = frame.lock_ident();
            frame.flush(&ident)?;
        }
        Ok(())
    }

    /// Returns the number of unpinned frames.
    pub fn available(&self) -> usize {
        self.available.load(Ordering::Acquire)
    }

    /// Returns the fraction of pin requests served without a disk load
    /// since the last call, and resets the counters.
    ///
    /// Returns 1.0 when there were no requests.
    pub fn hit_rate(&self) -> f64 {
        let pins = self.pins.swap(0, Ordering::Relaxed);
        // A request racing with the drain can log its miss after its pin
        // was already consumed; cap so the rate stays a fraction.
        let misses = self.misses.swap(0, Ordering::Relaxed).min(pins);
        if pins == 0 {
            1.0
        } else {
            1.0 - misses as f64 / pins as f64
        }
    }

    /// Returns true if `block` is resident.
    pub fn contains(&self, block: &BlockId) -> bool {
        self.resident.contains_key(block)
    }

    /// Returns the number of frames in the pool.
    pub fn num_buffers(&self) -> usize {
        self.config.num_buffers
    }

    /// Returns the page size.
    pub fn page_size(&self) -> usize {
        self.config.page_size
    }

    /// Returns a point-in-time snapshot of pool state.
    ///
    /// Unlike [`hit_rate`](BufferPool::hit_rate), reading statistics does
    /// not reset anything.
    pub fn stats(&self) -> BufferPoolStats {
        let mut pinned = 0;
        let mut dirty = 0;
        for frame in &self.frames {
            if frame.is_pinned() {
                pinned += 1;
            }
            if frame.is_dirty() {
                dirty += 1;
            }
        }
        BufferPoolStats {
            num_buffers: self.config.num_buffers,
            available: self.available(),
            pinned_frames: pinned,
            dirty_frames: dirty,
            pins: self.pins.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    #[cfg(test)]
    pub(crate) fn frames(&self) -> &[Arc<Frame>] {
        &self.frames
    }

    #[cfg(test)]
    pub(crate) fn resident_frame(&self, block: &BlockId) -> Option<Arc<Frame>> {
        self.resident.get(block).map(|entry| Arc::clone(entry.value()))
    }
}

impl std::fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPool")
            .field("num_buffers", &self.config.num_buffers)
            .field("page_size", &self.config.page_size)
            .field("resident", &self.resident.len())
            .field("available", &self.available())
            .finish()
    }
}
