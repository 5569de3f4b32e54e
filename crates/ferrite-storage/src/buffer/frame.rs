//! Buffer frame - a slot in the pool that holds one disk block.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use ferrite_common::types::{BlockId, Lsn};
use parking_lot::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::error::{BufferError, BufferResult};
use crate::file::BlockStorage;
use crate::log::LogManager;

/// Frame identifier - index into the buffer pool's frame array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(usize);

impl FrameId {
    /// Creates a new frame ID.
    #[inline]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    /// Returns the raw index.
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Initializes the bytes of a freshly appended page.
///
/// Supplied by the caller of [`BufferPool::pin_new`]; the formatter runs
/// in memory on the frame's page buffer before the block is ever written
/// to storage.
///
/// Any `Fn(&mut [u8])` closure is a formatter.
///
/// [`BufferPool::pin_new`]: super::BufferPool::pin_new
pub trait PageFormatter {
    /// Writes the initial contents of a new page into `page`.
    fn format(&self, page: &mut [u8]);
}

impl<F> PageFormatter for F
where
    F: Fn(&mut [u8]),
{
    fn format(&self, page: &mut [u8]) {
        self(page)
    }
}

/// A buffer frame holds a single disk block in memory.
///
/// The frame's state splits along the lines of who touches it:
///
/// - `ident` is the frame's **swap lock**: a mutex whose guarded value is
///   the resident block identity. Identity transitions, pin-count
///   transitions observed by the pool, and all I/O on the page happen
///   while this guard is held.
/// - `data` holds the page bytes behind a reader-writer lock so that
///   concurrent pin holders can share the page.
/// - Pin count, dirty flag, recent-pin bit, and last LSN are atomics,
///   readable without any lock.
pub struct Frame {
    id: FrameId,
    /// The swap lock. `None` when the frame has never held a block or a
    /// failed swap left it empty.
    ident: Mutex<Option<BlockId>>,
    /// Page bytes, shared among pin holders.
    data: RwLock<Box<[u8]>>,
    pin_count: AtomicU32,
    dirty: AtomicBool,
    /// Clock bit for second-chance replacement, set on every pin.
    recent: AtomicBool,
    /// Highest LSN of a log record covering the page's current contents.
    lsn: AtomicU64,
    storage: Arc<dyn BlockStorage>,
    log: Arc<dyn LogManager>,
}

impl Frame {
    pub(crate) fn new(
        id: FrameId,
        page_size: usize,
        storage: Arc<dyn BlockStorage>,
        log: Arc<dyn LogManager>,
    ) -> Self {
        Self {
            id,
            ident: Mutex::new(None),
            data: RwLock::new(vec![0u8; page_size].into_boxed_slice()),
            pin_count: AtomicU32::new(0),
            dirty: AtomicBool::new(false),
            recent: AtomicBool::new(false),
            lsn: AtomicU64::new(Lsn::INVALID.as_u64()),
            storage,
            log,
        }
    }

    /// Returns the frame ID.
    #[inline]
    pub fn id(&self) -> FrameId {
        self.id
    }

    /// Returns the identity of the resident block, if any.
    ///
    /// Taken under the swap lock; a concurrent swap can change the answer
    /// as soon as it is returned. Pin holders are guaranteed a stable
    /// identity for as long as they hold their pin.
    pub fn block(&self) -> Option<BlockId> {
        self.ident.lock().clone()
    }

    /// Returns the current pin count.
    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Acquire)
    }

    /// Returns true if the frame is pinned.
    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    /// Returns true if the page has been modified since its last flush.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Returns the LSN of the last modification.
    #[inline]
    pub fn lsn(&self) -> Lsn {
        Lsn::new(self.lsn.load(Ordering::Acquire))
    }

    /// Returns a shared lock on the page bytes.
    #[inline]
    pub fn read_data(&self) -> RwLockReadGuard<'_, Box<[u8]>> {
        self.data.read()
    }

    /// Returns an exclusive lock on the page bytes.
    ///
    /// Callers that modify the page must call [`Frame::mark_dirty`] after
    /// releasing the guard so the change survives eviction.
    #[inline]
    pub fn write_data(&self) -> RwLockWriteGuard<'_, Box<[u8]>> {
        self.data.write()
    }

    /// Records that the page was modified under a log record at `lsn`.
    ///
    /// The frame keeps the highest LSN it has seen; flushing forces the
    /// log durable through that LSN before the page is written back.
    pub fn mark_dirty(&self, lsn: Lsn) {
        self.lsn.fetch_max(lsn.as_u64(), Ordering::AcqRel);
        self.dirty.store(true, Ordering::Release);
    }

    // -------------------------------------------------------------------------
    // Pool-internal operations
    // -------------------------------------------------------------------------

    pub(crate) fn lock_ident(&self) -> MutexGuard<'_, Option<BlockId>> {
        self.ident.lock()
    }

    pub(crate) fn try_lock_ident(&self) -> Option<MutexGuard<'_, Option<BlockId>>> {
        self.ident.try_lock()
    }

    /// Increments the pin count and marks the frame recently pinned.
    pub(crate) fn pin(&self) {
        self.pin_count.fetch_add(1, Ordering::AcqRel);
        self.recent.store(true, Ordering::Release);
    }

    /// Decrements the pin count. Does not clear the recent bit.
    ///
    /// # Panics
    ///
    /// Panics if the frame is not pinned; unpinning an unpinned frame is
    /// a caller bug that would corrupt the pool's availability count.
    pub(crate) fn unpin(&self) {
        let old = self.pin_count.fetch_sub(1, Ordering::AcqRel);
        assert!(old > 0, "unpin called on an unpinned frame");
    }

    /// Reads and clears the recent-pin bit in one step.
    ///
    /// A pin racing with this call re-sets the bit, re-protecting the
    /// frame on the scanner's next pass.
    pub(crate) fn check_recent_and_reset(&self) -> bool {
        self.recent.swap(false, Ordering::AcqRel)
    }

    /// Writes the page back to storage if it is dirty.
    ///
    /// Honors the write-ahead discipline: the log is forced through the
    /// page's LSN before the data write. No-op when the frame is clean or
    /// holds no block. On failure the frame keeps its identity and stays
    /// dirty.
    pub(crate) fn flush(&self, ident: &Option<BlockId>) -> BufferResult<()> {
        let Some(block) = ident else {
            return Ok(());
        };
        if !self.is_dirty() {
            return Ok(());
        }

        let lsn = self.lsn();
        if lsn.is_valid() {
            self.log.flush_through(lsn).map_err(BufferError::Log)?;
        }
        let data = self.data.read();
        self.storage.write(block, &data)?;
        drop(data);
        self.dirty.store(false, Ordering::Release);
        Ok(())
    }

    /// Replaces the frame's contents with block `block` read from storage.
    ///
    /// Flushes any dirty prior contents first. If the read fails the
    /// frame is left empty (`ident` cleared) so a half-loaded page can
    /// never be served.
    pub(crate) fn assign_to_block(
        &self,
        ident: &mut Option<BlockId>,
        block: BlockId,
    ) -> BufferResult<()> {
        self.flush(ident)?;

        let mut data = self.data.write();
        if let Err(e) = self.storage.read(&block, &mut data) {
            *ident = None;
            return Err(e.into());
        }
        drop(data);

        *ident = Some(block);
        self.dirty.store(false, Ordering::Release);
        self.recent.store(false, Ordering::Release);
        self.lsn.store(Lsn::INVALID.as_u64(), Ordering::Release);
        Ok(())
    }

    /// Appends a fresh block to `file_name` and takes its identity.
    ///
    /// Flushes any dirty prior contents first, then formats the page in
    /// memory. The new contents exist only in this frame until the next
    /// flush, so the frame comes out dirty.
    pub(crate) fn assign_to_new(
        &self,
        ident: &mut Option<BlockId>,
        file_name: &str,
        formatter: &dyn PageFormatter,
    ) -> BufferResult<BlockId> {
        self.flush(ident)?;

        let block = self.storage.append(file_name)?;
        {
            let mut data = self.data.write();
            formatter.format(&mut data);
        }

        *ident = Some(block.clone());
        self.dirty.store(true, Ordering::Release);
        self.recent.store(false, Ordering::Release);
        self.lsn.store(Lsn::INVALID.as_u64(), Ordering::Release);
        Ok(block)
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("id", &self.id)
            .field("block", &self.block())
            .field("pin_count", &self.pin_count())
            .field("dirty", &self.is_dirty())
            .field("lsn", &self.lsn())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{Event, EventLog, MemoryStorage, TraceLog};
    use super::*;

    const PAGE: usize = 512;

    fn test_frame() -> (Frame, Arc<MemoryStorage>, EventLog) {
        let events = EventLog::default();
        let storage = MemoryStorage::with_events(PAGE, events.clone());
        let log = Arc::new(TraceLog::with_events(events.clone()));
        let frame = Frame::new(FrameId::new(0), PAGE, storage.clone(), log);
        (frame, storage, events)
    }

    fn recorded(events: &EventLog) -> Vec<Event> {
        events.lock().clone()
    }

    #[test]
    fn test_new_frame_is_empty() {
        let (frame, _storage, _events) = test_frame();
        assert!(frame.block().is_none());
        assert_eq!(frame.pin_count(), 0);
        assert!(!frame.is_pinned());
        assert!(!frame.is_dirty());
        assert!(!frame.lsn().is_valid());
    }

    #[test]
    fn test_pin_counts_and_sets_recent() {
        let (frame, _storage, _events) = test_frame();

        frame.pin();
        frame.pin();
        assert_eq!(frame.pin_count(), 2);
        assert!(frame.check_recent_and_reset());

        frame.unpin();
        assert_eq!(frame.pin_count(), 1);
        // Unpin leaves the recent bit alone; it was cleared above.
        assert!(!frame.check_recent_and_reset());

        frame.unpin();
        assert!(!frame.is_pinned());
    }

    #[test]
    #[should_panic(expected = "unpin called on an unpinned frame")]
    fn test_unpin_of_unpinned_frame_panics() {
        let (frame, _storage, _events) = test_frame();
        frame.unpin();
    }

    #[test]
    fn test_mark_dirty_keeps_highest_lsn() {
        let (frame, _storage, _events) = test_frame();

        frame.mark_dirty(Lsn::new(9));
        frame.mark_dirty(Lsn::new(4));
        assert!(frame.is_dirty());
        assert_eq!(frame.lsn(), Lsn::new(9));
    }

    #[test]
    fn test_assign_to_block_loads_contents() {
        let (frame, storage, _events) = test_frame();
        let blk = BlockId::new("data.tbl", 1);
        storage.put(&blk, vec![0x5au8; PAGE]);

        let mut ident = frame.lock_ident();
        frame.assign_to_block(&mut ident, blk.clone()).unwrap();
        drop(ident);

        assert_eq!(frame.block(), Some(blk));
        assert!(!frame.is_dirty());
        assert!(frame.read_data().iter().all(|&b| b == 0x5a));
    }

    #[test]
    fn test_assign_flushes_dirty_predecessor() {
        let (frame, storage, events) = test_frame();
        let old = BlockId::new("data.tbl", 0);
        let new = BlockId::new("data.tbl", 1);

        {
            let mut ident = frame.lock_ident();
            frame.assign_to_block(&mut ident, old.clone()).unwrap();
        }
        frame.write_data().fill(0x11);
        frame.mark_dirty(Lsn::new(3));

        let mut ident = frame.lock_ident();
        frame.assign_to_block(&mut ident, new.clone()).unwrap();
        drop(ident);

        // The old contents reached storage before the new block was read.
        let seen = recorded(&events);
        let write_at = seen.iter().position(|e| *e == Event::Write(old.clone())).unwrap();
        let read_at = seen.iter().rposition(|e| *e == Event::Read(new.clone())).unwrap();
        assert!(write_at < read_at);
        assert_eq!(storage.get(&old).unwrap(), vec![0x11u8; PAGE]);
        assert!(!frame.is_dirty());
    }

    #[test]
    fn test_failed_read_leaves_frame_empty() {
        let (frame, storage, _events) = test_frame();
        storage.fail_reads(true);

        let mut ident = frame.lock_ident();
        let result = frame.assign_to_block(&mut ident, BlockId::new("data.tbl", 0));
        assert!(result.is_err());
        assert!(ident.is_none());
    }

    #[test]
    fn test_failed_flush_keeps_identity_and_dirt() {
        let (frame, storage, _events) = test_frame();
        let blk = BlockId::new("data.tbl", 0);

        {
            let mut ident = frame.lock_ident();
            frame.assign_to_block(&mut ident, blk.clone()).unwrap();
        }
        frame.mark_dirty(Lsn::new(2));
        storage.fail_writes(true);

        let ident = frame.lock_ident();
        assert!(frame.flush(&ident).is_err());
        assert_eq!(ident.as_ref(), Some(&blk));
        assert!(frame.is_dirty());
    }

    #[test]
    fn test_flush_forces_log_before_data_write() {
        let (frame, _storage, events) = test_frame();
        let blk = BlockId::new("data.tbl", 0);

        {
            let mut ident = frame.lock_ident();
            frame.assign_to_block(&mut ident, blk.clone()).unwrap();
        }
        frame.mark_dirty(Lsn::new(42));

        let ident = frame.lock_ident();
        frame.flush(&ident).unwrap();
        drop(ident);

        let seen = recorded(&events);
        let log_at = seen.iter().position(|e| *e == Event::LogFlush(Lsn::new(42))).unwrap();
        let write_at = seen.iter().position(|e| *e == Event::Write(blk.clone())).unwrap();
        assert!(log_at < write_at);
    }

    #[test]
    fn test_flush_is_noop_when_clean_or_empty() {
        let (frame, _storage, events) = test_frame();

        // Empty frame.
        let ident = frame.lock_ident();
        frame.flush(&ident).unwrap();
        drop(ident);

        // Clean resident frame.
        {
            let mut ident = frame.lock_ident();
            frame.assign_to_block(&mut ident, BlockId::new("data.tbl", 0)).unwrap();
        }
        let ident = frame.lock_ident();
        frame.flush(&ident).unwrap();
        drop(ident);

        assert!(recorded(&events).iter().all(|e| !matches!(e, Event::Write(_))));
    }

    #[test]
    fn test_assign_to_new_appends_and_formats() {
        let (frame, _storage, events) = test_frame();

        let mut ident = frame.lock_ident();
        let block = frame
            .assign_to_new(&mut ident, "seg.tbl", &|page: &mut [u8]| page.fill(0xcc))
            .unwrap();
        drop(ident);

        assert_eq!(block, BlockId::new("seg.tbl", 0));
        assert_eq!(frame.block(), Some(block.clone()));
        assert!(frame.is_dirty());
        assert!(frame.read_data().iter().all(|&b| b == 0xcc));
        assert!(recorded(&events).contains(&Event::Append("seg.tbl".to_string())));
    }
}
