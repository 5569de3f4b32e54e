//! In-memory collaborators for buffer pool tests.
//!
//! The storage and log doubles share one event log so tests can assert
//! cross-collaborator ordering (log flush before page write, write-back
//! before reload).

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ferrite_common::types::{BlockId, Lsn};
use parking_lot::Mutex;

use super::config::BufferPoolConfig;
use super::pool::BufferPool;
use crate::file::{BlockStorage, IoError, IoResult};
use crate::log::LogManager;

/// One observed collaborator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    Read(BlockId),
    Write(BlockId),
    Append(String),
    LogFlush(Lsn),
}

/// Shared, ordered record of collaborator calls.
pub(crate) type EventLog = Arc<Mutex<Vec<Event>>>;

/// `BlockStorage` over hash maps, with injectable failures.
pub(crate) struct MemoryStorage {
    page_size: usize,
    blocks: Mutex<HashMap<BlockId, Vec<u8>>>,
    file_sizes: Mutex<HashMap<String, u64>>,
    events: EventLog,
    read_failures: AtomicBool,
    write_failures: AtomicBool,
}

impl MemoryStorage {
    pub(crate) fn new(page_size: usize) -> Arc<Self> {
        Self::with_events(page_size, EventLog::default())
    }

    pub(crate) fn with_events(page_size: usize, events: EventLog) -> Arc<Self> {
        Arc::new(Self {
            page_size,
            blocks: Mutex::new(HashMap::new()),
            file_sizes: Mutex::new(HashMap::new()),
            events,
            read_failures: AtomicBool::new(false),
            write_failures: AtomicBool::new(false),
        })
    }

    /// Seeds a block's on-disk contents.
    pub(crate) fn put(&self, block: &BlockId, bytes: Vec<u8>) {
        assert_eq!(bytes.len(), self.page_size);
        self.blocks.lock().insert(block.clone(), bytes);
    }

    /// Returns a block's on-disk contents, if it was ever written.
    pub(crate) fn get(&self, block: &BlockId) -> Option<Vec<u8>> {
        self.blocks.lock().get(block).cloned()
    }

    pub(crate) fn fail_reads(&self, fail: bool) {
        self.read_failures.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_writes(&self, fail: bool) {
        self.write_failures.store(fail, Ordering::SeqCst);
    }

    fn injected(&self, what: &str) -> IoError {
        IoError::Io {
            source: io::Error::new(io::ErrorKind::Other, format!("injected {what} failure")),
        }
    }
}

impl BlockStorage for MemoryStorage {
    fn read(&self, block: &BlockId, page: &mut [u8]) -> IoResult<()> {
        self.events.lock().push(Event::Read(block.clone()));
        if self.read_failures.load(Ordering::SeqCst) {
            return Err(self.injected("read"));
        }
        match self.blocks.lock().get(block) {
            Some(bytes) => page.copy_from_slice(bytes),
            None => page.fill(0),
        }
        Ok(())
    }

    fn write(&self, block: &BlockId, page: &[u8]) -> IoResult<()> {
        self.events.lock().push(Event::Write(block.clone()));
        if self.write_failures.load(Ordering::SeqCst) {
            return Err(self.injected("write"));
        }
        self.blocks.lock().insert(block.clone(), page.to_vec());
        Ok(())
    }

    fn append(&self, file_name: &str) -> IoResult<BlockId> {
        self.events.lock().push(Event::Append(file_name.to_string()));
        let mut sizes = self.file_sizes.lock();
        let next = sizes.entry(file_name.to_string()).or_insert(0);
        let block = BlockId::new(file_name, *next);
        *next += 1;
        Ok(block)
    }
}

/// `LogManager` that records every flush request.
pub(crate) struct TraceLog {
    events: EventLog,
}

impl TraceLog {
    pub(crate) fn new() -> Self {
        Self::with_events(EventLog::default())
    }

    pub(crate) fn with_events(events: EventLog) -> Self {
        Self { events }
    }
}

impl LogManager for TraceLog {
    fn flush_through(&self, lsn: Lsn) -> IoResult<()> {
        self.events.lock().push(Event::LogFlush(lsn));
        Ok(())
    }
}

/// A pool over fresh in-memory collaborators with a 512-byte page.
pub(crate) fn test_pool(num_buffers: usize) -> (BufferPool, Arc<MemoryStorage>, EventLog) {
    let events = EventLog::default();
    let storage = MemoryStorage::with_events(512, events.clone());
    let log = Arc::new(TraceLog::with_events(events.clone()));
    let config = BufferPoolConfig::new(num_buffers).with_page_size(512);
    let pool = BufferPool::new(config, storage.clone(), log).expect("test pool config");
    (pool, storage, events)
}
