//! File-backed block storage.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use ferrite_common::types::BlockId;
use parking_lot::Mutex;

use super::error::{IoError, IoResult};
use super::BlockStorage;

/// A cached open file and its append serialization.
struct StoredFile {
    file: File,
    /// Held across the length probe and the extending write so two
    /// appends cannot reserve the same block number.
    append: Mutex<()>,
}

/// Block storage over a directory of ordinary files.
///
/// Each file name maps to one file in the database directory, treated as
/// an array of `page_size`-byte blocks. Files are created lazily on first
/// access and their handles are cached for the lifetime of the storage.
///
/// Reads and writes use positioned I/O and may run concurrently; an
/// append holds only its own file's append lock, so appends to
/// independent files (and all reads and writes) proceed in parallel.
pub struct FileStorage {
    dir: PathBuf,
    page_size: usize,
    files: DashMap<String, Arc<StoredFile>>,
}

impl FileStorage {
    /// Opens block storage rooted at `dir`, creating the directory if it
    /// does not exist.
    pub fn new(dir: impl AsRef<Path>, page_size: usize) -> IoResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| IoError::from_io_with_path(e, &dir))?;
        Ok(Self {
            dir,
            page_size,
            files: DashMap::new(),
        })
    }

    /// Returns the block size this storage was created with.
    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Returns the number of blocks currently in `file_name`.
    pub fn block_count(&self, file_name: &str) -> IoResult<u64> {
        let entry = self.handle(file_name)?;
        let len = entry.file.metadata()?.len();
        Ok(len / self.page_size as u64)
    }

    fn offset(&self, block: &BlockId) -> u64 {
        block.number() * self.page_size as u64
    }

    fn check_page(&self, page: &[u8]) -> IoResult<()> {
        if page.len() == self.page_size {
            Ok(())
        } else {
            Err(IoError::PageSizeMismatch {
                expected: self.page_size,
                actual: page.len(),
            })
        }
    }

    fn open(&self, file_name: &str) -> IoResult<Arc<StoredFile>> {
        let path = self.dir.join(file_name);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .map_err(|e| IoError::from_io_with_path(e, &path))?;
        Ok(Arc::new(StoredFile {
            file,
            append: Mutex::new(()),
        }))
    }

    /// Looks up or opens the cached entry for `file_name`. The map shard
    /// is held only for the lookup, never across I/O.
    fn handle(&self, file_name: &str) -> IoResult<Arc<StoredFile>> {
        if let Some(entry) = self.files.get(file_name) {
            return Ok(Arc::clone(entry.value()));
        }
        let opened = self.open(file_name)?;
        let entry = self.files.entry(file_name.to_owned()).or_insert(opened);
        Ok(Arc::clone(entry.value()))
    }
}

impl BlockStorage for FileStorage {
    fn read(&self, block: &BlockId, page: &mut [u8]) -> IoResult<()> {
        self.check_page(page)?;
        let entry = self.handle(block.file_name())?;
        let offset = self.offset(block);

        let mut filled = 0;
        while filled < page.len() {
            let n = entry.file.read_at(&mut page[filled..], offset + filled as u64)?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        // Blocks past the end of the file read as zeros.
        page[filled..].fill(0);
        Ok(())
    }

    fn write(&self, block: &BlockId, page: &[u8]) -> IoResult<()> {
        self.check_page(page)?;
        let entry = self.handle(block.file_name())?;
        entry.file.write_all_at(page, self.offset(block))?;
        Ok(())
    }

    fn append(&self, file_name: &str) -> IoResult<BlockId> {
        let entry = self.handle(file_name)?;
        // Only this file's appends serialize; the length probe and the
        // extending write must be one atomic step.
        let _guard = entry.append.lock();
        let len = entry.file.metadata()?.len();
        let number = len / self.page_size as u64;
        let zeros = vec![0u8; self.page_size];
        entry.file.write_all_at(&zeros, len)?;
        Ok(BlockId::new(file_name, number))
    }
}

impl std::fmt::Debug for FileStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStorage")
            .field("dir", &self.dir)
            .field("page_size", &self.page_size)
            .field("open_files", &self.files.len())
            .finish()
    }
}
