//! Buffer pool configuration.

use ferrite_common::constants::{
    DEFAULT_PAGE_SIZE, DEFAULT_POOL_BUFFERS, MAX_PAGE_SIZE, MIN_PAGE_SIZE, MIN_POOL_BUFFERS,
};

/// Configuration for the buffer pool.
///
/// Both values are fixed at construction; the pool allocates every frame
/// eagerly and never resizes.
#[derive(Debug, Clone)]
pub struct BufferPoolConfig {
    /// Number of page frames in the pool.
    pub num_buffers: usize,
    /// Page size in bytes.
    pub page_size: usize,
}

impl BufferPoolConfig {
    /// Creates a configuration with the specified number of frames and
    /// the default page size.
    pub fn new(num_buffers: usize) -> Self {
        Self {
            num_buffers,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Sets the page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Returns the total memory the frame array will occupy.
    pub fn memory_usage(&self) -> usize {
        self.num_buffers * self.page_size
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.num_buffers < MIN_POOL_BUFFERS {
            return Err("num_buffers must be at least 2");
        }
        if !self.page_size.is_power_of_two() {
            return Err("page_size must be a power of 2");
        }
        if self.page_size < MIN_PAGE_SIZE {
            return Err("page_size is below the supported minimum");
        }
        if self.page_size > MAX_PAGE_SIZE {
            return Err("page_size is above the supported maximum");
        }
        Ok(())
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_BUFFERS)
    }
}
