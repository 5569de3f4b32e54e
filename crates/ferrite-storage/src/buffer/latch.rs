//! Striped latches.
//!
//! A latch table serializes operations that collide on the same key
//! without allocating a lock per key: the key hashes to one of a fixed,
//! prime number of reentrant mutexes. Two keys in the same stripe share
//! a latch, which costs some false sharing but keeps independent keys
//! parallel.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use parking_lot::ReentrantMutex;

/// Number of stripes per table.
///
/// Prime, and much larger than the expected thread count, so unrelated
/// keys rarely share a latch.
pub(crate) const LATCH_STRIPES: usize = 1009;

/// A fixed array of reentrant mutexes indexed by key hash.
///
/// Reentrancy matters: the pin protocol may re-enter `pin` for the same
/// block while the calling thread's earlier latch acquisition is still
/// unwinding, and the same thread must be able to take the stripe again.
pub(crate) struct LatchTable {
    stripes: Box<[ReentrantMutex<()>]>,
}

impl LatchTable {
    pub(crate) fn new() -> Self {
        let stripes = (0..LATCH_STRIPES)
            .map(|_| ReentrantMutex::new(()))
            .collect();
        Self { stripes }
    }

    /// Returns the latch for `key`'s stripe.
    pub(crate) fn stripe<K: Hash + ?Sized>(&self, key: &K) -> &ReentrantMutex<()> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let index = (hasher.finish() % self.stripes.len() as u64) as usize;
        &self.stripes[index]
    }
}
