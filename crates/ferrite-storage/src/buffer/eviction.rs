//! Clock (second-chance) replacement.
//!
//! The scanner keeps a cursor over the frame array. Each selection walks
//! the ring once, starting after the cursor and stopping before the
//! cursor's own slot comes around again: candidates whose swap lock is
//! busy are skipped (another thread is actively swapping them), pinned
//! candidates are skipped, and a set recent-pin bit buys a frame one
//! reprieve. A frame that is unpinned and has spent its reprieve becomes
//! the victim, returned with its swap lock held.
//!
//! The cursor is a relaxed atomic. Concurrent scans may start from the
//! same position and converge on the same candidate; the try-lock makes
//! that race harmless, at worst costing an extra sweep.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ferrite_common::types::BlockId;
use parking_lot::MutexGuard;

use super::frame::Frame;

/// Second-chance victim selection over the pool's frame array.
pub(crate) struct ClockScanner {
    hand: AtomicUsize,
}

impl ClockScanner {
    pub(crate) fn new() -> Self {
        Self {
            hand: AtomicUsize::new(0),
        }
    }

    /// Selects an evictable frame, or `None` if one pass finds nothing.
    ///
    /// The pass covers every frame except the cursor's own slot, which is
    /// why the pool needs at least two frames. The victim comes back with
    /// its swap lock held so the caller can perform the swap before any
    /// other thread can touch the frame's identity.
    pub(crate) fn next_victim<'a>(
        &self,
        frames: &'a [Arc<Frame>],
    ) -> Option<(&'a Arc<Frame>, MutexGuard<'a, Option<BlockId>>)> {
        let hand = self.hand.load(Ordering::Relaxed);
        let len = frames.len();

        for step in 1..len {
            let pos = (hand + step) % len;
            let frame = &frames[pos];

            let Some(ident) = frame.try_lock_ident() else {
                continue;
            };
            // The recent bit is consumed even on frames that stay pinned,
            // so a frame's reprieve lasts one pass, not one pass after its
            // last unpin.
            let recent = frame.check_recent_and_reset();
            if !frame.is_pinned() && !recent {
                self.hand.store(pos, Ordering::Relaxed);
                return Some((frame, ident));
            }
        }
        None
    }

    #[cfg(test)]
    pub(crate) fn hand(&self) -> usize {
        self.hand.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for ClockScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClockScanner")
            .field("hand", &self.hand.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::super::frame::FrameId;
    use super::super::testing::{MemoryStorage, TraceLog};
    use super::*;

    const PAGE: usize = 512;

    fn test_frames(count: usize) -> Vec<Arc<Frame>> {
        let storage = MemoryStorage::new(PAGE);
        let log = Arc::new(TraceLog::new());
        (0..count)
            .map(|i| {
                Arc::new(Frame::new(
                    FrameId::new(i),
                    PAGE,
                    storage.clone(),
                    log.clone(),
                ))
            })
            .collect()
    }

    #[test]
    fn test_picks_first_idle_frame_after_hand() {
        let frames = test_frames(3);
        let scanner = ClockScanner::new();

        let (victim, _ident) = scanner.next_victim(&frames).unwrap();
        assert_eq!(victim.id().index(), 1);
        assert_eq!(scanner.hand(), 1);
    }

    #[test]
    fn test_skips_pinned_frames() {
        let frames = test_frames(3);
        let scanner = ClockScanner::new();
        frames[1].pin();
        frames[1].check_recent_and_reset();

        let (victim, _ident) = scanner.next_victim(&frames).unwrap();
        assert_eq!(victim.id().index(), 2);
    }

    #[test]
    fn test_all_pinned_yields_none() {
        let frames = test_frames(3);
        let scanner = ClockScanner::new();
        for frame in &frames {
            frame.pin();
        }
        assert!(scanner.next_victim(&frames).is_none());
    }

    #[test]
    fn test_recent_bit_buys_one_reprieve() {
        let frames = test_frames(2);
        let scanner = ClockScanner::new();
        for frame in &frames {
            frame.pin();
            frame.unpin();
        }

        // First pass clears the bits without evicting.
        assert!(scanner.next_victim(&frames).is_none());
        // Second pass finds a victim.
        assert!(scanner.next_victim(&frames).is_some());
    }

    #[test]
    fn test_skips_frames_mid_swap() {
        let frames = test_frames(3);
        let scanner = ClockScanner::new();

        let held = frames[1].lock_ident();
        let (victim, _ident) = scanner.next_victim(&frames).unwrap();
        assert_eq!(victim.id().index(), 2);
        drop(held);
    }

    #[test]
    fn test_pass_never_revisits_the_cursor_slot() {
        let frames = test_frames(4);
        let scanner = ClockScanner::new();
        // Frame 0 sits at the hand and is idle; every other frame is
        // pinned. The pass ends before the hand's own slot, so there is
        // no victim, however often the scan runs.
        frames[1].pin();
        frames[2].pin();
        frames[3].pin();

        assert!(scanner.next_victim(&frames).is_none());
        assert!(scanner.next_victim(&frames).is_none());
        assert_eq!(scanner.hand(), 0);
    }
}
