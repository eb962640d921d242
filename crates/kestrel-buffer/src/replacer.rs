//! Clock (second-chance) page replacement.

use crate::descriptor::FrameDescriptor;
use crate::frame::FrameId;

/// Clock replacement over the frame descriptor table.
///
/// The hand sweeps the frames cyclically. For each frame it visits:
/// 1. An invalid frame is free and is selected immediately
/// 2. A referenced frame has its reference bit cleared and is skipped
/// 3. A pinned frame is skipped
/// 4. Anything else is the victim
///
/// One full sweep clears every reference bit, so a second sweep reaches any
/// unpinned frame. The scan gives up after two sweeps.
#[derive(Debug)]
pub(crate) struct ClockReplacer {
    num_frames: usize,
    /// Last frame examined. Starts one behind frame 0.
    hand: usize,
}

impl ClockReplacer {
    /// Creates a clock over `num_frames` frames.
    pub(crate) fn new(num_frames: usize) -> Self {
        debug_assert!(num_frames > 0);
        Self {
            num_frames,
            hand: num_frames - 1,
        }
    }

    /// Returns the current clock hand position.
    pub(crate) fn hand(&self) -> usize {
        self.hand
    }

    #[inline]
    fn advance(&mut self) {
        self.hand = (self.hand + 1) % self.num_frames;
    }

    /// Selects a frame to (re)use.
    ///
    /// The returned frame is either invalid or a valid, unpinned, unreferenced
    /// frame the caller must evict. Returns `None` if every frame stayed pinned
    /// for two full sweeps.
    pub(crate) fn select_victim(&mut self, descriptors: &mut [FrameDescriptor]) -> Option<FrameId> {
        debug_assert_eq!(descriptors.len(), self.num_frames);

        for _ in 0..(2 * self.num_frames) {
            self.advance();
            let desc = &mut descriptors[self.hand];

            if !desc.is_valid() {
                return Some(desc.frame_id());
            }
            if desc.is_referenced() {
                desc.set_referenced(false);
                continue;
            }
            if desc.is_pinned() {
                continue;
            }
            return Some(desc.frame_id());
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_common::FileId;
    use kestrel_storage::{FileRef, MemFile};
    use std::sync::Arc;

    /// Builds `n` valid, unpinned, unreferenced descriptors.
    fn loaded_descriptors(n: usize) -> Vec<FrameDescriptor> {
        let file: FileRef = Arc::new(MemFile::with_pages(FileId(0), n as u32));
        (0..n)
            .map(|i| {
                let mut desc = FrameDescriptor::new(FrameId(i as u32));
                desc.initialize(Arc::clone(&file), i as u32);
                desc.unpin(false);
                desc.set_referenced(false);
                desc
            })
            .collect()
    }

    fn empty_descriptors(n: usize) -> Vec<FrameDescriptor> {
        (0..n).map(|i| FrameDescriptor::new(FrameId(i as u32))).collect()
    }

    #[test]
    fn test_clock_starts_before_first_frame() {
        let mut replacer = ClockReplacer::new(4);
        assert_eq!(replacer.hand(), 3);

        let mut descs = empty_descriptors(4);
        assert_eq!(replacer.select_victim(&mut descs), Some(FrameId(0)));
        assert_eq!(replacer.hand(), 0);
    }

    #[test]
    fn test_clock_invalid_frames_in_order() {
        let mut replacer = ClockReplacer::new(3);
        let mut descs = empty_descriptors(3);

        // The caller never fills the frame here, so each call moves on.
        assert_eq!(replacer.select_victim(&mut descs), Some(FrameId(0)));
        assert_eq!(replacer.select_victim(&mut descs), Some(FrameId(1)));
        assert_eq!(replacer.select_victim(&mut descs), Some(FrameId(2)));
        assert_eq!(replacer.select_victim(&mut descs), Some(FrameId(0)));
    }

    #[test]
    fn test_clock_skips_referenced_once() {
        let mut replacer = ClockReplacer::new(3);
        let mut descs = loaded_descriptors(3);
        descs[0].set_referenced(true);

        // Frame 0 gets its second chance; frame 1 is the victim.
        assert_eq!(replacer.select_victim(&mut descs), Some(FrameId(1)));
        assert!(!descs[0].is_referenced());
    }

    #[test]
    fn test_clock_all_referenced_evicts_after_full_sweep() {
        let mut replacer = ClockReplacer::new(3);
        let mut descs = loaded_descriptors(3);
        for desc in descs.iter_mut() {
            desc.set_referenced(true);
        }

        // First sweep clears all bits, second visit of frame 0 selects it.
        assert_eq!(replacer.select_victim(&mut descs), Some(FrameId(0)));
        assert!(descs.iter().all(|d| !d.is_referenced()));
        assert_eq!(replacer.hand(), 0);
    }

    #[test]
    fn test_clock_skips_pinned() {
        let mut replacer = ClockReplacer::new(3);
        let mut descs = loaded_descriptors(3);
        descs[0].pin();
        descs[1].pin();
        descs[0].set_referenced(false);
        descs[1].set_referenced(false);

        assert_eq!(replacer.select_victim(&mut descs), Some(FrameId(2)));
    }

    #[test]
    fn test_clock_all_pinned_gives_up() {
        let mut replacer = ClockReplacer::new(3);
        let mut descs = loaded_descriptors(3);
        for desc in descs.iter_mut() {
            desc.pin();
        }

        assert_eq!(replacer.select_victim(&mut descs), None);
        // Two full sweeps leave the hand where it started.
        assert_eq!(replacer.hand(), 2);
        assert!(descs.iter().all(|d| !d.is_referenced()));
    }

    #[test]
    fn test_clock_resumes_after_previous_victim() {
        let mut replacer = ClockReplacer::new(4);
        let mut descs = loaded_descriptors(4);

        assert_eq!(replacer.select_victim(&mut descs), Some(FrameId(0)));
        assert_eq!(replacer.select_victim(&mut descs), Some(FrameId(1)));
        descs[2].set_referenced(true);
        assert_eq!(replacer.select_victim(&mut descs), Some(FrameId(3)));
        assert_eq!(replacer.select_victim(&mut descs), Some(FrameId(0)));
    }

    #[test]
    fn test_clock_single_frame() {
        let mut replacer = ClockReplacer::new(1);
        let mut descs = loaded_descriptors(1);
        descs[0].set_referenced(true);

        assert_eq!(replacer.select_victim(&mut descs), Some(FrameId(0)));

        descs[0].pin();
        assert_eq!(replacer.select_victim(&mut descs), None);
        assert_eq!(replacer.hand(), 0);
    }
}
