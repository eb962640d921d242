//! Buffer statistics and diagnostics.

use crate::frame::FrameId;
use kestrel_common::PageId;
use std::fmt;

/// I/O and access counters kept by the buffer manager.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Counters {
    pub(crate) accesses: u64,
    pub(crate) hits: u64,
    pub(crate) disk_reads: u64,
    pub(crate) disk_writes: u64,
    pub(crate) evictions: u64,
}

/// Statistics about the buffer pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferStats {
    /// Total number of frames.
    pub total_frames: usize,
    /// Number of frames holding no page.
    pub free_frames: usize,
    /// Number of frames with pages.
    pub used_frames: usize,
    /// Number of pinned frames.
    pub pinned_frames: usize,
    /// Number of dirty frames.
    pub dirty_frames: usize,
    /// Page requests through `read_page`.
    pub accesses: u64,
    /// Requests served without disk I/O.
    pub hits: u64,
    /// Pages read from files.
    pub disk_reads: u64,
    /// Pages written back to files.
    pub disk_writes: u64,
    /// Valid pages displaced to make room for others.
    pub evictions: u64,
}

impl BufferStats {
    /// Fraction of accesses served from the pool, 0.0 when there were none.
    pub fn hit_ratio(&self) -> f64 {
        if self.accesses == 0 {
            0.0
        } else {
            self.hits as f64 / self.accesses as f64
        }
    }
}

/// Descriptor state of a single frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameInfo {
    /// Frame the state belongs to.
    pub frame_id: FrameId,
    /// Cached page; `None` for an invalid frame.
    pub page_id: Option<PageId>,
    /// Number of outstanding pins.
    pub pin_count: u32,
    /// Whether the frame holds changes not yet written back.
    pub dirty: bool,
    /// Clock reference bit.
    pub referenced: bool,
}

impl FrameInfo {
    /// Returns true if the frame caches a page.
    pub fn is_valid(&self) -> bool {
        self.page_id.is_some()
    }
}

impl fmt::Display for FrameInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FrameNo:{} ", self.frame_id.0)?;
        match self.page_id {
            Some(page_id) => write!(
                f,
                "file:{} pageNo:{} valid:true pinCnt:{} dirty:{} refbit:{}",
                page_id.file_id.0, page_id.page_num, self.pin_count, self.dirty, self.referenced
            ),
            None => write!(
                f,
                "file:NULL pageNo:INVALID valid:false pinCnt:{} dirty:{} refbit:{}",
                self.pin_count, self.dirty, self.referenced
            ),
        }
    }
}

/// Point-in-time copy of the descriptor table.
#[derive(Debug, Clone)]
pub struct BufferSnapshot {
    /// State of every frame, indexed by frame ID.
    pub frames: Vec<FrameInfo>,
    /// Last frame examined by the clock.
    pub clock_hand: usize,
}

impl BufferSnapshot {
    /// Number of frames currently caching a page.
    pub fn valid_frames(&self) -> usize {
        self.frames.iter().filter(|f| f.is_valid()).count()
    }
}

impl fmt::Display for BufferSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for frame in &self.frames {
            writeln!(f, "{}", frame)?;
        }
        writeln!(f, "Total Number of Valid Frames:{}", self.valid_frames())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_common::FileId;

    fn stats(accesses: u64, hits: u64) -> BufferStats {
        BufferStats {
            total_frames: 4,
            free_frames: 4,
            used_frames: 0,
            pinned_frames: 0,
            dirty_frames: 0,
            accesses,
            hits,
            disk_reads: 0,
            disk_writes: 0,
            evictions: 0,
        }
    }

    #[test]
    fn test_hit_ratio() {
        assert_eq!(stats(0, 0).hit_ratio(), 0.0);
        assert_eq!(stats(4, 3).hit_ratio(), 0.75);
    }

    #[test]
    fn test_frame_info_display() {
        let info = FrameInfo {
            frame_id: FrameId(1),
            page_id: Some(PageId::new(FileId(2), 9)),
            pin_count: 1,
            dirty: true,
            referenced: false,
        };
        assert_eq!(
            info.to_string(),
            "FrameNo:1 file:2 pageNo:9 valid:true pinCnt:1 dirty:true refbit:false"
        );

        let empty = FrameInfo {
            frame_id: FrameId(0),
            page_id: None,
            pin_count: 0,
            dirty: false,
            referenced: false,
        };
        assert!(!empty.is_valid());
        assert!(empty.to_string().contains("valid:false"));
    }

    #[test]
    fn test_snapshot_display_counts_valid() {
        let snapshot = BufferSnapshot {
            frames: vec![
                FrameInfo {
                    frame_id: FrameId(0),
                    page_id: Some(PageId::new(FileId(0), 0)),
                    pin_count: 0,
                    dirty: false,
                    referenced: true,
                },
                FrameInfo {
                    frame_id: FrameId(1),
                    page_id: None,
                    pin_count: 0,
                    dirty: false,
                    referenced: false,
                },
            ],
            clock_hand: 1,
        };

        assert_eq!(snapshot.valid_frames(), 1);
        let text = snapshot.to_string();
        assert_eq!(text.lines().count(), 3);
        assert!(text.ends_with("Total Number of Valid Frames:1\n"));
    }
}
