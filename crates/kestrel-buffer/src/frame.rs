//! Buffer frame storage.

use kestrel_common::{zeroed_page, PageBuf};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Unique identifier for a frame in the buffer pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameId(pub u32);

impl FrameId {
    /// Returns the frame ID as an index into the frame arrays.
    #[inline(always)]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for FrameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "frame:{}", self.0)
    }
}

/// A page-sized memory slot in the buffer pool.
///
/// The frame only owns bytes. Who the bytes belong to, and whether they may
/// be touched, is tracked by the frame's descriptor under the manager lock.
pub struct BufferFrame {
    frame_id: FrameId,
    data: RwLock<Box<PageBuf>>,
}

impl BufferFrame {
    /// Creates a new zero-filled frame.
    pub fn new(frame_id: FrameId) -> Self {
        Self {
            frame_id,
            data: RwLock::new(zeroed_page()),
        }
    }

    /// Returns the frame ID.
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Reads the page data.
    #[inline]
    pub fn read_data(&self) -> RwLockReadGuard<'_, Box<PageBuf>> {
        self.data.read()
    }

    /// Writes to the page data.
    #[inline]
    pub fn write_data(&self) -> RwLockWriteGuard<'_, Box<PageBuf>> {
        self.data.write()
    }

    /// Zeroes the page data.
    pub fn zero(&self) {
        self.data.write().fill(0);
    }
}

impl std::fmt::Debug for BufferFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferFrame")
            .field("frame_id", &self.frame_id)
            .finish()
    }
}
