//! Per-frame bookkeeping.

use crate::frame::FrameId;
use kestrel_common::{FileId, PageId, PageNum};
use kestrel_storage::FileRef;

/// The page a valid frame caches.
#[derive(Clone)]
pub(crate) struct FrameOwner {
    pub(crate) file: FileRef,
    pub(crate) page_num: PageNum,
}

/// Metadata for one frame.
///
/// A frame is valid exactly when it has an owner, so validity and ownership
/// cannot disagree.
#[derive(Clone)]
pub(crate) struct FrameDescriptor {
    frame_id: FrameId,
    owner: Option<FrameOwner>,
    pin_count: u32,
    dirty: bool,
    referenced: bool,
}

impl FrameDescriptor {
    /// Creates an empty descriptor.
    pub(crate) fn new(frame_id: FrameId) -> Self {
        Self {
            frame_id,
            owner: None,
            pin_count: 0,
            dirty: false,
            referenced: false,
        }
    }

    /// Assigns a freshly loaded page to this frame, pinned once by its loader.
    pub(crate) fn initialize(&mut self, file: FileRef, page_num: PageNum) {
        self.owner = Some(FrameOwner { file, page_num });
        self.pin_count = 1;
        self.dirty = false;
        self.referenced = true;
    }

    /// Returns the descriptor to its empty state.
    pub(crate) fn clear(&mut self) {
        self.owner = None;
        self.pin_count = 0;
        self.dirty = false;
        self.referenced = false;
    }

    pub(crate) fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.owner.is_some()
    }

    pub(crate) fn owner(&self) -> Option<&FrameOwner> {
        self.owner.as_ref()
    }

    /// Returns the page held by this frame, if any.
    pub(crate) fn page_id(&self) -> Option<PageId> {
        self.owner
            .as_ref()
            .map(|owner| PageId::new(owner.file.file_id(), owner.page_num))
    }

    /// Returns true if the frame caches a page of `file_id`.
    pub(crate) fn belongs_to(&self, file_id: FileId) -> bool {
        self.owner
            .as_ref()
            .map_or(false, |owner| owner.file.file_id() == file_id)
    }

    /// Adds a holder and marks the frame recently used.
    pub(crate) fn pin(&mut self) {
        self.pin_count += 1;
        self.referenced = true;
    }

    /// Drops a holder, recording modification if `dirty`.
    ///
    /// Callers check `is_pinned` first; an unpinned frame is left untouched.
    pub(crate) fn unpin(&mut self, dirty: bool) {
        if self.pin_count == 0 {
            return;
        }
        self.pin_count -= 1;
        if dirty {
            self.dirty = true;
        }
    }

    pub(crate) fn pin_count(&self) -> u32 {
        self.pin_count
    }

    pub(crate) fn is_pinned(&self) -> bool {
        self.pin_count > 0
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    pub(crate) fn is_referenced(&self) -> bool {
        self.referenced
    }

    pub(crate) fn set_referenced(&mut self, referenced: bool) {
        self.referenced = referenced;
    }
}

impl std::fmt::Debug for FrameDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameDescriptor")
            .field("frame_id", &self.frame_id)
            .field("page_id", &self.page_id())
            .field("pin_count", &self.pin_count)
            .field("dirty", &self.dirty)
            .field("referenced", &self.referenced)
            .finish()
    }
}
