//! Handles to pinned pages.

use crate::frame::{BufferFrame, FrameId};
use crate::manager::BufferManager;
use kestrel_common::{PageBuf, PageId, PageNum};
use kestrel_storage::FileRef;
use log::warn;
use parking_lot::{RwLockReadGuard, RwLockWriteGuard};
use std::cell::Cell;

/// Reference to a page cached in a frame.
///
/// Returned by `read_page` and `alloc_page`. The reference carries one pin
/// that the caller releases with `unpin_page`. Lock guards obtained from
/// `data` or `data_mut` must be dropped before that unpin.
#[derive(Clone)]
pub struct PageRef<'a> {
    page_id: PageId,
    frame: &'a BufferFrame,
}

impl<'a> PageRef<'a> {
    pub(crate) fn new(page_id: PageId, frame: &'a BufferFrame) -> Self {
        Self { page_id, frame }
    }

    /// Returns the page ID.
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Returns the page number within its file.
    pub fn page_num(&self) -> PageNum {
        self.page_id.page_num
    }

    /// Returns the frame holding the page.
    pub fn frame_id(&self) -> FrameId {
        self.frame.frame_id()
    }

    /// Returns the page data.
    pub fn data(&self) -> RwLockReadGuard<'a, Box<PageBuf>> {
        self.frame.read_data()
    }

    /// Returns mutable access to the page data.
    ///
    /// Modifications must be reported by unpinning with `dirty = true`.
    pub fn data_mut(&self) -> RwLockWriteGuard<'a, Box<PageBuf>> {
        self.frame.write_data()
    }
}

impl std::fmt::Debug for PageRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageRef")
            .field("page_id", &self.page_id)
            .field("frame_id", &self.frame.frame_id())
            .finish()
    }
}

/// RAII guard for reading a page. Unpins on drop.
pub struct PageReadGuard<'a> {
    manager: &'a BufferManager,
    file: FileRef,
    page: PageRef<'a>,
}

impl<'a> PageReadGuard<'a> {
    pub(crate) fn new(manager: &'a BufferManager, file: FileRef, page: PageRef<'a>) -> Self {
        Self { manager, file, page }
    }

    /// Returns the page ID.
    pub fn page_id(&self) -> PageId {
        self.page.page_id()
    }

    /// Returns the page data.
    ///
    /// The lock borrows the guard, so it is released before the unpin.
    pub fn data(&self) -> RwLockReadGuard<'_, Box<PageBuf>> {
        self.page.data()
    }
}

impl Drop for PageReadGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self
            .manager
            .unpin_page(&self.file, self.page.page_num(), false)
        {
            warn!("read guard for {} failed to unpin: {}", self.page.page_id(), e);
        }
    }
}

/// RAII guard for writing a page.
///
/// Unpins on drop, reporting the page dirty once `data_mut` or `set_dirty`
/// has been called.
pub struct PageWriteGuard<'a> {
    manager: &'a BufferManager,
    file: FileRef,
    page: PageRef<'a>,
    dirty: Cell<bool>,
}

impl<'a> PageWriteGuard<'a> {
    pub(crate) fn new(manager: &'a BufferManager, file: FileRef, page: PageRef<'a>) -> Self {
        Self {
            manager,
            file,
            page,
            dirty: Cell::new(false),
        }
    }

    /// Returns the page ID.
    pub fn page_id(&self) -> PageId {
        self.page.page_id()
    }

    /// Returns the page data.
    pub fn data(&self) -> RwLockReadGuard<'_, Box<PageBuf>> {
        self.page.data()
    }

    /// Returns mutable access to page data and marks the page dirty.
    pub fn data_mut(&self) -> RwLockWriteGuard<'_, Box<PageBuf>> {
        self.dirty.set(true);
        self.page.data_mut()
    }

    /// Marks the page as dirty.
    pub fn set_dirty(&self) {
        self.dirty.set(true);
    }
}

impl Drop for PageWriteGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self
            .manager
            .unpin_page(&self.file, self.page.page_num(), self.dirty.get())
        {
            warn!("write guard for {} failed to unpin: {}", self.page.page_id(), e);
        }
    }
}
