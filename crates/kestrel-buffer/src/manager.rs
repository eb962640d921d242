//! Buffer manager.

use crate::descriptor::FrameDescriptor;
use crate::frame::{BufferFrame, FrameId};
use crate::guard::{PageReadGuard, PageRef, PageWriteGuard};
use crate::page_table::PageTable;
use crate::replacer::ClockReplacer;
use crate::stats::{BufferSnapshot, BufferStats, Counters, FrameInfo};
use kestrel_common::{BufferPoolConfig, KestrelError, PageId, PageNum, Result};
use kestrel_storage::FileRef;
use log::{debug, error, trace, warn};
use parking_lot::Mutex;
use std::sync::Arc;

/// Mutable bookkeeping shared by all callers.
///
/// Everything that must change together (descriptors, page table, clock hand)
/// lives behind one lock, so victim selection and index maintenance are a
/// single critical section.
struct BufferState {
    descriptors: Vec<FrameDescriptor>,
    page_table: PageTable,
    replacer: ClockReplacer,
    counters: Counters,
}

/// Buffer manager.
///
/// Caches pages of externally owned files in a fixed pool of frames:
/// - Page table from (file, page number) to frame
/// - Clock replacement for eviction, with write-back of dirty victims
/// - Pin counting; a pinned frame is never evicted
///
/// Page bytes live outside the state lock. A caller holding a pin may read
/// and write them through its `PageRef` without blocking other requests.
pub struct BufferManager {
    config: BufferPoolConfig,
    /// The frame store.
    frames: Vec<BufferFrame>,
    state: Mutex<BufferState>,
}

impl BufferManager {
    /// Creates a buffer manager with `config.num_frames` empty frames.
    pub fn new(config: BufferPoolConfig) -> Result<Self> {
        config.validate()?;
        let num_frames = config.num_frames;

        let frames = (0..num_frames)
            .map(|i| BufferFrame::new(FrameId(i as u32)))
            .collect();
        let descriptors = (0..num_frames)
            .map(|i| FrameDescriptor::new(FrameId(i as u32)))
            .collect();

        Ok(Self {
            config,
            frames,
            state: Mutex::new(BufferState {
                descriptors,
                page_table: PageTable::new(num_frames),
                replacer: ClockReplacer::new(num_frames),
                counters: Counters::default(),
            }),
        })
    }

    /// Creates a buffer manager with `num_frames` frames.
    pub fn with_frames(num_frames: usize) -> Result<Self> {
        Self::new(BufferPoolConfig { num_frames })
    }

    /// Returns the number of frames in the pool.
    pub fn num_frames(&self) -> usize {
        self.config.num_frames
    }

    /// Returns the number of pages currently cached.
    pub fn page_count(&self) -> usize {
        self.state.lock().page_table.len()
    }

    /// Returns the number of frames holding no page.
    pub fn free_count(&self) -> usize {
        let state = self.state.lock();
        state.descriptors.iter().filter(|d| !d.is_valid()).count()
    }

    /// Returns the frame caching `page_id`, or `None` if it is not cached.
    pub fn lookup(&self, page_id: PageId) -> Option<FrameId> {
        self.state.lock().page_table.get(page_id)
    }

    /// Checks if a page is cached.
    pub fn contains(&self, page_id: PageId) -> bool {
        self.lookup(page_id).is_some()
    }

    /// Writes a frame back to its owning file if it is dirty.
    ///
    /// Returns true if a write happened.
    fn write_back(frame: &BufferFrame, desc: &mut FrameDescriptor) -> Result<bool> {
        if !desc.is_dirty() {
            return Ok(false);
        }
        let Some(owner) = desc.owner() else {
            return Ok(false);
        };

        owner.file.write_page(owner.page_num, &frame.read_data())?;
        desc.set_dirty(false);
        Ok(true)
    }

    /// Obtains a frame for a new page.
    ///
    /// Runs the clock scan. A valid victim is written back if dirty and its
    /// page table entry is removed before the frame is handed out, so no stale
    /// entry can point at the reused frame. The returned frame is invalid and
    /// unpinned; the caller initializes it.
    fn allocate_frame(&self, state: &mut BufferState) -> Result<FrameId> {
        let frame_id = state
            .replacer
            .select_victim(&mut state.descriptors)
            .ok_or(KestrelError::BufferExceeded)?;

        let desc = &mut state.descriptors[frame_id.index()];
        if let Some(old_page_id) = desc.page_id() {
            if Self::write_back(&self.frames[frame_id.index()], desc)? {
                state.counters.disk_writes += 1;
            }
            state.page_table.remove(old_page_id);
            state.descriptors[frame_id.index()].clear();
            state.counters.evictions += 1;
            debug!("evicted {} from {}", old_page_id, frame_id);
        }

        Ok(frame_id)
    }

    /// Reads a page, pinning it.
    ///
    /// On a hit the frame's pin count is incremented and its reference bit
    /// set. On a miss a frame is obtained from the clock, the page is read
    /// from `file` into it, and the frame starts with one pin.
    ///
    /// Fails with `BufferExceeded` if every frame is pinned, or with the
    /// file's error if the page cannot be read.
    pub fn read_page(&self, file: &FileRef, page_num: PageNum) -> Result<PageRef<'_>> {
        let page_id = PageId::new(file.file_id(), page_num);
        let mut state = self.state.lock();
        state.counters.accesses += 1;

        if let Some(frame_id) = state.page_table.get(page_id) {
            state.descriptors[frame_id.index()].pin();
            state.counters.hits += 1;
            trace!("hit {} in {}", page_id, frame_id);
            return Ok(PageRef::new(page_id, &self.frames[frame_id.index()]));
        }

        let frame_id = self.allocate_frame(&mut state)?;
        let frame = &self.frames[frame_id.index()];
        {
            let mut data = frame.write_data();
            file.read_page(page_num, &mut data)?;
        }
        state.counters.disk_reads += 1;

        state.page_table.insert(page_id, frame_id)?;
        state.descriptors[frame_id.index()].initialize(Arc::clone(file), page_num);
        debug!("loaded {} into {}", page_id, frame_id);

        Ok(PageRef::new(page_id, frame))
    }

    /// Releases one pin on a page, marking it dirty if `dirty` is set.
    ///
    /// Unpinning a page that is not cached does nothing. Unpinning a cached
    /// page whose pin count is already zero fails with `PageNotPinned`.
    pub fn unpin_page(&self, file: &FileRef, page_num: PageNum, dirty: bool) -> Result<()> {
        let page_id = PageId::new(file.file_id(), page_num);
        let mut state = self.state.lock();

        let Some(frame_id) = state.page_table.get(page_id) else {
            debug!("unpin of uncached {} ignored", page_id);
            return Ok(());
        };

        let desc = &mut state.descriptors[frame_id.index()];
        if !desc.is_pinned() {
            return Err(KestrelError::PageNotPinned {
                page_id,
                frame_id: frame_id.0,
            });
        }
        desc.unpin(dirty);
        Ok(())
    }

    /// Allocates a new page in `file` and caches it, pinned.
    ///
    /// A frame is secured before the file grows, so `BufferExceeded` leaves
    /// the file untouched. If the new page cannot be indexed it is deleted
    /// from the file again.
    pub fn alloc_page(&self, file: &FileRef) -> Result<(PageNum, PageRef<'_>)> {
        let mut state = self.state.lock();

        let frame_id = self.allocate_frame(&mut state)?;
        let page_num = file.allocate_page()?;
        let page_id = PageId::new(file.file_id(), page_num);

        let frame = &self.frames[frame_id.index()];
        frame.zero();

        if let Err(e) = state.page_table.insert(page_id, frame_id) {
            if let Err(del) = file.delete_page(page_num) {
                warn!("failed to release {} after {}: {}", page_id, e, del);
            }
            return Err(e);
        }
        state.descriptors[frame_id.index()].initialize(Arc::clone(file), page_num);
        debug!("allocated {} in {}", page_id, frame_id);

        Ok((page_num, PageRef::new(page_id, frame)))
    }

    /// Deletes a page from `file` and drops it from the cache.
    ///
    /// Fails with `PagePinned`, changing nothing, if the page is cached and
    /// pinned. Cached content is discarded without write-back since the page
    /// no longer exists.
    pub fn dispose_page(&self, file: &FileRef, page_num: PageNum) -> Result<()> {
        let page_id = PageId::new(file.file_id(), page_num);
        let mut state = self.state.lock();

        let cached = state.page_table.get(page_id);
        if let Some(frame_id) = cached {
            let desc = &state.descriptors[frame_id.index()];
            if desc.is_pinned() {
                return Err(KestrelError::PagePinned {
                    page_id,
                    frame_id: frame_id.0,
                    pin_count: desc.pin_count(),
                });
            }
        }

        file.delete_page(page_num)?;

        if let Some(frame_id) = cached {
            state.page_table.remove(page_id);
            state.descriptors[frame_id.index()].clear();
        }
        debug!("disposed {}", page_id);
        Ok(())
    }

    /// Writes back and evicts every cached page of `file`.
    ///
    /// Fails with `PagePinned` before writing anything if any page of the
    /// file is pinned.
    pub fn flush_file(&self, file: &FileRef) -> Result<()> {
        let file_id = file.file_id();
        let mut state = self.state.lock();
        let state = &mut *state;

        let owned: Vec<FrameId> = state
            .descriptors
            .iter()
            .filter(|d| d.belongs_to(file_id))
            .map(|d| d.frame_id())
            .collect();

        for &frame_id in &owned {
            let desc = &state.descriptors[frame_id.index()];
            if desc.is_pinned() {
                return Err(KestrelError::PagePinned {
                    page_id: PageId::new(file_id, desc.owner().map_or(0, |o| o.page_num)),
                    frame_id: frame_id.0,
                    pin_count: desc.pin_count(),
                });
            }
        }

        for frame_id in owned {
            let desc = &mut state.descriptors[frame_id.index()];
            let Some(page_id) = desc.page_id() else {
                continue;
            };
            if Self::write_back(&self.frames[frame_id.index()], desc)? {
                state.counters.disk_writes += 1;
            }
            state.page_table.remove(page_id);
            state.descriptors[frame_id.index()].clear();
        }

        debug!("flushed {}", file_id);
        Ok(())
    }

    /// Writes back every dirty unpinned page without evicting it.
    ///
    /// Pinned frames are skipped: their holders may be writing the bytes, and
    /// they stay dirty until a later flush or eviction. Returns the number of
    /// pages written.
    pub fn flush_all(&self) -> Result<usize> {
        let mut state = self.state.lock();
        let state = &mut *state;
        let mut flushed = 0;

        for (frame, desc) in self.frames.iter().zip(state.descriptors.iter_mut()) {
            if desc.is_pinned() {
                continue;
            }
            if Self::write_back(frame, desc)? {
                flushed += 1;
            }
        }

        state.counters.disk_writes += flushed as u64;
        Ok(flushed)
    }

    /// Reads a page and wraps it in a guard that unpins on drop.
    pub fn read_guard(&self, file: &FileRef, page_num: PageNum) -> Result<PageReadGuard<'_>> {
        let page = self.read_page(file, page_num)?;
        Ok(PageReadGuard::new(self, Arc::clone(file), page))
    }

    /// Reads a page and wraps it in a guard that unpins on drop, reporting
    /// the page dirty if it was modified through the guard.
    pub fn write_guard(&self, file: &FileRef, page_num: PageNum) -> Result<PageWriteGuard<'_>> {
        let page = self.read_page(file, page_num)?;
        Ok(PageWriteGuard::new(self, Arc::clone(file), page))
    }

    /// Returns statistics about the buffer pool.
    pub fn stats(&self) -> BufferStats {
        let state = self.state.lock();
        let used = state.descriptors.iter().filter(|d| d.is_valid()).count();
        let pinned = state.descriptors.iter().filter(|d| d.is_pinned()).count();
        let dirty = state.descriptors.iter().filter(|d| d.is_dirty()).count();
        let counters = state.counters;

        BufferStats {
            total_frames: self.config.num_frames,
            free_frames: self.config.num_frames - used,
            used_frames: used,
            pinned_frames: pinned,
            dirty_frames: dirty,
            accesses: counters.accesses,
            hits: counters.hits,
            disk_reads: counters.disk_reads,
            disk_writes: counters.disk_writes,
            evictions: counters.evictions,
        }
    }

    /// Resets the access and I/O counters.
    pub fn clear_stats(&self) {
        self.state.lock().counters = Counters::default();
    }

    /// Returns a copy of every frame's descriptor state.
    pub fn snapshot(&self) -> BufferSnapshot {
        let state = self.state.lock();
        let frames = state
            .descriptors
            .iter()
            .map(|d| FrameInfo {
                frame_id: d.frame_id(),
                page_id: d.page_id(),
                pin_count: d.pin_count(),
                dirty: d.is_dirty(),
                referenced: d.is_referenced(),
            })
            .collect();

        BufferSnapshot {
            frames,
            clock_hand: state.replacer.hand(),
        }
    }

    /// Prints every frame's descriptor state to stdout.
    pub fn print_self(&self) {
        print!("{}", self.snapshot());
    }
}

impl Drop for BufferManager {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        for (frame, desc) in self.frames.iter().zip(state.descriptors.iter_mut()) {
            if let Some(page_id) = desc.page_id() {
                if let Err(e) = Self::write_back(frame, desc) {
                    error!("failed to write back {} on shutdown: {}", page_id, e);
                }
            }
        }
    }
}
