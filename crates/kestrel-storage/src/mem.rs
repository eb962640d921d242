//! In-memory paged file with an I/O log.

use crate::file::PageFile;
use kestrel_common::{zeroed_page, FileId, KestrelError, PageBuf, PageId, PageNum, Result};
use parking_lot::Mutex;

/// A paged file kept entirely in memory.
///
/// Every read and write is counted and writes are logged in order, which
/// makes it possible to observe exactly what a cache wrote back and when.
pub struct MemFile {
    file_id: FileId,
    inner: Mutex<MemFileInner>,
}

#[derive(Default)]
struct MemFileInner {
    /// Page slots; `None` marks a deleted page.
    pages: Vec<Option<Box<PageBuf>>>,
    reads: u64,
    write_log: Vec<PageNum>,
}

impl MemFile {
    /// Creates an empty file.
    pub fn new(file_id: FileId) -> Self {
        Self {
            file_id,
            inner: Mutex::new(MemFileInner::default()),
        }
    }

    /// Creates a file holding `num_pages` pages, each stamped with its own
    /// page number in the first four bytes (little endian).
    pub fn with_pages(file_id: FileId, num_pages: u32) -> Self {
        let pages = (0..num_pages)
            .map(|page_num| {
                let mut page = zeroed_page();
                page[..4].copy_from_slice(&page_num.to_le_bytes());
                Some(page)
            })
            .collect();

        Self {
            file_id,
            inner: Mutex::new(MemFileInner {
                pages,
                ..Default::default()
            }),
        }
    }

    /// Number of `read_page` calls that returned data.
    pub fn reads(&self) -> u64 {
        self.inner.lock().reads
    }

    /// Number of `write_page` calls that succeeded.
    pub fn writes(&self) -> usize {
        self.inner.lock().write_log.len()
    }

    /// Page numbers written, in order.
    pub fn write_log(&self) -> Vec<PageNum> {
        self.inner.lock().write_log.clone()
    }

    /// Resets the read counter and the write log.
    pub fn clear_log(&self) {
        let mut inner = self.inner.lock();
        inner.reads = 0;
        inner.write_log.clear();
    }

    /// Returns a copy of the stored page content without counting a read.
    pub fn page_data(&self, page_num: PageNum) -> Option<Box<PageBuf>> {
        self.inner
            .lock()
            .pages
            .get(page_num as usize)
            .and_then(|slot| slot.clone())
    }

    fn not_found(&self, page_num: PageNum) -> KestrelError {
        KestrelError::PageNotFound {
            page_id: PageId::new(self.file_id, page_num),
        }
    }
}

impl PageFile for MemFile {
    fn file_id(&self) -> FileId {
        self.file_id
    }

    fn read_page(&self, page_num: PageNum, buf: &mut PageBuf) -> Result<()> {
        let mut inner = self.inner.lock();
        let page = inner
            .pages
            .get(page_num as usize)
            .and_then(|slot| slot.as_ref())
            .ok_or_else(|| self.not_found(page_num))?;
        buf.copy_from_slice(&page[..]);
        inner.reads += 1;
        Ok(())
    }

    fn write_page(&self, page_num: PageNum, data: &PageBuf) -> Result<()> {
        let mut inner = self.inner.lock();
        let page = inner
            .pages
            .get_mut(page_num as usize)
            .and_then(|slot| slot.as_mut())
            .ok_or_else(|| self.not_found(page_num))?;
        page.copy_from_slice(data);
        inner.write_log.push(page_num);
        Ok(())
    }

    fn allocate_page(&self) -> Result<PageNum> {
        let mut inner = self.inner.lock();
        if let Some(free) = inner.pages.iter().position(|slot| slot.is_none()) {
            inner.pages[free] = Some(zeroed_page());
            return Ok(free as PageNum);
        }
        inner.pages.push(Some(zeroed_page()));
        Ok((inner.pages.len() - 1) as PageNum)
    }

    fn delete_page(&self, page_num: PageNum) -> Result<()> {
        let mut inner = self.inner.lock();
        match inner.pages.get_mut(page_num as usize) {
            Some(slot) if slot.is_some() => {
                *slot = None;
                Ok(())
            }
            _ => Err(self.not_found(page_num)),
        }
    }

    fn num_pages(&self) -> Result<u32> {
        Ok(self.inner.lock().pages.len() as u32)
    }
}
