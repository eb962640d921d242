//! Page addressing for Kestrel storage.

use serde::{Deserialize, Serialize};

/// Page size in bytes (8 KB).
pub const PAGE_SIZE: usize = 8 * 1024;

/// Raw page content as held by a buffer frame or a file.
pub type PageBuf = [u8; PAGE_SIZE];

/// Page number within a single file (0-indexed).
pub type PageNum = u32;

/// Stable identity of an open paged file.
///
/// Two handles to the same file share a `FileId`; handles to different files
/// never do. The buffer manager keys its page table on this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileId(pub u32);

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "file:{}", self.0)
    }
}

/// Unique identifier for a page: owning file plus page number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageId {
    /// Owning file.
    pub file_id: FileId,
    /// Page number within the file.
    pub page_num: PageNum,
}

impl PageId {
    /// Creates a new PageId.
    pub fn new(file_id: FileId, page_num: PageNum) -> Self {
        Self { file_id, page_num }
    }

    /// Returns the PageId as a single u64 for compact storage.
    /// Layout: upper 32 bits = file_id, lower 32 bits = page_num.
    #[inline]
    pub fn as_u64(&self) -> u64 {
        ((self.file_id.0 as u64) << 32) | (self.page_num as u64)
    }

    /// Creates a PageId from a u64 representation.
    #[inline]
    pub fn from_u64(value: u64) -> Self {
        Self {
            file_id: FileId((value >> 32) as u32),
            page_num: value as u32,
        }
    }
}

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file_id.0, self.page_num)
    }
}

/// Allocates a zero-filled page buffer on the heap.
pub fn zeroed_page() -> Box<PageBuf> {
    Box::new([0u8; PAGE_SIZE])
}
